//! Hume batch API client for emotion inference.
//!
//! Text input is scored with the language model, one text entry per utterance, so
//! results map back onto transcript speakers by position. Audio input is uploaded as
//! multipart and scored with the prosody model, which identifies speakers itself.
//! Both modes run as batch jobs: submit, poll the job state, fetch predictions.

use std::collections::BTreeMap;
use std::time::Instant;

use analysis_ai::traits::emotion::Provider;
use analysis_ai::types::emotion::{EmotionScore, Input, UtteranceEmotions};
use analysis_ai::types::job::{PollState, ProviderJobHandle};
use analysis_ai::types::transcription::Segment;
use analysis_ai::{Audio, Error as AnalysisError};
use async_trait::async_trait;
use log::*;
use provider_auth::api_key::{ApiKeyAuth, ApiKeyProvider, ProviderAuth};
use provider_auth::http::{send_with_retry, ProviderClients};
use provider_auth::providers::{hume_config, ProviderConfig};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;
use service::config::Config;

use super::polling::{poll_until_terminal, PollSettings};
use super::{api_key_auth, read_json, require_auth, transport};

const PROVIDER_ID: &str = "hume";
const UNKNOWN_SPEAKER: &str = "unknown";

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    job_id: String,
}

#[derive(Debug, Deserialize)]
struct JobDetails {
    state: JobStateBody,
}

#[derive(Debug, Deserialize)]
struct JobStateBody {
    status: String,
    #[serde(default)]
    message: Option<String>,
}

/// Predictions for one submitted source (one text entry or one file).
#[derive(Debug, Deserialize)]
struct SourcePrediction {
    #[serde(default)]
    results: Option<SourceResults>,
}

#[derive(Debug, Deserialize)]
struct SourceResults {
    #[serde(default)]
    predictions: Vec<FilePrediction>,
}

#[derive(Debug, Deserialize)]
struct FilePrediction {
    models: Models,
}

#[derive(Debug, Default, Deserialize)]
struct Models {
    #[serde(default)]
    prosody: Option<ModelPredictions>,
    #[serde(default)]
    language: Option<ModelPredictions>,
}

#[derive(Debug, Deserialize)]
struct ModelPredictions {
    #[serde(default)]
    grouped_predictions: Vec<GroupedPrediction>,
}

#[derive(Debug, Deserialize)]
struct GroupedPrediction {
    id: String,
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    time: Option<TimeSpan>,
    #[serde(default)]
    emotions: Vec<EmotionScore>,
}

/// Seconds from the start of the audio.
#[derive(Debug, Deserialize)]
struct TimeSpan {
    begin: f64,
    end: f64,
}

pub struct HumeClient {
    clients: ProviderClients,
    auth: Option<ApiKeyAuth>,
    config: ProviderConfig,
    poll: PollSettings,
}

impl HumeClient {
    pub fn new(
        clients: ProviderClients,
        auth: Option<ApiKeyAuth>,
        config: ProviderConfig,
        poll: PollSettings,
    ) -> Self {
        Self {
            clients,
            auth,
            config,
            poll,
        }
    }

    pub fn from_config(config: &Config, clients: ProviderClients) -> Self {
        let auth = api_key_auth(ApiKeyProvider::Hume, config.emotion_api_key().as_deref());
        Self::new(
            clients,
            auth,
            hume_config().with_base_url(config.emotion_base_url()),
            PollSettings::from_config(config),
        )
    }

    async fn submit_text(
        &self,
        auth: &ApiKeyAuth,
        segments: &[Segment],
    ) -> Result<String, AnalysisError> {
        let body = json!({
            "models": { "language": { "granularity": "utterance" } },
            "text": segments.iter().map(|s| s.text.as_str()).collect::<Vec<_>>(),
        });
        let request = self
            .clients
            .client
            .post(self.config.endpoint("batch/jobs"))
            .json(&body);

        let response = auth.authenticate(request).send().await.map_err(transport)?;
        let submitted: SubmitResponse = read_json(PROVIDER_ID, response).await?;
        Ok(submitted.job_id)
    }

    async fn submit_audio(&self, auth: &ApiKeyAuth, audio: &Audio) -> Result<String, AnalysisError> {
        let models = json!({
            "models": { "prosody": { "granularity": "utterance", "identify_speakers": true } }
        })
        .to_string();
        let url = self.config.endpoint("batch/jobs");

        // Multipart bodies cannot be cloned by the retry middleware, so the form is
        // rebuilt for every attempt.
        let response = send_with_retry(&self.clients.policy, || {
            let form = Form::new().text("json", models.clone()).part(
                "file",
                Part::bytes(audio.bytes.clone()).file_name(audio.file_name.clone()),
            );
            auth.authenticate_plain(self.clients.base.post(&url).multipart(form))
        })
        .await
        .map_err(AnalysisError::from)?;

        let submitted: SubmitResponse = read_json(PROVIDER_ID, response).await?;
        Ok(submitted.job_id)
    }

    async fn poll_state(&self, auth: &ApiKeyAuth, job_id: &str) -> Result<PollState, AnalysisError> {
        let request = self
            .clients
            .client
            .get(self.config.endpoint(&format!("batch/jobs/{}", job_id)));
        let response = auth.authenticate(request).send().await.map_err(transport)?;
        let details: JobDetails = read_json(PROVIDER_ID, response).await?;

        Ok(match details.state.status.as_str() {
            "COMPLETED" => PollState::Completed,
            "FAILED" => PollState::Failed(
                details
                    .state
                    .message
                    .unwrap_or_else(|| "emotion inference failed".to_string()),
            ),
            _ => PollState::Pending,
        })
    }

    async fn predictions(
        &self,
        auth: &ApiKeyAuth,
        job_id: &str,
    ) -> Result<Vec<FilePrediction>, AnalysisError> {
        let request = self
            .clients
            .client
            .get(self.config.endpoint(&format!("batch/jobs/{}/predictions", job_id)));
        let response = auth.authenticate(request).send().await.map_err(transport)?;
        let sources: Vec<SourcePrediction> = read_json(PROVIDER_ID, response).await?;

        Ok(sources
            .into_iter()
            .filter_map(|source| source.results)
            .flat_map(|results| results.predictions)
            .collect())
    }

    async fn run_job(&self, auth: &ApiKeyAuth, job_id: String) -> Result<Vec<FilePrediction>, AnalysisError> {
        let handle = ProviderJobHandle::new(job_id);
        let job_id = handle.external_job_id.as_str();
        poll_until_terminal(PROVIDER_ID, &handle, &self.poll, move || {
            self.poll_state(auth, job_id)
        })
        .await?;
        self.predictions(auth, job_id).await
    }
}

#[async_trait]
impl Provider for HumeClient {
    async fn infer(&self, input: Input<'_>) -> Result<Vec<UtteranceEmotions>, AnalysisError> {
        let started = Instant::now();
        let utterances = match input {
            Input::Text(segments) => {
                let segments: Vec<Segment> = segments
                    .iter()
                    .filter(|s| !s.text.trim().is_empty())
                    .cloned()
                    .collect();
                if segments.is_empty() {
                    return Ok(Vec::new());
                }
                let auth = require_auth(&self.auth, &self.config)?;
                let job_id = self.submit_text(auth, &segments).await?;
                let predictions = self.run_job(auth, job_id).await?;
                text_utterances(&segments, predictions)
            }
            Input::Audio(audio) => {
                if audio.bytes.is_empty() {
                    return Err(AnalysisError::InvalidInput("audio file is empty".to_string()));
                }
                let auth = require_auth(&self.auth, &self.config)?;
                let job_id = self.submit_audio(auth, audio).await?;
                let predictions = self.run_job(auth, job_id).await?;
                audio_utterances(predictions)
            }
        };

        info!(
            "Hume scored {} utterance(s) in {} mode in {:?}",
            utterances.len(),
            input.mode(),
            started.elapsed()
        );
        Ok(utterances)
    }

    fn provider_id(&self) -> &str {
        PROVIDER_ID
    }
}

/// One prediction per submitted text entry, in submission order.
fn text_utterances(
    segments: &[Segment],
    predictions: Vec<FilePrediction>,
) -> Vec<UtteranceEmotions> {
    if predictions.len() != segments.len() {
        warn!(
            "Hume returned {} text prediction(s) for {} utterance(s)",
            predictions.len(),
            segments.len()
        );
    }

    segments
        .iter()
        .zip(predictions)
        .map(|(segment, prediction)| {
            let scored: Vec<&Prediction> = prediction
                .models
                .language
                .iter()
                .flat_map(|model| &model.grouped_predictions)
                .flat_map(|group| &group.predictions)
                .collect();
            UtteranceEmotions {
                speaker: segment.speaker.clone(),
                text: Some(segment.text.clone()),
                start_ms: segment.start_ms,
                end_ms: segment.end_ms,
                emotions: average(&scored),
            }
        })
        .collect()
}

/// Prosody predictions per identified speaker, merged and ordered by start time.
fn audio_utterances(predictions: Vec<FilePrediction>) -> Vec<UtteranceEmotions> {
    let mut utterances: Vec<UtteranceEmotions> = predictions
        .into_iter()
        .filter_map(|prediction| prediction.models.prosody)
        .flat_map(|model| model.grouped_predictions)
        .flat_map(|group| {
            let speaker = if group.id.is_empty() {
                UNKNOWN_SPEAKER.to_string()
            } else {
                group.id
            };
            group
                .predictions
                .into_iter()
                .map(move |prediction| UtteranceEmotions {
                    speaker: speaker.clone(),
                    text: prediction.text,
                    start_ms: prediction.time.as_ref().map(|t| (t.begin * 1000.0) as i64),
                    end_ms: prediction.time.as_ref().map(|t| (t.end * 1000.0) as i64),
                    emotions: prediction.emotions,
                })
        })
        .collect();

    utterances.sort_by_key(|u| u.start_ms.unwrap_or(i64::MAX));
    utterances
}

fn average(predictions: &[&Prediction]) -> Vec<EmotionScore> {
    if predictions.is_empty() {
        return Vec::new();
    }
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for prediction in predictions {
        for emotion in &prediction.emotions {
            *totals.entry(emotion.name.as_str()).or_insert(0.0) += emotion.score;
        }
    }
    let count = predictions.len() as f64;
    totals
        .into_iter()
        .map(|(name, total)| EmotionScore {
            name: name.to_string(),
            score: total / count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::test_support::clients;
    use mockito::{Matcher, Server};
    use std::time::Duration;

    fn client(base_url: &str) -> HumeClient {
        HumeClient::new(
            clients(2),
            ApiKeyAuth::from_config(ApiKeyProvider::Hume, Some("hume-key")).ok(),
            hume_config().with_base_url(base_url),
            PollSettings::new(Duration::from_millis(1), 5),
        )
    }

    async fn mock_job(server: &mut mockito::ServerGuard, predictions: &str) -> Vec<mockito::Mock> {
        vec![
            server
                .mock("GET", "/batch/jobs/job-1")
                .match_header("x-hume-api-key", "hume-key")
                .with_body(r#"{"job_id": "job-1", "state": {"status": "COMPLETED"}}"#)
                .create_async()
                .await,
            server
                .mock("GET", "/batch/jobs/job-1/predictions")
                .with_body(predictions)
                .create_async()
                .await,
        ]
    }

    #[tokio::test]
    async fn test_text_mode_maps_predictions_to_transcript_speakers() {
        let mut server = Server::new_async().await;
        let submit = server
            .mock("POST", "/batch/jobs")
            .match_body(Matcher::PartialJson(json!({
                "text": ["I am thrilled.", "That worries me."]
            })))
            .with_body(r#"{"job_id": "job-1"}"#)
            .create_async()
            .await;
        let _job = mock_job(
            &mut server,
            r#"[
                {"source": {"type": "text"}, "results": {"predictions": [{"models": {"language": {
                    "grouped_predictions": [{"id": "unknown", "predictions": [
                        {"text": "I am thrilled.", "emotions": [{"name": "Joy", "score": 0.9}, {"name": "Fear", "score": 0.1}]}
                    ]}]}}}], "errors": []}},
                {"source": {"type": "text"}, "results": {"predictions": [{"models": {"language": {
                    "grouped_predictions": [{"id": "unknown", "predictions": [
                        {"text": "That", "emotions": [{"name": "Fear", "score": 0.6}]},
                        {"text": "worries me.", "emotions": [{"name": "Fear", "score": 0.8}]}
                    ]}]}}}], "errors": []}}
            ]"#,
        )
        .await;

        let segments = vec![
            Segment::new("A", "I am thrilled."),
            Segment::new("B", "That worries me."),
        ];
        let utterances = client(&server.url())
            .infer(Input::Text(&segments))
            .await
            .unwrap();

        submit.assert_async().await;
        assert_eq!(utterances.len(), 2);
        assert_eq!(utterances[0].speaker, "A");
        assert_eq!(utterances[0].dominant().unwrap().name, "Joy");
        assert_eq!(utterances[1].speaker, "B");
        assert!((utterances[1].emotions[0].score - 0.7).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_audio_mode_uses_multipart_and_orders_by_time() {
        let mut server = Server::new_async().await;
        let submit = server
            .mock("POST", "/batch/jobs")
            .match_header("content-type", Matcher::Regex("multipart/form-data".into()))
            .match_body(Matcher::Regex("identify_speakers".into()))
            .with_body(r#"{"job_id": "job-1"}"#)
            .create_async()
            .await;
        let _job = mock_job(
            &mut server,
            r#"[{"source": {"type": "file", "filename": "call.wav"}, "results": {"predictions": [{"models": {"prosody": {
                "grouped_predictions": [
                    {"id": "spk_1", "predictions": [{"text": "Fine.", "time": {"begin": 2.0, "end": 2.5}, "emotions": [{"name": "Calmness", "score": 0.5}]}]},
                    {"id": "spk_0", "predictions": [{"text": "Hello?", "time": {"begin": 0.1, "end": 1.2}, "emotions": [{"name": "Interest", "score": 0.4}]}]}
                ]}}}]}}]"#,
        )
        .await;

        let audio = Audio::new("call.wav", vec![0, 1, 2]);
        let utterances = client(&server.url())
            .infer(Input::Audio(&audio))
            .await
            .unwrap();

        submit.assert_async().await;
        assert_eq!(
            utterances.iter().map(|u| u.speaker.as_str()).collect::<Vec<_>>(),
            vec!["spk_0", "spk_1"]
        );
        assert_eq!(utterances[0].start_ms, Some(100));
    }

    #[tokio::test]
    async fn test_failed_job_surfaces_provider_message() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/batch/jobs")
            .with_body(r#"{"job_id": "job-2"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/batch/jobs/job-2")
            .with_body(r#"{"state": {"status": "FAILED", "message": "Unsupported media"}}"#)
            .create_async()
            .await;

        let segments = vec![Segment::new("A", "hello")];
        let err = client(&server.url())
            .infer(Input::Text(&segments))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::JobFailed(msg) if msg == "Unsupported media"));
    }

    #[tokio::test]
    async fn test_server_errors_are_retried_then_reported() {
        let mut server = Server::new_async().await;
        let submit = server
            .mock("POST", "/batch/jobs")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let segments = vec![Segment::new("A", "hello")];
        let err = client(&server.url())
            .infer(Input::Text(&segments))
            .await
            .unwrap_err();

        submit.assert_async().await;
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_empty_text_needs_no_request() {
        let segments = vec![Segment::new("A", "  ")];
        let utterances = client("http://127.0.0.1:9")
            .infer(Input::Text(&segments))
            .await
            .unwrap();
        assert!(utterances.is_empty());
    }
}
