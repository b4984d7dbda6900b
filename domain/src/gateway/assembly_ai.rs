//! AssemblyAI API client for transcription services.
//!
//! Transcription runs as an AssemblyAI job: the audio is uploaded, a transcript is
//! requested with speaker labels, and the transcript is polled until it completes.
//! Callers only see [`Provider::transcribe`].

use std::time::Instant;

use analysis_ai::traits::transcription::Provider;
use analysis_ai::types::job::{PollState, ProviderJobHandle};
use analysis_ai::types::transcription::{Config as TranscriptionConfig, Segment, Transcript};
use analysis_ai::{Audio, Error as AnalysisError};
use async_trait::async_trait;
use log::*;
use provider_auth::api_key::{ApiKeyAuth, ApiKeyProvider, ProviderAuth};
use provider_auth::http::ProviderClients;
use provider_auth::providers::{assemblyai_config, ProviderConfig};
use serde::{Deserialize, Serialize};
use service::config::Config;

use super::polling::{poll_until_terminal, PollSettings};
use super::{api_key_auth, read_json, require_auth, transport};
use crate::transcript::DEFAULT_SPEAKER;

const PROVIDER_ID: &str = "assemblyai";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_url: String,
}

/// Request to create a new transcription
#[derive(Debug, Serialize)]
struct CreateTranscriptRequest<'a> {
    audio_url: &'a str,
    speech_model: &'a str,
    speaker_labels: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    language_code: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TranscriptResponse {
    id: String,
    status: TranscriptStatus,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    words: Option<Vec<Word>>,
    #[serde(default)]
    utterances: Option<Vec<Utterance>>,
    #[serde(default)]
    language_code: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "lowercase")]
enum TranscriptStatus {
    Queued,
    Processing,
    Completed,
    Error,
}

#[derive(Debug, Deserialize)]
struct Word {
    text: String,
    start: i64,
    end: i64,
    #[serde(default)]
    speaker: Option<String>,
}

/// Utterance (speaker segment) with timing
#[derive(Debug, Deserialize)]
struct Utterance {
    text: String,
    start: i64,
    end: i64,
    speaker: String,
}

/// AssemblyAI API client
pub struct AssemblyAiClient {
    clients: ProviderClients,
    auth: Option<ApiKeyAuth>,
    config: ProviderConfig,
    poll: PollSettings,
}

impl AssemblyAiClient {
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
        let auth = api_key_auth(
            ApiKeyProvider::AssemblyAi,
            config.transcription_api_key().as_deref(),
        );
        Self::new(
            clients,
            auth,
            assemblyai_config().with_base_url(config.transcription_base_url()),
            PollSettings::from_config(config),
        )
    }

    async fn upload(&self, auth: &ApiKeyAuth, audio: &Audio) -> Result<String, AnalysisError> {
        debug!(
            "Uploading {} ({} bytes) to AssemblyAI",
            audio.file_name,
            audio.bytes.len()
        );
        let request = self
            .clients
            .client
            .post(self.config.endpoint("upload"))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(audio.bytes.clone());

        let response = auth.authenticate(request).send().await.map_err(transport)?;
        let upload: UploadResponse = read_json(PROVIDER_ID, response).await?;
        Ok(upload.upload_url)
    }

    async fn create_transcript(
        &self,
        auth: &ApiKeyAuth,
        request: &CreateTranscriptRequest<'_>,
    ) -> Result<TranscriptResponse, AnalysisError> {
        let builder = self
            .clients
            .client
            .post(self.config.endpoint("transcript"))
            .json(request);

        let response = auth.authenticate(builder).send().await.map_err(transport)?;
        let transcript: TranscriptResponse = read_json(PROVIDER_ID, response).await?;
        info!("Created AssemblyAI transcript with ID: {}", transcript.id);
        Ok(transcript)
    }

    async fn get_transcript(
        &self,
        auth: &ApiKeyAuth,
        transcript_id: &str,
    ) -> Result<TranscriptResponse, AnalysisError> {
        let builder = self
            .clients
            .client
            .get(self.config.endpoint(&format!("transcript/{}", transcript_id)));

        let response = auth.authenticate(builder).send().await.map_err(transport)?;
        read_json(PROVIDER_ID, response).await
    }

    async fn poll_state(
        &self,
        auth: &ApiKeyAuth,
        transcript_id: &str,
    ) -> Result<PollState, AnalysisError> {
        let transcript = self.get_transcript(auth, transcript_id).await?;
        Ok(match transcript.status {
            TranscriptStatus::Queued | TranscriptStatus::Processing => PollState::Pending,
            TranscriptStatus::Completed => PollState::Completed,
            TranscriptStatus::Error => PollState::Failed(
                transcript
                    .error
                    .unwrap_or_else(|| "transcription failed".to_string()),
            ),
        })
    }
}

#[async_trait]
impl Provider for AssemblyAiClient {
    async fn transcribe(
        &self,
        audio: &Audio,
        config: &TranscriptionConfig,
    ) -> Result<Transcript, AnalysisError> {
        if audio.bytes.is_empty() {
            return Err(AnalysisError::InvalidInput("audio file is empty".to_string()));
        }
        let auth = require_auth(&self.auth, &self.config)?;
        let started = Instant::now();

        let upload_url = self.upload(auth, audio).await?;
        let request = CreateTranscriptRequest {
            audio_url: &upload_url,
            speech_model: &config.model,
            speaker_labels: config.enable_speaker_labels,
            language_code: config.language_code.as_deref(),
        };
        let created = self.create_transcript(auth, &request).await?;
        let handle = ProviderJobHandle::new(created.id);

        let transcript_id = handle.external_job_id.as_str();
        poll_until_terminal(PROVIDER_ID, &handle, &self.poll, move || {
            self.poll_state(auth, transcript_id)
        })
        .await?;

        let completed = self.get_transcript(auth, transcript_id).await?;
        let transcript = into_transcript(completed);
        info!(
            "AssemblyAI transcribed {} into {} segment(s) in {:?}",
            audio.file_name,
            transcript.segments.len(),
            started.elapsed()
        );
        Ok(transcript)
    }

    fn provider_id(&self) -> &str {
        PROVIDER_ID
    }
}

/// Prefer diarized utterances, then words grouped by speaker, then the plain text.
fn into_transcript(response: TranscriptResponse) -> Transcript {
    let segments = match (response.utterances, response.words, response.text) {
        (Some(utterances), _, _) if !utterances.is_empty() => utterances
            .into_iter()
            .map(|u| Segment {
                speaker: u.speaker,
                text: u.text,
                start_ms: Some(u.start),
                end_ms: Some(u.end),
            })
            .collect(),
        (_, Some(words), _) if !words.is_empty() => group_words(words),
        (_, _, Some(text)) if !text.trim().is_empty() => vec![Segment::new(DEFAULT_SPEAKER, text)],
        _ => Vec::new(),
    };

    Transcript {
        segments,
        language_code: response.language_code,
    }
}

fn group_words(words: Vec<Word>) -> Vec<Segment> {
    let mut segments: Vec<Segment> = Vec::new();
    for word in words {
        let speaker = word.speaker.unwrap_or_else(|| DEFAULT_SPEAKER.to_string());
        match segments.last_mut() {
            Some(last) if last.speaker == speaker => {
                last.text.push(' ');
                last.text.push_str(&word.text);
                last.end_ms = Some(word.end);
            }
            _ => segments.push(Segment {
                speaker,
                text: word.text,
                start_ms: Some(word.start),
                end_ms: Some(word.end),
            }),
        }
    }
    segments
}
