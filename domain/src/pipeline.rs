//! Job orchestration: classify, run the providers, merge and record the outcome.
//!
//! Pre-built JSON is validated and merged inline, so the returned job is already
//! terminal. Text and audio jobs are returned while `processing` and finished by a
//! background task; the coach and emotion analyses of one job run concurrently and
//! the merge waits for both.
//!
//! With a results directory configured and reuse enabled, a text or audio upload
//! whose bytes match an earlier successful job is completed from that job's record
//! without calling any provider, unless the submission asks to reprocess.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use analysis_ai::traits::{coach, emotion, transcription};
use analysis_ai::types::coach::Options as CoachOptions;
use analysis_ai::types::emotion::{Input as EmotionInput, UtteranceEmotions};
use analysis_ai::types::transcription::{Config as TranscriptionConfig, Transcript};
use analysis_ai::Audio;
use log::*;
use serde_json::Value;
use service::config::Config;

use crate::analysis::{AnalysisRecord, EmotionEntry, EMOTION_FIELD};
use crate::archive;
use crate::classifier::{classify, Artifact, Classification, Classified};
use crate::error::{Error, InputErrorKind};
use crate::facade::ResultFacade;
use crate::gateway::anthropic::AnthropicClient;
use crate::gateway::assembly_ai::AssemblyAiClient;
use crate::gateway::hume::HumeClient;
use crate::gateway::http_clients;
use crate::job::{FailureKind, Job, JobId, JobStore};
use crate::merge::{merge, normalize_analysis, Merged};
use crate::prompt::{analysis_instruction, DEFAULT_SYSTEM_PROMPT};
use crate::quintile;
use crate::transcript;
use crate::validation::{missing_analysis_fields, strict_violations};

/// The three analysis providers a pipeline calls.
#[derive(Clone)]
pub struct Providers {
    pub transcription: Arc<dyn transcription::Provider>,
    pub emotion: Arc<dyn emotion::Provider>,
    pub coach: Arc<dyn coach::Provider>,
}

impl Providers {
    /// HTTP gateways for AssemblyAI, Hume and Anthropic sharing one connection pool.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let clients = http_clients(config)?;
        Ok(Self {
            transcription: Arc::new(AssemblyAiClient::from_config(config, clients.clone())),
            emotion: Arc::new(HumeClient::from_config(config, clients.clone())),
            coach: Arc::new(AnthropicClient::from_config(config, clients)),
        })
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub transcription: TranscriptionConfig,
    pub coach: CoachOptions,
    /// Placed before the transcript in every coach request.
    pub instruction: String,
    pub strict_validation: bool,
    pub results_dir: Option<PathBuf>,
    /// Answer identical text or audio uploads from the results directory.
    pub reuse_results: bool,
}

impl Settings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            transcription: TranscriptionConfig {
                model: config.transcription_model().to_string(),
                ..TranscriptionConfig::default()
            },
            coach: CoachOptions {
                model: config.coach_model.clone(),
                max_tokens: config.coach_max_tokens,
                temperature: config.coach_temperature,
                system_prompt: Some(
                    config
                        .coach_system_prompt
                        .clone()
                        .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
                ),
            },
            instruction: analysis_instruction(),
            strict_validation: config.strict_validation,
            results_dir: config.results_dir.clone(),
            reuse_results: config.reuse_results,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            transcription: TranscriptionConfig::default(),
            coach: CoachOptions {
                system_prompt: Some(DEFAULT_SYSTEM_PROMPT.to_string()),
                ..CoachOptions::default()
            },
            instruction: analysis_instruction(),
            strict_validation: false,
            results_dir: None,
            reuse_results: true,
        }
    }
}

/// Per-submission choices made by the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubmitOptions {
    /// Call the providers even when an identical upload already has a stored result.
    pub force_reprocess: bool,
}

/// Work left for the background task of a text or audio job.
enum Work {
    Transcript(Transcript),
    Audio(Audio),
}

pub struct Pipeline {
    store: Arc<dyn JobStore>,
    providers: Providers,
    settings: Settings,
}

impl Pipeline {
    pub fn new(store: Arc<dyn JobStore>, providers: Providers, settings: Settings) -> Self {
        Self {
            store,
            providers,
            settings,
        }
    }

    pub fn facade(&self) -> ResultFacade {
        ResultFacade::new(self.store.clone())
    }

    /// Accept an artifact for analysis and return its job.
    ///
    /// Input errors detectable up front (unsupported type, malformed or mis-shaped
    /// JSON, empty text) are returned without creating a job.
    pub async fn submit(
        self: &Arc<Self>,
        primary: Artifact,
        secondary: Option<Artifact>,
    ) -> Result<Job, Error> {
        self.submit_with(primary, secondary, SubmitOptions::default())
            .await
    }

    /// [`Pipeline::submit`] with explicit [`SubmitOptions`].
    pub async fn submit_with(
        self: &Arc<Self>,
        primary: Artifact,
        secondary: Option<Artifact>,
        options: SubmitOptions,
    ) -> Result<Job, Error> {
        let Classification { input, warnings } = classify(primary, secondary)?;

        match input {
            Classified::PrebuiltJson { primary, emotion } => {
                self.submit_json(&primary, emotion.as_deref(), warnings).await
            }
            Classified::Transcript(text) => {
                let transcript = transcript::parse(&text)?;
                let key = self.content_key("transcript", text.as_bytes());
                self.start(Work::Transcript(transcript), warnings, key, options)
                    .await
            }
            Classified::Audio(audio) => {
                let key = self.content_key("audio", &audio.bytes);
                self.start(Work::Audio(audio), warnings, key, options).await
            }
        }
    }

    async fn submit_json(
        &self,
        primary: &[u8],
        emotion: Option<&[u8]>,
        mut warnings: Vec<String>,
    ) -> Result<Job, Error> {
        let value: Value = serde_json::from_slice(primary).map_err(|e| {
            Error::input(
                InputErrorKind::MalformedJson,
                format!("Invalid JSON syntax: {}", e),
            )
        })?;

        let analysis = normalize_analysis(&value);
        let missing = missing_analysis_fields(&analysis);
        if !missing.is_empty() {
            return Err(structure_mismatch(&missing));
        }

        // A separate emotion file takes precedence over emotions embedded in the analysis.
        let emotion = match emotion {
            Some(bytes) => match serde_json::from_slice::<Value>(bytes) {
                Ok(list) => Some(list),
                Err(e) => {
                    let warning = format!("Emotion data ignored: invalid JSON syntax: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                    None
                }
            },
            None => analysis.get(EMOTION_FIELD).cloned(),
        };

        let merged = merge(&analysis, emotion.as_ref());
        if let Ok(Merged { record, .. }) = &merged {
            if self.settings.strict_validation {
                let violations = strict_violations(record);
                if !violations.is_empty() {
                    return Err(structure_mismatch(&violations));
                }
            }
        }

        let job = self.store.create().await?;
        match merged {
            Ok(Merged {
                record,
                warnings: merge_warnings,
            }) => {
                for warning in warnings.into_iter().chain(merge_warnings) {
                    self.store.warn(job.id, warning).await?;
                }
                self.archive(job.id, &record).await;
                self.store.complete(job.id, record).await
            }
            Err(e) => {
                for warning in warnings {
                    self.store.warn(job.id, warning).await?;
                }
                self.store
                    .fail(job.id, e.message(), FailureKind::from(&e.error_kind))
                    .await
            }
        }
    }

    async fn start(
        self: &Arc<Self>,
        work: Work,
        warnings: Vec<String>,
        key: Option<String>,
        options: SubmitOptions,
    ) -> Result<Job, Error> {
        let job = self.store.create().await?;
        for warning in warnings {
            self.store.warn(job.id, warning).await?;
        }

        if !options.force_reprocess {
            if let Some(record) = self.cached(job.id, key.as_deref()).await {
                self.archive(job.id, &record).await;
                return self.store.complete(job.id, record).await;
            }
        }

        let pipeline = self.clone();
        let id = job.id;
        tokio::spawn(async move { pipeline.run(id, work, key).await });
        Ok(job)
    }

    async fn run(self: Arc<Self>, id: JobId, work: Work, key: Option<String>) {
        let started = Instant::now();
        let transition = match self.analyze(id, work).await {
            Ok(record) => {
                self.archive(id, &record).await;
                if let Some(key) = &key {
                    self.remember(id, key, &record).await;
                }
                self.store.complete(id, record).await
            }
            Err(e) => {
                error!("Job {} failed: {}", id, e);
                self.store
                    .fail(id, e.message(), FailureKind::from(&e.error_kind))
                    .await
            }
        };

        match transition {
            Ok(job) => info!(
                "Job {} finished as {:?} in {:?}",
                id,
                job.status(),
                started.elapsed()
            ),
            Err(e) => error!("Job {} could not be finalized: {}", id, e),
        }
    }

    async fn analyze(&self, id: JobId, work: Work) -> Result<AnalysisRecord, Error> {
        let (transcript, audio) = match work {
            Work::Transcript(transcript) => (transcript, None),
            Work::Audio(audio) => (self.transcribe(id, &audio).await?, Some(audio)),
        };
        if transcript.is_empty() {
            return Err(Error::input(
                InputErrorKind::EmptyTranscript,
                "Transcript is empty",
            ));
        }

        let rendered = transcript::render(&transcript);
        let emotion_input = match &audio {
            Some(audio) => EmotionInput::Audio(audio),
            None => EmotionInput::Text(&transcript.segments),
        };

        let (coach_output, emotions) = tokio::join!(
            self.coach(id, &rendered),
            self.emotions(id, emotion_input)
        );
        let coach_output = coach_output?;

        let emotion_list = match emotions {
            Ok(utterances) => {
                let quintiles = quintile::analyze(&utterances);
                for bucket in &quintiles {
                    debug!("Job {}: {}", id, bucket.describe());
                }
                let entries: Vec<EmotionEntry> =
                    quintiles.into_iter().map(EmotionEntry::from).collect();
                if entries.is_empty() {
                    self.store
                        .warn(id, "Emotion provider returned no scored utterances".to_string())
                        .await?;
                    None
                } else {
                    Some(serde_json::to_value(entries)?)
                }
            }
            Err(e) => {
                self.store
                    .warn(id, format!("Emotion analysis unavailable: {}", e.message()))
                    .await?;
                None
            }
        };

        let Merged { record, warnings } = merge(&coach_output, emotion_list.as_ref())?;
        for warning in warnings {
            self.store.warn(id, warning).await?;
        }
        info!(
            "Job {}: merged {} emotion entries for speakers {:?}",
            id,
            record.emotion_analysis.len(),
            record.emotion_speakers()
        );

        if self.settings.strict_validation {
            let violations = strict_violations(&record);
            if !violations.is_empty() {
                return Err(Error::merge(violations.join("; ")));
            }
        }
        Ok(record)
    }

    async fn transcribe(&self, id: JobId, audio: &Audio) -> Result<Transcript, Error> {
        let provider = &self.providers.transcription;
        let started = Instant::now();
        let result = provider
            .transcribe(audio, &self.settings.transcription)
            .await;
        log_call(id, provider.provider_id(), "transcription", started, &result);
        Ok(result?)
    }

    async fn coach(&self, id: JobId, rendered: &str) -> Result<Value, Error> {
        let provider = &self.providers.coach;
        let started = Instant::now();
        let result = provider
            .analyze(rendered, &self.settings.instruction, &self.settings.coach)
            .await;
        log_call(id, provider.provider_id(), "coach", started, &result);
        Ok(result?)
    }

    async fn emotions(
        &self,
        id: JobId,
        input: EmotionInput<'_>,
    ) -> Result<Vec<UtteranceEmotions>, Error> {
        let provider = &self.providers.emotion;
        let started = Instant::now();
        let result = provider.infer(input).await;
        log_call(id, provider.provider_id(), "emotion", started, &result);
        Ok(result?)
    }

    /// Cache key of an upload, or `None` when results are not reused.
    fn content_key(&self, kind: &str, bytes: &[u8]) -> Option<String> {
        if !self.settings.reuse_results || self.settings.results_dir.is_none() {
            return None;
        }
        // Entries are specific to the configured models.
        Some(archive::content_key(&[
            kind.as_bytes(),
            self.settings.transcription.model.as_bytes(),
            self.settings.coach.model.as_bytes(),
            bytes,
        ]))
    }

    async fn cached(&self, id: JobId, key: Option<&str>) -> Option<AnalysisRecord> {
        let (dir, key) = (self.settings.results_dir.as_ref()?, key?);
        match archive::read_cached(dir, key).await {
            Ok(Some(record)) => {
                info!("Job {}: reusing stored result {} without provider calls", id, key);
                Some(record)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Job {}: ignoring unreadable stored result {}: {}", id, key, e);
                None
            }
        }
    }

    async fn remember(&self, id: JobId, key: &str, record: &AnalysisRecord) {
        if let Some(dir) = &self.settings.results_dir {
            if let Err(e) = archive::write_cached(dir, key, record).await {
                warn!("Job {}: result could not be stored for reuse: {}", id, e);
            }
        }
    }

    async fn archive(&self, id: JobId, record: &AnalysisRecord) {
        if let Some(dir) = &self.settings.results_dir {
            if let Err(e) = archive::write_record(dir, id, record).await {
                warn!("Job {} could not be archived to {}: {}", id, dir.display(), e);
            }
        }
    }
}

fn structure_mismatch(problems: &[String]) -> Error {
    Error::input(
        InputErrorKind::StructureMismatch,
        format!(
            "JSON does not match the required analysis structure: missing or invalid {}",
            problems.join(", ")
        ),
    )
}

fn log_call<T>(
    id: JobId,
    provider: &str,
    stage: &str,
    started: Instant,
    result: &Result<T, analysis_ai::Error>,
) {
    match result {
        Ok(_) => info!(
            "Job {}: {} {} call succeeded in {:?}",
            id,
            provider,
            stage,
            started.elapsed()
        ),
        Err(e) => warn!(
            "Job {}: {} {} call failed after {:?}: {}",
            id,
            provider,
            stage,
            started.elapsed(),
            e
        ),
    }
}
