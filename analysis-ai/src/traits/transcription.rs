//! Transcription provider trait.

use crate::types::media::Audio;
use crate::types::transcription::{Config, Transcript};
use crate::Error;
use async_trait::async_trait;

/// Abstraction for speech-to-text transcription services.
///
/// Implementations convert audio to a speaker-attributed transcript. Providers that
/// run transcription as an asynchronous job submit, poll and fetch internally, so
/// callers only see a single awaitable call.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Transcribe `audio`, returning once the provider reports a terminal state.
    ///
    /// Fails with `Error::Timeout` if the provider job does not finish within the
    /// configured polling ceiling.
    async fn transcribe(&self, audio: &Audio, config: &Config)
        -> std::result::Result<Transcript, Error>;

    /// Return unique identifier for this provider (e.g., "assemblyai", "deepgram").
    ///
    /// Used for logging and provider selection.
    /// Must be lowercase, alphanumeric with underscores only.
    fn provider_id(&self) -> &str;
}
