//! Emotion inference provider trait.

use crate::types::emotion::{Input, UtteranceEmotions};
use crate::Error;
use async_trait::async_trait;

/// Abstraction for services that score emotions in speech or text.
///
/// Implementations return one multi-emotion score vector per utterance, keyed by
/// speaker, in conversation order. How scores are computed is up to the provider.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Score every utterance of `input`.
    async fn infer(&self, input: Input<'_>)
        -> std::result::Result<Vec<UtteranceEmotions>, Error>;

    /// Return unique identifier for this provider (e.g., "hume").
    fn provider_id(&self) -> &str;
}
