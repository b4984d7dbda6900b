//! Conversation coach provider trait.

use crate::types::coach::Options;
use crate::Error;
use async_trait::async_trait;
use serde_json::Value;

/// Abstraction for LLM-powered conversation coaching.
///
/// Implementations send the rendered transcript plus an instruction to a large
/// language model and return the single JSON document found in its reply. The
/// upstream model is not trusted to format its reply: prose around the JSON is
/// tolerated, and a reply with no parseable JSON yields
/// `Error::MalformedUpstreamJson`, distinct from network failures.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Analyze `transcript` following `instruction`.
    async fn analyze(
        &self,
        transcript: &str,
        instruction: &str,
        options: &Options,
    ) -> std::result::Result<Value, Error>;

    /// Return unique identifier for this provider (e.g., "anthropic", "openai").
    fn provider_id(&self) -> &str;
}
