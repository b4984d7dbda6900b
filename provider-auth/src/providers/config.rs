//! Pre-configured provider settings.

use crate::api_key::ApiKeyProvider;

/// Provider configuration with endpoints and settings.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Provider identifier.
    pub provider: ApiKeyProvider,
    /// Base API URL, without a trailing slash.
    pub base_url: String,
    /// Extra headers every request to the provider must carry.
    pub default_headers: Vec<(&'static str, &'static str)>,
}

impl ProviderConfig {
    /// Replace the base URL, e.g. to point at a proxy or a test server.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Join a path onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

/// Get AssemblyAI configuration.
pub fn assemblyai_config() -> ProviderConfig {
    ProviderConfig {
        provider: ApiKeyProvider::AssemblyAi,
        base_url: "https://api.assemblyai.com/v2".to_string(),
        default_headers: Vec::new(),
    }
}

/// Get Hume configuration.
pub fn hume_config() -> ProviderConfig {
    ProviderConfig {
        provider: ApiKeyProvider::Hume,
        base_url: "https://api.hume.ai/v0".to_string(),
        default_headers: Vec::new(),
    }
}

/// Get Anthropic configuration.
pub fn anthropic_config() -> ProviderConfig {
    ProviderConfig {
        provider: ApiKeyProvider::Anthropic,
        base_url: "https://api.anthropic.com/v1".to_string(),
        default_headers: vec![("anthropic-version", "2023-06-01")],
    }
}
