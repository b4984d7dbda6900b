//! API key authentication trait and implementation.

use reqwest_middleware::RequestBuilder;
use secrecy::{ExposeSecret, SecretString};

use crate::error::{api_key_error, ApiKeyErrorKind, Error};

/// Known API key providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKeyProvider {
    AssemblyAi,
    Hume,
    Anthropic,
}

impl ApiKeyProvider {
    /// Get the provider identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiKeyProvider::AssemblyAi => "assemblyai",
            ApiKeyProvider::Hume => "hume",
            ApiKeyProvider::Anthropic => "anthropic",
        }
    }

    /// Header carrying the key for this provider.
    pub fn header_name(&self) -> &'static str {
        match self {
            ApiKeyProvider::AssemblyAi => "authorization",
            ApiKeyProvider::Hume => "X-Hume-Api-Key",
            ApiKeyProvider::Anthropic => "x-api-key",
        }
    }
}

/// Authentication method for HTTP requests.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthMethod {
    /// The raw key in a provider-specific header (e.g., "X-Hume-Api-Key: xxx")
    ApiKeyHeader { header_name: String },
}

/// Trait for authenticating HTTP requests with API keys.
///
/// Implementations handle provider-specific authentication patterns like:
/// - AssemblyAI: `authorization: xxx`
/// - Hume: `X-Hume-Api-Key: xxx`
/// - Anthropic: `x-api-key: xxx`
pub trait ProviderAuth: Send + Sync {
    /// Get the provider identifier.
    fn provider(&self) -> ApiKeyProvider;

    /// Get the authentication method used by this provider.
    fn auth_method(&self) -> AuthMethod;

    /// Apply authentication to a request builder.
    fn authenticate(&self, request: RequestBuilder) -> RequestBuilder;

    /// Apply authentication to a plain reqwest request builder.
    ///
    /// Used for requests sent outside the middleware stack, such as multipart uploads.
    fn authenticate_plain(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder;
}

/// API key authentication implementation.
///
/// # Examples
///
/// ```rust,ignore
/// let auth = ApiKeyAuth::new(ApiKeyProvider::Hume, SecretString::from("api_key_here".to_string()));
/// ```
pub struct ApiKeyAuth {
    provider: ApiKeyProvider,
    api_key: SecretString,
    header_name: String,
}

impl ApiKeyAuth {
    /// Create a new API key authenticator using the provider's header convention.
    pub fn new(provider: ApiKeyProvider, api_key: SecretString) -> Self {
        Self {
            provider,
            api_key,
            header_name: provider.header_name().to_string(),
        }
    }

    /// Build an authenticator from a configured key that may be absent or blank.
    pub fn from_config(provider: ApiKeyProvider, api_key: Option<&str>) -> Result<Self, Error> {
        match api_key.map(str::trim) {
            None | Some("") => Err(api_key_error(
                ApiKeyErrorKind::Missing,
                &format!("no API key configured for {}", provider.as_str()),
            )),
            Some(key) if key.chars().any(char::is_whitespace) => Err(api_key_error(
                ApiKeyErrorKind::InvalidFormat,
                &format!("API key for {} contains whitespace", provider.as_str()),
            )),
            Some(key) => Ok(Self::new(provider, SecretString::from(key.to_string()))),
        }
    }

    /// Get a reference to the API key.
    pub fn api_key(&self) -> &SecretString {
        &self.api_key
    }
}

impl ProviderAuth for ApiKeyAuth {
    fn provider(&self) -> ApiKeyProvider {
        self.provider
    }

    fn auth_method(&self) -> AuthMethod {
        AuthMethod::ApiKeyHeader {
            header_name: self.header_name.clone(),
        }
    }

    fn authenticate(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(self.header_name.as_str(), self.api_key.expose_secret())
    }

    fn authenticate_plain(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.header(self.header_name.as_str(), self.api_key.expose_secret())
    }
}
