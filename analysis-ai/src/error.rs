//! Error types for conversation analysis providers.

use std::fmt;

/// Universal error type that abstracts provider-specific errors into common variants.
///
/// All provider implementations map their native errors to these variants, so no
/// caller above the adapter layer ever inspects a provider-specific error format.
#[derive(Debug)]
pub enum Error {
    /// API key missing, invalid or lacking permissions.
    Authentication(String),

    /// Network connectivity issues, DNS failures, or dropped connections.
    /// These errors are transient and were already retried by the HTTP layer.
    Network(String),

    /// The artifact handed to the provider cannot be processed (empty audio,
    /// unsupported format, empty transcript).
    InvalidInput(String),

    /// Provider answered with a non-success status.
    Upstream { status: u16, message: String },

    /// Operation exceeded the request timeout or the polling ceiling.
    Timeout(String),

    /// A provider-side asynchronous job reached its failed state.
    JobFailed(String),

    /// Provider answered successfully but its body could not be parsed into the
    /// expected structure.
    MalformedUpstreamJson(String),

    /// Missing or inconsistent client configuration.
    Configuration(String),

    /// Catch-all for errors that don't fit other categories.
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Whether retrying the same call could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Network(_) | Error::Timeout(_) => true,
            Error::Upstream { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Map an HTTP status and body into the matching variant.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => Error::Authentication(message),
            408 | 504 => Error::Timeout(message),
            400 | 413 | 415 | 422 => Error::InvalidInput(message),
            _ => Error::Upstream { status, message },
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Authentication(msg) => write!(f, "Authentication failed: {}", msg),
            Error::Network(msg) => write!(f, "Network error: {}", msg),
            Error::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            Error::Upstream { status, message } => {
                write!(f, "Provider returned {}: {}", status, message)
            }
            Error::Timeout(msg) => write!(f, "Timeout: {}", msg),
            Error::JobFailed(msg) => write!(f, "Provider job failed: {}", msg),
            Error::MalformedUpstreamJson(msg) => write!(f, "Malformed provider response: {}", msg),
            Error::Configuration(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::Other(err) => write!(f, "Other error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Other(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<provider_auth::Error> for Error {
    fn from(err: provider_auth::Error) -> Self {
        use provider_auth::ErrorKind;

        match &err.error_kind {
            ErrorKind::ApiKey(_) => Error::Authentication(err.to_string()),
            ErrorKind::Http(_) if err.is_timeout() => Error::Timeout(err.to_string()),
            ErrorKind::Http(provider_auth::error::HttpErrorKind::BuilderFailed) => {
                Error::Configuration(err.to_string())
            }
            ErrorKind::Http(_) => Error::Network(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::MalformedUpstreamJson(err.to_string())
    }
}
