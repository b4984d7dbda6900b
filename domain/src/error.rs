//! Error types for the `domain` layer.
use analysis_ai::Error as AnalysisError;
use provider_auth::error::Error as ProviderAuthError;
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors in the Domain layer are modeled as a tree structure
/// with `domain::error::Error` as the root type holding a tree of `error_kind`
/// enums that represent the kinds of errors that can occur in the domain layer or
/// in lower layers. The `source` field is used to hold the original error that caused
/// the domain error. The intent is to translate errors between layers while maintaining
/// layer boundaries. Ex. `domain` is dependent on `analysis-ai`, and `web` is dependent on `domain`,
/// but `web` should not be dependent, directly, on `analysis-ai`. Ultimately the various
/// `error_kind`s are used by `web` to return appropriate HTTP status codes and messages to the client.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Internal(InternalErrorKind),
    External(ExternalErrorKind),
}

/// Enum representing the various kinds of internal errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    /// Caller supplied something the pipeline cannot accept.
    Input(InputErrorKind),
    /// A provider call succeeded but its output lacks a required field.
    Merge(String),
    Job(JobErrorKind),
    Config,
    Other(String),
}

#[derive(Debug, PartialEq)]
pub enum InputErrorKind {
    MalformedJson,
    StructureMismatch,
    UnsupportedFileType,
    EmptyTranscript,
    MissingArtifact,
    /// A provider refused the artifact itself (undecodable audio etc.).
    RejectedByProvider,
}

#[derive(Debug, PartialEq)]
pub enum JobErrorKind {
    NotFound,
    NotReady,
    AlreadyTerminal,
}

/// Enum representing the various kinds of external errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    Network,
    Timeout,
    Upstream,
    Authentication,
    MalformedResponse,
    Other(String),
}

impl Error {
    pub fn input(kind: InputErrorKind, message: impl Into<String>) -> Self {
        let message: String = message.into();
        Error {
            source: Some(message.into()),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Input(kind)),
        }
    }

    pub fn job(kind: JobErrorKind, message: impl Into<String>) -> Self {
        let message: String = message.into();
        Error {
            source: Some(message.into()),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Job(kind)),
        }
    }

    pub fn merge(message: impl Into<String>) -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Merge(message.into())),
        }
    }

    pub fn is_input(&self) -> bool {
        matches!(
            self.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Input(_))
        )
    }

    /// Message suitable for a job's error string or an HTTP error body.
    pub fn message(&self) -> String {
        match (&self.error_kind, &self.source) {
            (DomainErrorKind::Internal(InternalErrorKind::Merge(message)), _) => {
                format!("Merge failed: {}", message)
            }
            (DomainErrorKind::Internal(InternalErrorKind::Input(_)), Some(source))
            | (DomainErrorKind::Internal(InternalErrorKind::Job(_)), Some(source)) => {
                source.to_string()
            }
            (kind, Some(source)) => format!("{}: {}", kind_label(kind), source),
            (kind, None) => kind_label(kind).to_string(),
        }
    }
}

fn kind_label(kind: &DomainErrorKind) -> &'static str {
    match kind {
        DomainErrorKind::Internal(InternalErrorKind::Input(_)) => "Invalid input",
        DomainErrorKind::Internal(InternalErrorKind::Merge(_)) => "Merge failed",
        DomainErrorKind::Internal(InternalErrorKind::Job(_)) => "Job error",
        DomainErrorKind::Internal(InternalErrorKind::Config) => "Configuration error",
        DomainErrorKind::Internal(InternalErrorKind::Other(_)) => "Internal error",
        DomainErrorKind::External(ExternalErrorKind::Network) => "Provider unreachable",
        DomainErrorKind::External(ExternalErrorKind::Timeout) => "Provider timed out",
        DomainErrorKind::External(ExternalErrorKind::Upstream) => "Provider error",
        DomainErrorKind::External(ExternalErrorKind::Authentication) => {
            "Provider authentication failed"
        }
        DomainErrorKind::External(ExternalErrorKind::MalformedResponse) => {
            "Malformed provider response"
        }
        DomainErrorKind::External(ExternalErrorKind::Other(_)) => "External error",
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

// This is where provider errors are reduced to the domain taxonomy. Nothing above
// this layer looks at a provider-specific error shape.
impl From<AnalysisError> for Error {
    fn from(err: AnalysisError) -> Self {
        let error_kind = match &err {
            AnalysisError::Network(_) => DomainErrorKind::External(ExternalErrorKind::Network),
            AnalysisError::Timeout(_) => DomainErrorKind::External(ExternalErrorKind::Timeout),
            AnalysisError::Upstream { .. } | AnalysisError::JobFailed(_) => {
                DomainErrorKind::External(ExternalErrorKind::Upstream)
            }
            AnalysisError::Authentication(_) => {
                DomainErrorKind::External(ExternalErrorKind::Authentication)
            }
            AnalysisError::MalformedUpstreamJson(_) => {
                DomainErrorKind::External(ExternalErrorKind::MalformedResponse)
            }
            AnalysisError::InvalidInput(_) => DomainErrorKind::Internal(
                InternalErrorKind::Input(InputErrorKind::RejectedByProvider),
            ),
            AnalysisError::Configuration(_) => DomainErrorKind::Internal(InternalErrorKind::Config),
            AnalysisError::Other(_) => DomainErrorKind::External(ExternalErrorKind::Other(
                "Unclassified provider error".to_string(),
            )),
        };
        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

impl From<ProviderAuthError> for Error {
    fn from(err: ProviderAuthError) -> Self {
        AnalysisError::from(err).into()
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                "JSON serialization error".to_string(),
            )),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                "I/O error".to_string(),
            )),
        }
    }
}
