use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::*;
use serde::Serialize;

use domain::error::{
    DomainErrorKind, Error as DomainError, ExternalErrorKind, InternalErrorKind, JobErrorKind,
};

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error(DomainError);

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    status_code: u16,
    error: String,
}

impl Error {
    fn status_code(&self) -> StatusCode {
        match &self.0.error_kind {
            DomainErrorKind::Internal(internal_error_kind) => match internal_error_kind {
                InternalErrorKind::Input(_) => StatusCode::UNPROCESSABLE_ENTITY,
                InternalErrorKind::Job(JobErrorKind::NotFound) => StatusCode::NOT_FOUND,
                InternalErrorKind::Job(JobErrorKind::NotReady)
                | InternalErrorKind::Job(JobErrorKind::AlreadyTerminal) => StatusCode::CONFLICT,
                InternalErrorKind::Merge(_)
                | InternalErrorKind::Config
                | InternalErrorKind::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            DomainErrorKind::External(external_error_kind) => match external_error_kind {
                ExternalErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
                ExternalErrorKind::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_GATEWAY,
            },
        }
    }
}

// List of possible StatusCode variants https://docs.rs/http/latest/http/status/struct.StatusCode.html#associatedconstant.UNPROCESSABLE_ENTITY
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Input and job errors carry a message written for the caller; anything else
        // is logged here and reported only by its reason phrase.
        let error = match &self.0.error_kind {
            DomainErrorKind::Internal(InternalErrorKind::Input(_))
            | DomainErrorKind::Internal(InternalErrorKind::Job(_)) => self.0.message(),
            _ => {
                error!("Request failed: {}", self.0.message());
                status
                    .canonical_reason()
                    .unwrap_or("INTERNAL SERVER ERROR")
                    .to_uppercase()
            }
        };
        let body = ErrorBody {
            status_code: status.into(),
            error,
        };
        (status, Json(body)).into_response()
    }
}

impl<E> From<E> for Error
where
    E: Into<DomainError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::error::InputErrorKind;

    fn status_of(err: DomainError) -> StatusCode {
        Error::from(err).into_response().status()
    }

    #[test]
    fn test_input_errors_are_unprocessable() {
        let err = DomainError::input(InputErrorKind::UnsupportedFileType, "Unsupported file type: .pdf");
        assert_eq!(status_of(err), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_job_errors_map_to_404_and_409() {
        assert_eq!(
            status_of(DomainError::job(JobErrorKind::NotFound, "missing")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(DomainError::job(JobErrorKind::NotReady, "processing")),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(DomainError::job(JobErrorKind::AlreadyTerminal, "done")),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_provider_errors_map_to_gateway_statuses() {
        let timeout = DomainError {
            source: None,
            error_kind: DomainErrorKind::External(ExternalErrorKind::Timeout),
        };
        let upstream = DomainError {
            source: None,
            error_kind: DomainErrorKind::External(ExternalErrorKind::Upstream),
        };
        assert_eq!(status_of(timeout), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(status_of(upstream), StatusCode::BAD_GATEWAY);
        assert_eq!(
            status_of(DomainError::merge("missing conversation_summary")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
