//! Submission of conversations for analysis and retrieval of job status and results.

use crate::{AppState, Result};

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use domain::analysis::{AnalysisRecord, PrioritizedRecommendation};
use domain::error::{Error as DomainError, InputErrorKind, JobErrorKind};
use domain::facade::StatusView;
use domain::{Artifact, Job, JobId, JobStatus, SubmitOptions};
use log::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Multipart field holding the conversation artifact.
pub(crate) const FILE_FIELD: &str = "file";
/// Optional multipart field holding pre-computed emotion data.
pub(crate) const EMOTION_FILE_FIELD: &str = "emotion_file";
/// Optional multipart field; `true` skips reuse of a stored result.
pub(crate) const FORCE_REPROCESS_FIELD: &str = "force_reprocess";

#[derive(Debug, Deserialize, ToSchema)]
pub struct TextParams {
    /// Pasted transcript, optionally with `[speaker]: text` lines.
    pub text: String,
    /// Run the providers even if this exact text was analyzed before.
    #[serde(default)]
    pub force_reprocess: bool,
}

/// Multipart form accepted by `POST /analyses`.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    /// Audio (.wav .mp3 .m4a .aac .ogg .flac), transcript (.txt .md) or analysis JSON.
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    file: String,
    /// Emotion entries to merge into an uploaded analysis JSON.
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    emotion_file: Option<String>,
    /// Run the providers even if this exact file was analyzed before.
    force_reprocess: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitResponse {
    #[schema(value_type = Uuid)]
    pub job_id: JobId,
    pub status: JobStatus,
    pub message: String,
}

impl From<Job> for SubmitResponse {
    fn from(job: Job) -> Self {
        let message = match job.status() {
            JobStatus::Processing => "Analysis started".to_string(),
            JobStatus::Completed => "Analysis completed".to_string(),
            JobStatus::Failed => job.error().unwrap_or("Analysis failed").to_string(),
        };
        Self {
            job_id: job.id,
            status: job.status(),
            message,
        }
    }
}

/// POST submit an uploaded file for analysis
#[utoipa::path(
    post,
    path = "/analyses",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 202, description = "Job accepted", body = SubmitResponse),
        (status = 422, description = "Malformed JSON, unsupported file type or missing file"),
        (status = 500, description = "Internal Server Error")
    )
)]
pub async fn submit(
    State(app_state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut primary = None;
    let mut secondary = None;
    let mut options = SubmitOptions::default();

    while let Some(field) = multipart.next_field().await.map_err(invalid_form)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == FORCE_REPROCESS_FIELD {
            let value = field.text().await.map_err(invalid_form)?;
            options.force_reprocess = matches!(value.trim(), "true" | "1" | "on");
            continue;
        }
        if name != FILE_FIELD && name != EMOTION_FILE_FIELD {
            debug!("Ignoring unexpected form field: {name}");
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(invalid_form)?;
        let artifact = Artifact::File {
            name: file_name,
            content_type,
            bytes: bytes.to_vec(),
        };
        if name == FILE_FIELD {
            primary = Some(artifact);
        } else {
            secondary = Some(artifact);
        }
    }

    let primary = primary.ok_or_else(|| {
        DomainError::input(
            InputErrorKind::MissingArtifact,
            format!("Missing form field: {FILE_FIELD}"),
        )
    })?;
    if let Artifact::File { name, .. } = &primary {
        debug!("POST submit upload: {name}");
    }

    let job = app_state
        .pipeline
        .submit_with(primary, secondary, options)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(SubmitResponse::from(job))))
}

/// POST submit pasted transcript text for analysis
#[utoipa::path(
    post,
    path = "/analyses/text",
    request_body = TextParams,
    responses(
        (status = 202, description = "Job accepted", body = SubmitResponse),
        (status = 422, description = "Empty transcript"),
        (status = 500, description = "Internal Server Error")
    )
)]
pub async fn submit_text(
    State(app_state): State<AppState>,
    Json(params): Json<TextParams>,
) -> Result<impl IntoResponse> {
    debug!("POST submit text ({} bytes)", params.text.len());

    let options = SubmitOptions {
        force_reprocess: params.force_reprocess,
    };
    let job = app_state
        .pipeline
        .submit_with(Artifact::Text(params.text), None, options)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(SubmitResponse::from(job))))
}

/// GET the status of an analysis job
#[utoipa::path(
    get,
    path = "/analyses/{job_id}/status",
    params(
        ("job_id" = Uuid, Path, description = "Job id returned on submission")
    ),
    responses(
        (status = 200, description = "Current job status", body = StatusView),
        (status = 404, description = "Job not found")
    )
)]
pub async fn status(
    State(app_state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse> {
    debug!("GET status of job: {job_id}");
    let job_id = parse_job_id(&job_id)?;

    let status = app_state.pipeline.facade().get_status(job_id).await?;
    Ok(Json(status))
}

/// GET the merged analysis of a completed job
#[utoipa::path(
    get,
    path = "/analyses/{job_id}/result",
    params(
        ("job_id" = Uuid, Path, description = "Job id returned on submission")
    ),
    responses(
        (status = 200, description = "Merged analysis record", body = AnalysisRecord),
        (status = 404, description = "Job not found"),
        (status = 409, description = "Job is still processing or has failed")
    )
)]
pub async fn result(
    State(app_state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse> {
    debug!("GET result of job: {job_id}");
    let job_id = parse_job_id(&job_id)?;

    let record = app_state.pipeline.facade().get_result(job_id).await?;
    Ok(Json(record))
}

/// GET the key recommendations of a completed job with their priorities
#[utoipa::path(
    get,
    path = "/analyses/{job_id}/recommendations",
    params(
        ("job_id" = Uuid, Path, description = "Job id returned on submission")
    ),
    responses(
        (status = 200, description = "Key recommendations, highest priority first", body = [PrioritizedRecommendation]),
        (status = 404, description = "Job not found"),
        (status = 409, description = "Job is still processing or has failed")
    )
)]
pub async fn recommendations(
    State(app_state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse> {
    debug!("GET recommendations of job: {job_id}");
    let job_id = parse_job_id(&job_id)?;

    let recommendations = app_state
        .pipeline
        .facade()
        .get_recommendations(job_id)
        .await?;
    Ok(Json(recommendations))
}

/// An id that is not a UUID cannot name any job.
fn parse_job_id(raw: &str) -> std::result::Result<JobId, DomainError> {
    raw.parse::<JobId>().map_err(|e| {
        debug!("Rejected job id {raw:?}: {e}");
        DomainError::job(JobErrorKind::NotFound, format!("Job {raw} not found"))
    })
}

fn invalid_form(err: axum::extract::multipart::MultipartError) -> DomainError {
    warn!("Rejected multipart body: {err}");
    DomainError::input(
        InputErrorKind::MissingArtifact,
        format!("Invalid multipart body: {}", err.body_text()),
    )
}
