//! Read-only access to job status and results.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::analysis::{AnalysisRecord, PrioritizedRecommendation};
use crate::error::{Error, JobErrorKind};
use crate::job::{FailureKind, Job, JobId, JobStatus, JobStore};

/// Status of a job as reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StatusView {
    #[schema(value_type = Uuid)]
    pub job_id: JobId,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub error: Option<String>,
    pub error_kind: Option<FailureKind>,
    pub warnings: Vec<String>,
}

impl From<Job> for StatusView {
    fn from(job: Job) -> Self {
        Self {
            job_id: job.id,
            status: job.status(),
            created_at: job.created_at,
            error: job.error().map(str::to_string),
            error_kind: job.failure_kind(),
            warnings: job.warnings,
        }
    }
}

#[derive(Clone)]
pub struct ResultFacade {
    store: Arc<dyn JobStore>,
}

impl ResultFacade {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    pub async fn get_status(&self, id: JobId) -> Result<StatusView, Error> {
        Ok(self.store.get(id).await?.into())
    }

    /// The merged record of a completed job. Any other status is `NotReady`.
    pub async fn get_result(&self, id: JobId) -> Result<AnalysisRecord, Error> {
        let job = self.store.get(id).await?;
        match job.status() {
            JobStatus::Completed => job
                .result()
                .cloned()
                .ok_or_else(|| Error::job(JobErrorKind::NotReady, "Result is not available")),
            JobStatus::Processing => Err(Error::job(
                JobErrorKind::NotReady,
                format!("Job {} is still processing", id),
            )),
            JobStatus::Failed => Err(Error::job(
                JobErrorKind::NotReady,
                format!(
                    "Job {} failed: {}",
                    id,
                    job.error().unwrap_or("unknown error")
                ),
            )),
        }
    }

    /// Key recommendations of a completed job, each with its derived priority.
    pub async fn get_recommendations(
        &self,
        id: JobId,
    ) -> Result<Vec<PrioritizedRecommendation>, Error> {
        Ok(self.get_result(id).await?.prioritized_recommendations())
    }
}
