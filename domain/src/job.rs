//! Jobs and the store that owns their lifecycle.
//!
//! A job starts `processing` and moves exactly once to `completed` or `failed`. The
//! status and its payload live in one enum, so a reader can never see a completed job
//! without its record or a failed job without its error.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::*;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::analysis::AnalysisRecord;
use crate::error::{DomainErrorKind, Error, ExternalErrorKind, InternalErrorKind, JobErrorKind};

pub type JobId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Completed,
    Failed,
}

/// Coarse category of a job failure, derived from the error that ended it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Input,
    Upstream,
    Timeout,
    Merge,
    Internal,
}

impl From<&DomainErrorKind> for FailureKind {
    fn from(kind: &DomainErrorKind) -> Self {
        match kind {
            DomainErrorKind::Internal(InternalErrorKind::Input(_)) => FailureKind::Input,
            DomainErrorKind::Internal(InternalErrorKind::Merge(_)) => FailureKind::Merge,
            DomainErrorKind::External(ExternalErrorKind::Timeout) => FailureKind::Timeout,
            DomainErrorKind::External(_) => FailureKind::Upstream,
            DomainErrorKind::Internal(_) => FailureKind::Internal,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    Processing,
    Completed(AnalysisRecord),
    Failed { error: String, kind: FailureKind },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: JobId,
    pub created_at: DateTime<Utc>,
    pub state: JobState,
    /// Non-fatal problems recorded while processing, in order.
    pub warnings: Vec<String>,
}

impl Job {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            state: JobState::Processing,
            warnings: Vec::new(),
        }
    }

    pub fn status(&self) -> JobStatus {
        match self.state {
            JobState::Processing => JobStatus::Processing,
            JobState::Completed(_) => JobStatus::Completed,
            JobState::Failed { .. } => JobStatus::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status() != JobStatus::Processing
    }

    pub fn result(&self) -> Option<&AnalysisRecord> {
        match &self.state {
            JobState::Completed(record) => Some(record),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            JobState::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match &self.state {
            JobState::Failed { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Storage for jobs. Implementations must apply every transition atomically.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Store a new `processing` job and return it.
    async fn create(&self) -> Result<Job, Error>;

    /// Move a `processing` job to `completed`. Fails with `AlreadyTerminal` otherwise.
    async fn complete(&self, id: JobId, record: AnalysisRecord) -> Result<Job, Error>;

    /// Move a `processing` job to `failed`. Fails with `AlreadyTerminal` otherwise.
    async fn fail(&self, id: JobId, error: String, kind: FailureKind) -> Result<Job, Error>;

    /// Append a warning to a `processing` job.
    async fn warn(&self, id: JobId, warning: String) -> Result<(), Error>;

    async fn get(&self, id: JobId) -> Result<Job, Error>;
}

pub const DEFAULT_MAX_RETAINED_JOBS: usize = 10_000;

#[derive(Debug, Default)]
struct Jobs {
    by_id: HashMap<JobId, Job>,
    /// Ids in creation order, oldest first.
    order: VecDeque<JobId>,
}

impl Jobs {
    /// Drop the oldest terminal jobs until at most `max` remain. Processing jobs are
    /// never dropped, so the store can exceed `max` while they run.
    fn evict_terminal(&mut self, max: usize) -> Vec<JobId> {
        let mut excess = self.by_id.len().saturating_sub(max);
        let mut evicted = Vec::new();
        let by_id = &mut self.by_id;
        self.order.retain(|id| {
            if excess == 0 || !by_id.get(id).is_some_and(Job::is_terminal) {
                return true;
            }
            by_id.remove(id);
            evicted.push(*id);
            excess -= 1;
            false
        });
        evicted
    }
}

/// Process-local job store.
///
/// Keeps at most `max_retained` jobs; once full, the oldest finished jobs are
/// forgotten and read as `NotFound`. Archived records in `results_dir` outlive them.
#[derive(Debug)]
pub struct InMemoryJobStore {
    jobs: RwLock<Jobs>,
    max_retained: usize,
}

impl Default for InMemoryJobStore {
    fn default() -> Self {
        Self::with_retention(DEFAULT_MAX_RETAINED_JOBS)
    }
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(max_retained: usize) -> Self {
        Self {
            jobs: RwLock::new(Jobs::default()),
            max_retained: max_retained.max(1),
        }
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.by_id.is_empty()
    }

    async fn transition(&self, id: JobId, state: JobState) -> Result<Job, Error> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.by_id.get_mut(&id).ok_or_else(|| not_found(id))?;
        if job.is_terminal() {
            warn!(
                "Rejected transition of job {} already {:?}",
                id,
                job.status()
            );
            return Err(Error::job(
                JobErrorKind::AlreadyTerminal,
                format!("Job {} is already {:?}", id, job.status()).to_lowercase(),
            ));
        }
        job.state = state;
        info!("Job {} -> {:?}", id, job.status());
        Ok(job.clone())
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self) -> Result<Job, Error> {
        let job = Job::new();
        let mut jobs = self.jobs.write().await;
        jobs.by_id.insert(job.id, job.clone());
        jobs.order.push_back(job.id);
        let evicted = jobs.evict_terminal(self.max_retained);
        drop(jobs);

        info!("Job {} created", job.id);
        if !evicted.is_empty() {
            debug!("Evicted {} finished job(s): {:?}", evicted.len(), evicted);
        }
        Ok(job)
    }

    async fn complete(&self, id: JobId, record: AnalysisRecord) -> Result<Job, Error> {
        self.transition(id, JobState::Completed(record)).await
    }

    async fn fail(&self, id: JobId, error: String, kind: FailureKind) -> Result<Job, Error> {
        self.transition(id, JobState::Failed { error, kind }).await
    }

    async fn warn(&self, id: JobId, warning: String) -> Result<(), Error> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.by_id.get_mut(&id).ok_or_else(|| not_found(id))?;
        if job.is_terminal() {
            return Err(Error::job(
                JobErrorKind::AlreadyTerminal,
                format!("Job {} is already {:?}", id, job.status()).to_lowercase(),
            ));
        }
        warn!("Job {}: {}", id, warning);
        job.warnings.push(warning);
        Ok(())
    }

    async fn get(&self, id: JobId) -> Result<Job, Error> {
        self.jobs
            .read()
            .await
            .by_id
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }
}

fn not_found(id: JobId) -> Error {
    Error::job(JobErrorKind::NotFound, format!("Job {} not found", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tests::sample_analysis;
    use std::sync::Arc;

    fn record() -> AnalysisRecord {
        serde_json::from_value(sample_analysis()).unwrap()
    }

    #[tokio::test]
    async fn test_new_job_is_processing_without_result() {
        let store = InMemoryJobStore::new();
        let job = store.create().await.unwrap();

        let fetched = store.get(job.id).await.unwrap();
        assert_eq!(fetched.status(), JobStatus::Processing);
        assert!(fetched.result().is_none());
        assert!(fetched.error().is_none());
    }

    #[tokio::test]
    async fn test_complete_then_fail_keeps_first_terminal_state() {
        let store = InMemoryJobStore::new();
        let job = store.create().await.unwrap();

        store.complete(job.id, record()).await.unwrap();
        let err = store
            .fail(job.id, "late".into(), FailureKind::Internal)
            .await
            .unwrap_err();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Job(JobErrorKind::AlreadyTerminal))
        );

        let fetched = store.get(job.id).await.unwrap();
        assert_eq!(fetched.status(), JobStatus::Completed);
        assert_eq!(fetched.result(), Some(&record()));
    }

    #[tokio::test]
    async fn test_fail_twice_signals_already_terminal() {
        let store = InMemoryJobStore::new();
        let job = store.create().await.unwrap();

        store
            .fail(job.id, "Timeout".into(), FailureKind::Timeout)
            .await
            .unwrap();
        assert!(store
            .fail(job.id, "again".into(), FailureKind::Upstream)
            .await
            .is_err());
        assert!(store.complete(job.id, record()).await.is_err());
        assert!(store.warn(job.id, "late warning".into()).await.is_err());

        let fetched = store.get(job.id).await.unwrap();
        assert_eq!(fetched.error(), Some("Timeout"));
        assert_eq!(fetched.failure_kind(), Some(FailureKind::Timeout));
        assert!(fetched.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_found() {
        let store = InMemoryJobStore::new();
        let err = store.get(Uuid::new_v4()).await.unwrap_err();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Job(JobErrorKind::NotFound))
        );
        assert!(store.complete(Uuid::new_v4(), record()).await.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_transitions_have_one_winner() {
        let store = Arc::new(InMemoryJobStore::new());
        let job = store.create().await.unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                if i % 2 == 0 {
                    store.complete(job.id, record()).await.is_ok()
                } else {
                    store
                        .fail(job.id, format!("failure {i}"), FailureKind::Upstream)
                        .await
                        .is_ok()
                }
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);

        let fetched = store.get(job.id).await.unwrap();
        match fetched.status() {
            JobStatus::Completed => assert!(fetched.result().is_some() && fetched.error().is_none()),
            JobStatus::Failed => assert!(fetched.result().is_none() && fetched.error().is_some()),
            JobStatus::Processing => panic!("job left processing"),
        }
    }

    #[tokio::test]
    async fn test_oldest_finished_jobs_are_evicted_past_retention() {
        let store = InMemoryJobStore::with_retention(2);
        let first = store.create().await.unwrap();
        let second = store.create().await.unwrap();
        store.complete(first.id, record()).await.unwrap();
        store
            .fail(second.id, "Timeout".into(), FailureKind::Timeout)
            .await
            .unwrap();

        let third = store.create().await.unwrap();

        assert_eq!(store.len().await, 2);
        let err = store.get(first.id).await.unwrap_err();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Job(JobErrorKind::NotFound))
        );
        assert!(store.get(second.id).await.is_ok());
        assert!(store.get(third.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_processing_jobs_are_never_evicted() {
        let store = InMemoryJobStore::with_retention(1);
        let first = store.create().await.unwrap();
        let second = store.create().await.unwrap();

        assert_eq!(store.len().await, 2);
        store.complete(first.id, record()).await.unwrap();
        store.complete(second.id, record()).await.unwrap();
        assert_eq!(store.get(first.id).await.unwrap().status(), JobStatus::Completed);

        store.create().await.unwrap();
        assert_eq!(store.len().await, 1);
        assert!(store.get(first.id).await.is_err());
        assert!(store.get(second.id).await.is_err());
    }

    #[tokio::test]
    async fn test_warnings_are_kept_in_order() {
        let store = InMemoryJobStore::new();
        let job = store.create().await.unwrap();
        store.warn(job.id, "first".into()).await.unwrap();
        store.warn(job.id, "second".into()).await.unwrap();

        let fetched = store.get(job.id).await.unwrap();
        assert_eq!(fetched.warnings, vec!["first", "second"]);
    }
}
