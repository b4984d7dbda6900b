//! Handles for provider-side asynchronous jobs.

use chrono::{DateTime, Utc};

/// An external job submitted to a polling-based provider.
///
/// Owned by the adapter that submitted it and dropped once the adapter returns a
/// terminal result; the external id never leaves the adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderJobHandle {
    pub external_job_id: String,
    pub submitted_at: DateTime<Utc>,
}

impl ProviderJobHandle {
    pub fn new(external_job_id: impl Into<String>) -> Self {
        Self {
            external_job_id: external_job_id.into(),
            submitted_at: Utc::now(),
        }
    }

    /// Seconds since the job was submitted.
    pub fn elapsed_secs(&self) -> i64 {
        (Utc::now() - self.submitted_at).num_seconds()
    }
}

/// Coarse state of an external job as reported by a poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    Pending,
    Completed,
    Failed(String),
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollState::Pending)
    }
}
