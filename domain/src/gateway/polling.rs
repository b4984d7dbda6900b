//! Bounded polling of provider-side asynchronous jobs.

use analysis_ai::types::job::{PollState, ProviderJobHandle};
use analysis_ai::Error as AnalysisError;
use log::*;
use service::config::Config;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollSettings {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.poll_interval(), config.poll_max_attempts)
    }
}

/// Call `poll` until it reports a terminal state, sleeping `interval` between calls.
///
/// The first poll happens immediately. A `Failed` state becomes `JobFailed`; running
/// out of attempts becomes `Timeout`. A transient poll error uses up one attempt;
/// any other poll error is returned at once.
pub async fn poll_until_terminal<F, Fut>(
    provider: &str,
    handle: &ProviderJobHandle,
    settings: &PollSettings,
    mut poll: F,
) -> Result<(), AnalysisError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<PollState, AnalysisError>>,
{
    for attempt in 1..=settings.max_attempts {
        let state = match poll().await {
            Ok(state) => state,
            Err(e) if e.is_transient() && attempt < settings.max_attempts => {
                warn!(
                    "{} job {} poll failed, retrying (attempt {}/{}): {}",
                    provider, handle.external_job_id, attempt, settings.max_attempts, e
                );
                tokio::time::sleep(settings.interval).await;
                continue;
            }
            Err(e) => return Err(e),
        };
        match state {
            PollState::Completed => {
                debug!(
                    "{} job {} completed after {} poll(s), {}s",
                    provider,
                    handle.external_job_id,
                    attempt,
                    handle.elapsed_secs()
                );
                return Ok(());
            }
            PollState::Failed(reason) => {
                warn!(
                    "{} job {} failed: {}",
                    provider, handle.external_job_id, reason
                );
                return Err(AnalysisError::JobFailed(reason));
            }
            PollState::Pending => {
                trace!(
                    "{} job {} pending (attempt {}/{})",
                    provider,
                    handle.external_job_id,
                    attempt,
                    settings.max_attempts
                );
                if attempt < settings.max_attempts {
                    tokio::time::sleep(settings.interval).await;
                }
            }
        }
    }

    warn!(
        "{} job {} still pending after {} polls",
        provider, handle.external_job_id, settings.max_attempts
    );
    Err(AnalysisError::Timeout(format!(
        "{} job did not finish after {} polls",
        provider, settings.max_attempts
    )))
}
