//! Backoff schedule shared by the retry middleware and [`super::send_with_retry`].

use std::time::{Duration, SystemTime};

use reqwest_retry::{RetryDecision, RetryPolicy};

/// Doubling backoff for transient provider failures.
///
/// The n-th retry waits `base_delay * 2^n`, never more than `max_delay`. After
/// `max_retries` retries the last outcome is returned to the caller unchanged.
#[derive(Debug, Clone)]
pub struct ProviderBackoff {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl ProviderBackoff {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }

    pub fn with_delays(self, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay: max_delay.max(base_delay),
            ..self
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Wait before retry number `retry` (zero-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

impl RetryPolicy for ProviderBackoff {
    fn should_retry(&self, _request_start_time: SystemTime, n_past_retries: u32) -> RetryDecision {
        if n_past_retries >= self.max_retries {
            return RetryDecision::DoNotRetry;
        }
        RetryDecision::Retry {
            execute_after: SystemTime::now() + self.delay_for(n_past_retries),
        }
    }
}
