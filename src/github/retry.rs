//! Backoff for transient GitHub failures.
//!
//! Every effect the octocrab interpreter executes goes through
//! [`retry_with_backoff`]. Server errors, rate limits and network failures
//! of idempotent effects are retried with doubling delays. Everything else,
//! in particular a `NotFound` for a deleted workflow run or any failed
//! dispatch, is returned on the first attempt.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use super::error::GitHubApiError;

/// How long to keep trying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_delay: Duration,
    /// The doubling stops here.
    pub max_delay: Duration,
}

impl RetryConfig {
    /// 3 retries after 2s, 4s and 8s.
    pub const DEFAULT: Self = Self {
        max_retries: 3,
        initial_delay: Duration::from_secs(2),
        max_delay: Duration::from_secs(8),
    };

    pub const fn new(max_retries: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay,
        }
    }

    /// The delay before retry number `retry` (0-indexed).
    pub fn delay_before(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.max_retries).map(|retry| self.delay_before(retry))
    }

    pub fn total_max_wait(&self) -> Duration {
        self.delays().sum()
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Whether transient failures are retried at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetryPolicy {
    #[default]
    RetryTransient,
    NoRetry,
}

/// Runs `operation` until it succeeds, fails permanently, or the retries
/// run out. `what` names the operation in logs.
pub async fn retry_with_backoff<T, F, Fut>(
    config: RetryConfig,
    policy: RetryPolicy,
    what: &str,
    mut operation: F,
) -> Result<T, GitHubApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GitHubApiError>>,
{
    let retries = match policy {
        RetryPolicy::RetryTransient => config.max_retries,
        RetryPolicy::NoRetry => 0,
    };

    let mut retry = 0;
    loop {
        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.kind.is_retriable() => return Err(e),
            Err(e) => e,
        };

        if retry >= retries {
            if retries > 0 {
                warn!(operation = what, attempts = retry + 1, error = %error, "giving up on GitHub");
            }
            return Err(error);
        }

        let delay = config.delay_before(retry);
        debug!(operation = what, retry, ?delay, error = %error, "transient GitHub error, retrying");
        tokio::time::sleep(delay).await;
        retry += 1;
    }
}
