//! Bounded exponential backoff for page requests.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::FetchError;

/// Errors that can tell whether another attempt might succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for FetchError {
    /// Only transport failures are retried; a bad status or body is final.
    fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Transport(_))
    }
}

/// Attempt budget and backoff bounds.
///
/// The wait after the n-th failed attempt is `multiplier * 2^(n-1)`,
/// clamped to `[min_backoff, max_backoff]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub min_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            min_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(60),
            multiplier: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Backoff after `failed_attempts` consecutive failures (1-based).
    pub fn backoff(&self, failed_attempts: u32) -> Duration {
        let exp = failed_attempts.saturating_sub(1).min(31);
        let raw = self.multiplier.saturating_mul(1u32 << exp);
        raw.clamp(self.min_backoff, self.max_backoff.max(self.min_backoff))
    }

    /// Run `op` until it succeeds, returns a non-retryable error, or the
    /// attempt budget is spent. The last error is returned.
    pub async fn run<T, E, F, Fut>(&self, what: &str, mut op: F) -> Result<T, E>
    where
        E: Retryable + std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = self.backoff(attempt);
                    warn!(
                        "{what}: attempt {attempt}/{max_attempts} failed ({e}), retrying in {}s",
                        delay.as_secs_f32()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
