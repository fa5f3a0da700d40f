//! Retry logic with exponential backoff and jitter.

use crate::constants::{
    PROXY_BASE_DELAY_MS, PROXY_JITTER_MS, PROXY_MAX_ATTEMPTS, PROXY_MAX_DELAY_MS,
};
use crate::diagnostics::{DiagnosticEvent, Diagnostics};
use crate::errors::Result;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Stateless retry policy, reused across calls.
///
/// The delay before attempt `n + 1` is `base_delay * 2^(n-1)`, capped at
/// `max_delay`, plus a uniform random jitter up to `jitter`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first
    pub max_attempts: u32,
    /// Base delay for exponential backoff
    pub base_delay: Duration,
    /// Maximum backoff delay before jitter
    pub max_delay: Duration,
    /// Upper bound of the random jitter added to each delay
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: PROXY_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(PROXY_BASE_DELAY_MS),
            max_delay: Duration::from_millis(PROXY_MAX_DELAY_MS),
            jitter: Duration::from_millis(PROXY_JITTER_MS),
        }
    }
}

impl RetryPolicy {
    /// Calculate the delay preceding the given retry (1-based attempt index
    /// of the attempt that just failed).
    #[must_use]
    pub fn delay_for(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1).min(16);
        let exponential = self.base_delay.saturating_mul(2u32.pow(exponent));
        let capped = exponential.min(self.max_delay);
        let jitter_ms = if self.jitter.is_zero() {
            0
        } else {
            fastrand::u64(0..=self.jitter.as_millis() as u64)
        };
        capped + Duration::from_millis(jitter_ms)
    }
}

/// Execute an operation with retry on transient failures.
///
/// Retries only errors whose [`Error::is_retryable`](crate::Error::is_retryable)
/// returns true; everything else propagates immediately. Each retry is
/// announced on the diagnostics channel.
pub async fn retry<F, Fut, T>(
    policy: &RetryPolicy,
    diagnostics: &Diagnostics,
    operation_name: &str,
    operation: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1u32;
    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(operation = operation_name, attempt, "succeeded after retry");
                }
                return Ok(result);
            }
            Err(error) => {
                if attempt >= policy.max_attempts || !error.is_retryable() {
                    return Err(error);
                }
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "retrying after transient failure"
                );
                diagnostics.emit(DiagnosticEvent::FetchRetried {
                    operation: operation_name.to_string(),
                    attempt,
                    delay_ms: delay.as_millis() as u64,
                });
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
