//! Bounded retry with linear backoff.
//!
//! # Responsibilities
//! - Run an idempotent operation up to `retry_count + 1` times
//! - Sleep `(i + 1) * step` after failed attempt `i`, never after the last one
//! - Stop early when the caller cancels
//!
//! Only transport failures belong in here. Encoding and decoding errors are
//! deterministic and must be raised before or after the retried operation.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::config::schema::RetryConfig;
use crate::lifecycle::cancel::CancelToken;
use crate::observability::metrics;
use crate::resilience::backoff::linear_backoff;

/// Retry budget and backoff step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub retry_count: u32,
    pub backoff_step: Duration,
}

impl RetryPolicy {
    pub fn new(retry_count: u32, backoff_step: Duration) -> Self {
        Self {
            retry_count,
            backoff_step,
        }
    }

    /// Total attempts, first one included.
    pub fn attempts(&self) -> u32 {
        self.retry_count.saturating_add(1)
    }

    pub fn delay_after(&self, attempt: u32) -> Duration {
        linear_backoff(attempt, self.backoff_step)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(
            config.retry_count,
            Duration::from_millis(config.backoff_step_ms),
        )
    }
}

/// Why a retried operation gave up.
#[derive(Debug)]
pub enum RetryError<E> {
    /// Every attempt failed; carries the last error.
    Exhausted { attempts: u32, last: E },
    Cancelled,
}

/// Run `op` under `policy`. `op` receives the 0-indexed attempt number.
pub async fn retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    cancel: &CancelToken,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = policy.attempts();
    let mut attempt = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(RetryError::Cancelled);
        }

        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt + 1 >= attempts => {
                tracing::warn!(operation, attempts, error = %e, "All attempts failed");
                return Err(RetryError::Exhausted { attempts, last: e });
            }
            Err(e) => {
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    operation,
                    attempt = attempt + 1,
                    max_attempts = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Attempt failed, retrying"
                );
                metrics::record_retry(operation);

                if !cancel.sleep(delay).await {
                    return Err(RetryError::Cancelled);
                }
                attempt += 1;
            }
        }
    }
}
