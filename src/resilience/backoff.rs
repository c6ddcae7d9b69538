//! Linear backoff between attempts.

use std::time::Duration;

/// Delay to wait after the 0-indexed `attempt` failed: `(attempt + 1) * step`.
///
/// Applied between attempts only, never before the first one.
pub fn linear_backoff(attempt: u32, step: Duration) -> Duration {
    step.saturating_mul(attempt.saturating_add(1))
}
