//! Deadline helpers.
//!
//! Per-request RPC timeouts live in the client; these bound whole loops
//! (confirmation polling) by a wall-clock deadline.

use std::future::Future;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};

/// Time left before `deadline`, zero once it has passed.
pub fn remaining(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}

pub fn has_passed(deadline: Instant) -> bool {
    Instant::now() >= deadline
}

/// Run `fut` unless `deadline` arrives first.
pub async fn with_deadline<F: Future>(deadline: Instant, fut: F) -> Option<F::Output> {
    timeout_at(deadline, fut).await.ok()
}
