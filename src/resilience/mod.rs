//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Engine call:
//!     → retries.rs (bounded attempts, linear backoff between them)
//!     → backoff.rs ((i + 1) * step after attempt i)
//!     → timeouts.rs (wall-clock deadline for polling loops)
//! ```
//!
//! # Design Decisions
//! - Retries only wrap idempotent reads and node transport failures
//! - Deadlines are checked before each request, never after
//! - Every wait is cancellable through the caller's token

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use retries::{retry, RetryError, RetryPolicy};
