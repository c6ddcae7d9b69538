//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Engines produce:
//!     → tracing events and spans (submission id, tx hash, attempt, source index)
//!     → metrics.rs (counters and gauges through the `metrics` facade)
//!
//! Consumers:
//!     → logging.rs installs the subscriber (pretty or JSON)
//!     → any `metrics` recorder the application installs
//! ```

pub mod logging;
pub mod metrics;
