//! Metrics collection.
//!
//! # Metrics
//! - `rpc_guard_rpc_retries_total` (counter): retried attempts by operation
//! - `rpc_guard_fee_escalations_total` (counter): gas price doublings
//! - `rpc_guard_submissions_total` (counter): write outcomes by `outcome`
//! - `rpc_guard_block_inconsistencies_total` (counter): divergent sources
//! - `rpc_guard_endpoint_health` (gauge): 1=healthy, 0=unhealthy
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; without an installed recorder
//!   every call is a no-op
//! - No exporter is bundled, the embedding application picks one

pub fn record_retry(operation: &str) {
    ::metrics::counter!("rpc_guard_rpc_retries_total", "operation" => operation.to_string())
        .increment(1);
}

pub fn record_fee_escalation() {
    ::metrics::counter!("rpc_guard_fee_escalations_total").increment(1);
}

/// Terminal outcome of one write, e.g. `confirmed`, `reverted`, `timed_out`.
pub fn record_submission(outcome: &'static str) {
    ::metrics::counter!("rpc_guard_submissions_total", "outcome" => outcome).increment(1);
}

pub fn record_block_inconsistency(source_index: usize) {
    ::metrics::counter!(
        "rpc_guard_block_inconsistencies_total",
        "source" => source_index.to_string()
    )
    .increment(1);
}

pub fn record_endpoint_health(endpoint: &str, healthy: bool) {
    ::metrics::gauge!("rpc_guard_endpoint_health", "endpoint" => endpoint.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}
