//! Endpoint selection for reads.
//!
//! Reads are idempotent, so any equivalent endpoint can serve any attempt.
//! Selection is a lock-free counter shared by every caller of one reader.

pub mod round_robin;

pub use round_robin::RoundRobin;
