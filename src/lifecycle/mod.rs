//! Operation lifecycle.
//!
//! The engines run no background tasks. The only lifecycle concern is letting
//! a caller abort a long wait (broadcast retries, confirmation polling) without
//! retracting anything already sent to the network.

pub mod cancel;

pub use cancel::{CancelToken, Cancellation};
