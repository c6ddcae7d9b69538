//! ABI subsystem.
//!
//! # Data Flow
//! ```text
//! JSON ABI
//!     → codec.rs (call data packing, return data unpacking)
//!     → registry.rs (selector → handler dispatch for block parsing,
//!                    topic → handler dispatch for receipt logs)
//!
//! Failed calls:
//!     → revert.rs (Error(string) reason extraction)
//! ```

pub mod codec;
pub mod registry;
pub mod revert;

pub use codec::{AbiCodec, Codec, CodecError, FromDynValue, ReturnValue};
pub use registry::{EventRegistry, SelectorRegistry};
pub use revert::{decode_revert, RevertError, REVERT_SELECTOR};
