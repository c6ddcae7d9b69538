//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GuardConfig (validated, immutable)
//!     → engines built from its sections
//!
//! contract_ranges
//!     → ranges.rs (height-indexed selector)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Private keys never live in the config file

pub mod loader;
pub mod ranges;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use ranges::{BlockRange, RangeError, RangeSelector};
pub use schema::GuardConfig;
pub use validation::{validate_config, ValidationError};
