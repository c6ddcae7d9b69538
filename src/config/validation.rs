//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate endpoint URLs and addresses
//! - Validate value ranges (timeouts > 0, intervals > 0)
//! - Check contract ranges build a valid selector
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GuardConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use crate::config::schema::GuardConfig;

/// One failed check, naming the offending field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

fn check_url(field: &str, value: &str, errors: &mut Vec<ValidationError>) {
    if let Err(e) = url::Url::parse(value) {
        errors.push(ValidationError::new(
            field,
            format!("invalid URL '{}': {}", value, e),
        ));
    }
}

pub fn validate_config(config: &GuardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.endpoints.read.is_empty() {
        errors.push(ValidationError::new("endpoints.read", "at least one endpoint is required"));
    }
    for (i, url) in config.endpoints.read.iter().enumerate() {
        check_url(&format!("endpoints.read[{}]", i), url, &mut errors);
    }

    if config.endpoints.write.is_empty() {
        errors.push(ValidationError::new("endpoints.write", "endpoint is required"));
    } else {
        check_url("endpoints.write", &config.endpoints.write, &mut errors);
    }

    if config.endpoints.block_sources.is_empty() {
        errors.push(ValidationError::new(
            "endpoints.block_sources",
            "at least one source is required",
        ));
    }
    for (i, url) in config.endpoints.block_sources.iter().enumerate() {
        check_url(&format!("endpoints.block_sources[{}]", i), url, &mut errors);
    }

    if config.chain_id == 0 {
        errors.push(ValidationError::new("chain_id", "must be greater than 0"));
    }
    if config.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("rpc_timeout_secs", "must be greater than 0"));
    }
    if config.confirmation.timeout_secs == 0 {
        errors.push(ValidationError::new("confirmation.timeout_secs", "must be greater than 0"));
    }
    if config.confirmation.poll_interval_ms == 0 {
        errors.push(ValidationError::new(
            "confirmation.poll_interval_ms",
            "must be greater than 0",
        ));
    }

    if let Err(e) = config.contract_selector() {
        errors.push(e);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
