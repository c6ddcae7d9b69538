//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::GuardConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<GuardConfig, ConfigError> {
    let config: GuardConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GuardConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config = parse_config(&content)?;

    tracing::info!(
        path = %path.display(),
        chain_id = config.chain_id,
        read_endpoints = config.endpoints.read.len(),
        block_sources = config.endpoints.block_sources.len(),
        "Configuration loaded"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{FanOut, TransactionFormat};

    const SAMPLE: &str = r#"
chain_id = 31337
rpc_timeout_secs = 5

[endpoints]
read = ["http://127.0.0.1:8545", "http://127.0.0.1:8546"]
write = "http://127.0.0.1:8545"
block_sources = ["http://127.0.0.1:8545", "http://127.0.0.1:8546"]

[retries]
retry_count = 5

[confirmation]
poll_interval_ms = 250

[transaction]
format = "dynamic_fee"

[fetcher]
fan_out = "concurrent"

[[contract_ranges]]
start_block = 2000
address = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
abi_version = "v1"
"#;

    #[test]
    fn test_parse_sample() {
        let config = parse_config(SAMPLE).unwrap();
        assert_eq!(config.chain_id, 31337);
        assert_eq!(config.retries.retry_count, 5);
        assert_eq!(config.retries.backoff_step_ms, 200);
        assert_eq!(config.confirmation.timeout_secs, 30);
        assert_eq!(config.confirmation.poll_interval_ms, 250);
        assert_eq!(config.transaction.format, TransactionFormat::DynamicFee);
        assert_eq!(config.fetcher.fan_out, FanOut::Concurrent);
        assert_eq!(config.contract_ranges.len(), 1);
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(parse_config("chain_id = ["), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validation_error() {
        let err = parse_config("chain_id = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 3));
        assert!(err.to_string().starts_with("Validation failed: endpoints.read"));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/rpc-guard.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
