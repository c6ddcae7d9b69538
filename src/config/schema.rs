//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the guard.
//! All types derive Serde traits for deserialization from config files.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ranges::{BlockRange, RangeSelector};
use crate::config::validation::ValidationError;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Chain ID (e.g., 1 for Ethereum mainnet, 31337 for local Anvil).
    pub chain_id: u64,

    /// Per-request RPC timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// RPC endpoints per engine.
    pub endpoints: EndpointsConfig,

    /// Retry configuration.
    pub retries: RetryConfig,

    /// Confirmation polling settings.
    pub confirmation: ConfirmationConfig,

    /// Transaction building settings.
    pub transaction: TransactionConfig,

    /// Multi-source block fetcher settings.
    pub fetcher: FetcherConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Contract deployments by activation height.
    pub contract_ranges: Vec<ContractRange>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            rpc_timeout_secs: 10,
            endpoints: EndpointsConfig::default(),
            retries: RetryConfig::default(),
            confirmation: ConfirmationConfig::default(),
            transaction: TransactionConfig::default(),
            fetcher: FetcherConfig::default(),
            observability: ObservabilityConfig::default(),
            contract_ranges: Vec::new(),
        }
    }
}

impl GuardConfig {
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    /// Build the height-indexed contract selector from `contract_ranges`.
    pub fn contract_selector(&self) -> Result<RangeSelector<ContractDeployment>, ValidationError> {
        let ranges = self
            .contract_ranges
            .iter()
            .enumerate()
            .map(|(i, range)| {
                let address = range.address.parse::<Address>().map_err(|e| {
                    ValidationError::new(
                        format!("contract_ranges[{}].address", i),
                        format!("invalid address '{}': {}", range.address, e),
                    )
                })?;
                Ok(BlockRange::new(
                    range.start_block,
                    ContractDeployment {
                        address,
                        abi_version: range.abi_version.clone(),
                    },
                ))
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;

        RangeSelector::new(ranges)
            .map_err(|e| ValidationError::new("contract_ranges", e.to_string()))
    }
}

/// Endpoint URLs.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EndpointsConfig {
    /// Equivalent endpoints used round-robin for reads.
    pub read: Vec<String>,

    /// Endpoint used for the whole write path.
    pub write: String,

    /// Independent sources compared by the block fetcher.
    /// The first one is the primary (height and header queries).
    pub block_sources: Vec<String>,
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    /// Extra attempts after the first one.
    pub retry_count: u32,

    /// Linear backoff step in milliseconds; attempt i waits (i + 1) * step.
    pub backoff_step_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retry_count: 3,
            backoff_step_ms: 200,
        }
    }
}

/// Confirmation polling configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConfirmationConfig {
    /// Overall wall-clock deadline in seconds.
    pub timeout_secs: u64,

    /// Receipt poll interval in milliseconds.
    pub poll_interval_ms: u64,
}

impl ConfirmationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            poll_interval_ms: 1000,
        }
    }
}

/// Transaction envelope to sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionFormat {
    /// EIP-155 legacy transaction.
    #[default]
    Legacy,
    /// EIP-1559 transaction; the gas price is used as both fee caps.
    DynamicFee,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TransactionConfig {
    pub format: TransactionFormat,
}

/// How the block fetcher queries its sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FanOut {
    /// One source at a time, in configured order.
    #[default]
    Sequential,
    /// All sources at once; results still checked in configured order.
    Concurrent,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FetcherConfig {
    pub fan_out: FanOut,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level or filter directive (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of pretty output.
    pub json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}

/// A contract deployment active from `start_block`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContractRange {
    pub start_block: u64,

    /// Contract address (0x-prefixed hex).
    pub address: String,

    /// ABI version label used to pick a codec.
    #[serde(default)]
    pub abi_version: String,
}

/// Parsed [`ContractRange`] value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractDeployment {
    pub address: Address,
    pub abi_version: String,
}
