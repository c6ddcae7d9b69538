//! The RPC port every engine talks through.
//!
//! Engines never touch a provider directly; they depend on [`ChainRpc`] so the
//! same retry and confirmation logic runs against alloy in production and
//! against scripted nodes in tests.

use alloy::primitives::{Address, Bytes, TxHash};
use async_trait::async_trait;
use thiserror::Error;

use crate::blockchain::types::{BlockHeader, RawBlock, Receipt};

/// Failure reported by a node or the transport in front of it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct RpcError {
    pub message: String,
    /// Revert payload attached to an `eth_call` error, if the node sent one.
    pub revert_data: Option<Bytes>,
}

impl RpcError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            revert_data: None,
        }
    }

    pub fn with_revert_data(mut self, data: Bytes) -> Self {
        self.revert_data = Some(data);
        self
    }

    /// Node rejected the transaction because its fee is below the current minimum.
    pub fn is_underpriced(&self) -> bool {
        self.message.to_ascii_lowercase().contains("underpriced")
    }
}

pub type RpcResult<T> = Result<T, RpcError>;

/// Parameters of a read-only call or gas estimate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallMessage {
    pub from: Option<Address>,
    pub to: Address,
    pub input: Bytes,
    pub gas: Option<u64>,
    pub gas_price: Option<u128>,
}

impl CallMessage {
    pub fn new(to: Address, input: Bytes) -> Self {
        Self {
            to,
            input,
            ..Default::default()
        }
    }

    pub fn with_from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }
}

/// Chain RPC operations consumed by the engines.
///
/// Implementations must be safe to share between concurrent callers.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    async fn chain_id(&self) -> RpcResult<u64>;

    async fn call(&self, call: &CallMessage) -> RpcResult<Bytes>;

    async fn estimate_gas(&self, call: &CallMessage) -> RpcResult<u64>;

    /// Suggested legacy gas price in wei.
    async fn gas_price(&self) -> RpcResult<u128>;

    /// Next nonce including pending pool transactions.
    async fn pending_nonce(&self, address: Address) -> RpcResult<u64>;

    /// Next nonce counting only mined transactions.
    async fn latest_nonce(&self, address: Address) -> RpcResult<u64>;

    async fn send_raw_transaction(&self, raw: &[u8]) -> RpcResult<TxHash>;

    /// `Ok(None)` means not mined yet, which is not an error.
    async fn receipt(&self, hash: TxHash) -> RpcResult<Option<Receipt>>;

    /// Block with full transactions.
    async fn block_by_number(&self, number: u64) -> RpcResult<Option<RawBlock>>;

    /// Header at a height, or the latest header for `None`.
    async fn header_by_number(&self, number: Option<u64>) -> RpcResult<Option<BlockHeader>>;

    async fn block_number(&self) -> RpcResult<u64>;
}
