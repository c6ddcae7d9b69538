//! Chain-specific types and error definitions.

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, Bytes, Log, TxHash, B256, U256};
use alloy::consensus::TxEnvelope;
use thiserror::Error;

use crate::abi::codec::CodecError;
use crate::blockchain::rpc::RpcError;

// Re-export the config sections the engines are built from
pub use crate::config::schema::{ConfirmationConfig, RetryConfig, TransactionFormat};

/// Errors that can occur during blockchain operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// Method unknown to the interface description or bad arguments.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Malformed response data.
    #[error("Decoding error: {0}")]
    Decoding(String),

    /// Transport or node failure that survived every retry.
    #[error("Call to {operation} failed after {attempts} attempts: {source}")]
    Call {
        operation: String,
        attempts: u32,
        #[source]
        source: RpcError,
    },

    /// Single RPC request failed (not retried).
    #[error("RPC error during {operation}: {source}")]
    Rpc {
        operation: String,
        #[source]
        source: RpcError,
    },

    /// Fee below the network minimum. Consumed by fee escalation, never surfaced
    /// as the final outcome of a submission.
    #[error("Transaction underpriced at gas price {gas_price}")]
    Underpriced { gas_price: u128 },

    /// Non-underpriced broadcast failure; the transaction was never accepted.
    #[error("Broadcast failed: {0}")]
    Broadcast(String),

    /// No receipt before the confirmation deadline. The transaction may still land.
    #[error("Transaction {hash} not confirmed within {timeout_ms} ms")]
    TimedOut { hash: TxHash, timeout_ms: u64 },

    /// Transaction was mined but execution failed.
    #[error("Transaction {hash} reverted: {}", .reason.as_deref().unwrap_or("no reason given"))]
    Reverted { hash: TxHash, reason: Option<String> },

    /// Receipt lookup failed with something other than "not found".
    #[error("Receipt lookup for {hash} failed: {source}")]
    ReceiptLookup {
        hash: TxHash,
        #[source]
        source: RpcError,
    },

    /// Sources disagree on the block at a height.
    #[error(
        "Block inconsistency at source {source_index}: expected #{expected_number} {expected_hash} \
         ({expected_tx_count} txs), got #{actual_number} {actual_hash} ({actual_tx_count} txs)"
    )]
    BlockInconsistency {
        source_index: usize,
        expected_number: u64,
        actual_number: u64,
        expected_hash: B256,
        actual_hash: B256,
        expected_tx_count: usize,
        actual_tx_count: usize,
    },

    /// A source has no block at the requested height.
    #[error("Source {source_index} has no block at height {height}")]
    BlockNotFound { source_index: usize, height: u64 },

    /// A block source failed.
    #[error("Source {source_index} failed: {source}")]
    Source {
        source_index: usize,
        #[source]
        source: RpcError,
    },

    /// Sender could not be recovered from a transaction signature.
    #[error("Failed to recover sender of transaction at position {position}: {message}")]
    SenderRecovery { position: usize, message: String },

    /// Engine configured without any endpoint.
    #[error("At least one endpoint is required")]
    NoSources,

    /// Signing failed. Never retried.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Invalid private key format or derivation error.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// The submission nonce was used by another transaction.
    #[error("Nonce {nonce} already consumed (account nonce is now {current})")]
    NonceConsumed { nonce: u64, current: u64 },

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    /// Caller cancelled the local wait. A broadcast transaction stays pending.
    #[error("Operation cancelled{}", .hash.map(|h| format!(" (transaction {h} left pending)")).unwrap_or_default())]
    Cancelled { hash: Option<TxHash> },
}

impl From<CodecError> for BlockchainError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Decoding(msg) => BlockchainError::Decoding(msg),
            other => BlockchainError::Encoding(other.to_string()),
        }
    }
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// A contract call: target, method name, arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct CallRequest {
    pub to: Address,
    pub method: String,
    pub args: Vec<DynSolValue>,
}

impl CallRequest {
    pub fn new(to: Address, method: impl Into<String>, args: Vec<DynSolValue>) -> Self {
        Self {
            to,
            method: method.into(),
            args,
        }
    }
}

/// Transaction fields before signing.
///
/// Rebuilt, never edited, when the gas price changes so every attempt stays a
/// separate value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTx {
    pub chain_id: u64,
    pub nonce: u64,
    pub to: Address,
    pub value: U256,
    pub gas_limit: u64,
    pub gas_price: u128,
    pub input: Bytes,
    pub format: TransactionFormat,
}

impl UnsignedTx {
    /// Same transaction at a different gas price.
    pub fn repriced(&self, gas_price: u128) -> Self {
        Self {
            gas_price,
            ..self.clone()
        }
    }
}

/// A signed transaction ready for broadcast.
#[derive(Debug, Clone)]
pub struct SignedTx {
    pub unsigned: UnsignedTx,
    pub envelope: TxEnvelope,
    /// EIP-2718 encoding sent over the wire.
    pub raw: Bytes,
    pub hash: TxHash,
}

/// Terminal outcome of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub success: bool,
    pub block_number: Option<u64>,
    /// Logs emitted by the transaction, in emission order.
    pub logs: Vec<Log>,
}

/// Normalized block header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub number: u64,
    pub hash: B256,
    pub parent_hash: B256,
    /// Unix seconds.
    pub timestamp: u64,
    pub gas_limit: u64,
}

/// Block as returned by a source: header plus signed transactions in order.
#[derive(Debug, Clone)]
pub struct RawBlock {
    pub header: BlockHeader,
    pub transactions: Vec<TxEnvelope>,
}

/// A protocol transaction extracted from a block.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionView<T> {
    pub data: T,
    pub hash: TxHash,
    pub from: Address,
    /// `None` for contract creation.
    pub to: Option<Address>,
    /// Index in the source block.
    pub position: usize,
}

/// A protocol event decoded from a receipt log.
#[derive(Debug, Clone, PartialEq)]
pub struct EventView<T> {
    pub data: T,
    /// Contract that emitted the log.
    pub address: Address,
    /// Index in the receipt's log list.
    pub log_index: usize,
}

/// A verified block with its protocol transactions, in execution order.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockView<T> {
    pub header: BlockHeader,
    pub transactions: Vec<TransactionView<T>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repriced_keeps_everything_but_gas_price() {
        let tx = UnsignedTx {
            chain_id: 1,
            nonce: 7,
            to: Address::ZERO,
            value: U256::ZERO,
            gas_limit: 50_000,
            gas_price: 10,
            input: Bytes::from_static(&[1, 2, 3]),
            format: TransactionFormat::Legacy,
        };
        let bumped = tx.repriced(20);
        assert_eq!(bumped.gas_price, 20);
        assert_eq!(bumped.nonce, 7);
        assert_eq!(bumped.input, tx.input);
        assert_eq!(tx.gas_price, 10);
    }

    #[test]
    fn test_error_display() {
        let err = BlockchainError::TimedOut {
            hash: TxHash::ZERO,
            timeout_ms: 30_000,
        };
        assert!(err.to_string().contains("30000 ms"));

        let err = BlockchainError::Reverted {
            hash: TxHash::ZERO,
            reason: Some("insufficient balance".into()),
        };
        assert!(err.to_string().contains("insufficient balance"));

        let err = BlockchainError::Cancelled { hash: None };
        assert_eq!(err.to_string(), "Operation cancelled");
    }

    #[test]
    fn test_codec_error_mapping() {
        let err: BlockchainError = CodecError::Decoding("short".into()).into();
        assert!(matches!(err, BlockchainError::Decoding(_)));

        let err: BlockchainError = CodecError::UnknownMethod("nope".into()).into();
        assert!(matches!(err, BlockchainError::Encoding(_)));
    }
}
