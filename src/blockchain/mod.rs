//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Environment Variables (private key)
//!     → wallet.rs (key loading, signing)
//! Endpoint URLs
//!     → client.rs (alloy provider behind the rpc.rs port, with timeouts)
//!     → reader.rs (retried contract reads)
//!     → transaction.rs (build, sign, broadcast, confirm)
//!     → fetcher.rs (multi-source block fetch and protocol filtering)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables or explicit strings
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts

pub mod client;
pub mod fetcher;
pub mod reader;
pub mod rpc;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use client::AlloyRpc;
pub use fetcher::{BlockFetcher, ParseError, ProtocolParser};
pub use reader::ContractReader;
pub use rpc::{CallMessage, ChainRpc, RpcError, RpcResult};
pub use transaction::TxSubmitter;
pub use types::{
    BlockHeader, BlockView, BlockchainError, EventView, BlockchainResult, CallRequest, RawBlock,
    Receipt, SignedTx, TransactionView, UnsignedTx,
};
pub use wallet::Wallet;
