//! RPC reliability layer for EVM chains.
//!
//! # Architecture Overview
//!
//! ```text
//!   caller
//!     │
//!     ├── read ──────▶ ContractReader ──▶ RoundRobin ──▶ ChainRpc (endpoint i)
//!     │                  │ retry + linear backoff
//!     │                  └─ Codec (encode / decode)
//!     │
//!     ├── write ─────▶ TxSubmitter ─────▶ ChainRpc (write endpoint)
//!     │                  │ build → sign → broadcast ⟲ fee escalation
//!     │                  │ confirm ⟲ poll until deadline
//!     │                  └─ Wallet (signing), revert decoder
//!     │
//!     └── fetch ─────▶ BlockFetcher ────▶ ChainRpc (source 0..n)
//!                        │ agreement check (hash, tx count)
//!                        └─ ProtocolParser (format check, parse)
//! ```
//!
//! Cross-cutting: `config` (TOML schema, validation, height ranges),
//! `resilience` (retry, backoff, deadlines), `lifecycle` (cancellation),
//! `observability` (tracing subscriber, metrics).

pub mod abi;
pub mod blockchain;
pub mod config;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod resilience;

pub use blockchain::{
    AlloyRpc, BlockFetcher, BlockchainError, BlockchainResult, ChainRpc, ContractReader,
    TxSubmitter, Wallet,
};
pub use config::schema::GuardConfig;
pub use lifecycle::{CancelToken, Cancellation};
