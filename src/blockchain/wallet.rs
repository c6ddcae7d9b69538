//! Wallet management and transaction signing.
//!
//! # Security
//! - Private keys come from an explicit string or an environment variable
//! - Keys are never logged or serialized
//! - Signing is local; nothing here touches the network

use alloy::consensus::{SignableTransaction, TxEip1559, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::primitives::{Address, TxKind};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;

use crate::blockchain::types::{
    BlockchainError, BlockchainResult, SignedTx, TransactionFormat, UnsignedTx,
};

/// Environment variable name for the private key.
pub const PRIVATE_KEY_ENV_VAR: &str = "RPC_GUARD_PRIVATE_KEY";

/// Signing key bound to a chain.
#[derive(Debug, Clone)]
pub struct Wallet {
    /// The underlying signer (private key).
    signer: PrivateKeySigner,
    /// Chain ID for EIP-155 replay protection.
    chain_id: u64,
}

impl Wallet {
    /// Create a wallet from a hex-encoded private key string.
    ///
    /// # Arguments
    /// * `private_key_hex` - Hex string (with or without 0x prefix)
    /// * `chain_id` - Chain ID for transaction signing
    pub fn from_private_key(private_key_hex: &str, chain_id: u64) -> BlockchainResult<Self> {
        let key_hex = private_key_hex.strip_prefix("0x").unwrap_or(private_key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| BlockchainError::Wallet(format!("Invalid private key format: {}", e)))?;

        tracing::info!(
            address = %signer.address(),
            chain_id = chain_id,
            "Wallet initialized"
        );

        Ok(Self { signer, chain_id })
    }

    /// Load wallet from environment variable.
    ///
    /// Reads `RPC_GUARD_PRIVATE_KEY` from environment.
    pub fn from_env(chain_id: u64) -> BlockchainResult<Self> {
        let private_key = std::env::var(PRIVATE_KEY_ENV_VAR).map_err(|_| {
            BlockchainError::Wallet(format!(
                "Environment variable {} not set",
                PRIVATE_KEY_ENV_VAR
            ))
        })?;

        Self::from_private_key(&private_key, chain_id)
    }

    /// Get the wallet's address.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Get the chain ID this wallet is configured for.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Sign `tx` in its configured envelope format.
    pub fn sign_transaction(&self, tx: &UnsignedTx) -> BlockchainResult<SignedTx> {
        if tx.chain_id != self.chain_id {
            return Err(BlockchainError::Signing(format!(
                "transaction for chain {} cannot be signed by a wallet for chain {}",
                tx.chain_id, self.chain_id
            )));
        }

        let envelope: TxEnvelope = match tx.format {
            TransactionFormat::Legacy => {
                let legacy = TxLegacy {
                    chain_id: Some(tx.chain_id),
                    nonce: tx.nonce,
                    gas_price: tx.gas_price,
                    gas_limit: tx.gas_limit,
                    to: TxKind::Call(tx.to),
                    value: tx.value,
                    input: tx.input.clone(),
                };
                let signature = self
                    .signer
                    .sign_hash_sync(&legacy.signature_hash())
                    .map_err(|e| BlockchainError::Signing(e.to_string()))?;
                legacy.into_signed(signature).into()
            }
            TransactionFormat::DynamicFee => {
                let dynamic = TxEip1559 {
                    chain_id: tx.chain_id,
                    nonce: tx.nonce,
                    gas_limit: tx.gas_limit,
                    max_fee_per_gas: tx.gas_price,
                    max_priority_fee_per_gas: tx.gas_price,
                    to: TxKind::Call(tx.to),
                    value: tx.value,
                    access_list: Default::default(),
                    input: tx.input.clone(),
                };
                let signature = self
                    .signer
                    .sign_hash_sync(&dynamic.signature_hash())
                    .map_err(|e| BlockchainError::Signing(e.to_string()))?;
                dynamic.into_signed(signature).into()
            }
        };

        Ok(SignedTx {
            unsigned: tx.clone(),
            raw: envelope.encoded_2718().into(),
            hash: *envelope.tx_hash(),
            envelope,
        })
    }
}
