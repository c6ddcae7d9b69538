//! Transaction building, signing, broadcast and confirmation.
//!
//! # Responsibilities
//! - Build transactions with gas estimation (block gas limit as fallback)
//! - Sign and broadcast, doubling the gas price while the node says underpriced
//! - Poll for a receipt under a wall-clock deadline
//! - Recover the revert reason of a failed transaction by simulating it
//!
//! # Data Flow
//! ```text
//! CallRequest
//!     → build (pending nonce, call data, gas limit, gas price)
//!     → sign
//!     → broadcast ⟲ underpriced: nonce re-check, backoff, 2x gas price, re-sign
//!     → confirm ⟲ not mined: sleep poll interval until the deadline
//!     → Confirmed | Reverted | TimedOut | failure
//! ```
//!
//! The nonce is fixed for the whole submission; only the gas price changes
//! between broadcast attempts.

use alloy::primitives::{TxHash, U256};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::abi::codec::Codec;
use crate::abi::revert::decode_revert;
use crate::blockchain::rpc::{CallMessage, ChainRpc, RpcError};
use crate::blockchain::types::{
    BlockchainError, BlockchainResult, CallRequest, ConfirmationConfig, SignedTx,
    TransactionFormat, UnsignedTx,
};
use crate::blockchain::wallet::Wallet;
use crate::config::schema::GuardConfig;
use crate::lifecycle::cancel::CancelToken;
use crate::observability::metrics;
use crate::resilience::timeouts::{has_passed, remaining, with_deadline};
use crate::resilience::RetryPolicy;

/// Write engine bound to one endpoint.
pub struct TxSubmitter {
    rpc: Arc<dyn ChainRpc>,
    codec: Arc<dyn Codec>,
    policy: RetryPolicy,
    /// Overall confirmation deadline.
    confirm_timeout: Duration,
    poll_interval: Duration,
    format: TransactionFormat,
}

impl TxSubmitter {
    /// Create a submitter producing legacy transactions.
    pub fn new(
        rpc: Arc<dyn ChainRpc>,
        codec: Arc<dyn Codec>,
        policy: RetryPolicy,
        confirmation: &ConfirmationConfig,
    ) -> Self {
        Self {
            rpc,
            codec,
            policy,
            confirm_timeout: confirmation.timeout(),
            poll_interval: confirmation.poll_interval(),
            format: TransactionFormat::Legacy,
        }
    }

    pub fn from_config(rpc: Arc<dyn ChainRpc>, codec: Arc<dyn Codec>, config: &GuardConfig) -> Self {
        Self::new(
            rpc,
            codec,
            RetryPolicy::from(&config.retries),
            &config.confirmation,
        )
        .with_format(config.transaction.format)
    }

    pub fn with_format(mut self, format: TransactionFormat) -> Self {
        self.format = format;
        self
    }

    /// Override the confirmation deadline and poll interval.
    pub fn with_confirmation(mut self, timeout: Duration, poll_interval: Duration) -> Self {
        self.confirm_timeout = timeout;
        self.poll_interval = poll_interval;
        self
    }

    /// [`write`](Self::write) without external cancellation.
    pub async fn write_default(
        &self,
        request: &CallRequest,
        wallet: &Wallet,
    ) -> BlockchainResult<TxHash> {
        self.write(request, wallet, &CancelToken::never()).await
    }

    /// Submit a state-changing call and wait for its receipt.
    ///
    /// The error distinguishes a transaction that failed on chain
    /// ([`Reverted`](BlockchainError::Reverted)) from one whose fate is unknown
    /// ([`TimedOut`](BlockchainError::TimedOut), [`Cancelled`](BlockchainError::Cancelled)
    /// with a hash) and from one that was never accepted
    /// ([`Broadcast`](BlockchainError::Broadcast)).
    pub async fn write(
        &self,
        request: &CallRequest,
        wallet: &Wallet,
        cancel: &CancelToken,
    ) -> BlockchainResult<TxHash> {
        let submission_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "write",
            submission = %submission_id,
            method = %request.method,
            to = %request.to,
        );

        let result = self.submit(request, wallet, cancel).instrument(span).await;
        metrics::record_submission(outcome_label(&result));
        result
    }

    async fn submit(
        &self,
        request: &CallRequest,
        wallet: &Wallet,
        cancel: &CancelToken,
    ) -> BlockchainResult<TxHash> {
        let unsigned = self.build(request, wallet).await?;
        let signed = wallet.sign_transaction(&unsigned)?;
        let sent = self.broadcast(signed, wallet, cancel).await?;
        self.confirm(&sent, wallet, cancel).await
    }

    /// Assemble the unsigned transaction for `request`.
    pub async fn build(&self, request: &CallRequest, wallet: &Wallet) -> BlockchainResult<UnsignedTx> {
        let from = wallet.address();
        let input = self.codec.encode_call(&request.method, &request.args)?;

        let nonce = self
            .rpc
            .pending_nonce(from)
            .await
            .map_err(|source| rpc_error("eth_getTransactionCount", source))?;

        let estimate = CallMessage::new(request.to, input.clone()).with_from(from);
        let gas_limit = match self.rpc.estimate_gas(&estimate).await {
            Ok(gas) => gas,
            Err(e) => {
                let header = self
                    .rpc
                    .header_by_number(None)
                    .await
                    .map_err(|source| rpc_error("eth_getBlockByNumber", source))?
                    .ok_or_else(|| {
                        rpc_error("eth_getBlockByNumber", RpcError::new("latest block not found"))
                    })?;
                tracing::warn!(
                    error = %e,
                    fallback_gas_limit = header.gas_limit,
                    "Gas estimation failed, using block gas limit"
                );
                header.gas_limit
            }
        };

        let gas_price = self
            .rpc
            .gas_price()
            .await
            .map_err(|source| rpc_error("eth_gasPrice", source))?;

        tracing::debug!(nonce, gas_limit, gas_price, "Transaction built");

        Ok(UnsignedTx {
            chain_id: wallet.chain_id(),
            nonce,
            to: request.to,
            value: U256::ZERO,
            gas_limit,
            gas_price,
            input,
            format: self.format,
        })
    }

    async fn send(&self, signed: &SignedTx) -> BlockchainResult<()> {
        match self.rpc.send_raw_transaction(&signed.raw).await {
            Ok(node_hash) => {
                if node_hash != signed.hash {
                    tracing::warn!(
                        tx_hash = %signed.hash,
                        node_hash = %node_hash,
                        "Node reported a different transaction hash"
                    );
                }
                Ok(())
            }
            Err(e) if e.is_underpriced() => Err(BlockchainError::Underpriced {
                gas_price: signed.unsigned.gas_price,
            }),
            Err(e) => Err(BlockchainError::Broadcast(e.to_string())),
        }
    }

    /// Broadcast, escalating the fee while the node rejects it as underpriced.
    async fn broadcast(
        &self,
        mut signed: SignedTx,
        wallet: &Wallet,
        cancel: &CancelToken,
    ) -> BlockchainResult<SignedTx> {
        let attempts = self.policy.attempts();
        let mut attempt = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(BlockchainError::Cancelled { hash: None });
            }

            let nonce = signed.unsigned.nonce;
            let gas_price = signed.unsigned.gas_price;

            match self.send(&signed).await {
                Ok(()) => {
                    tracing::info!(
                        tx_hash = %signed.hash,
                        nonce,
                        gas_price,
                        attempt = attempt + 1,
                        "Transaction broadcast"
                    );
                    return Ok(signed);
                }
                Err(BlockchainError::Underpriced { gas_price }) if attempt + 1 >= attempts => {
                    tracing::warn!(gas_price, attempts, "Still underpriced, giving up");
                    return Err(BlockchainError::Broadcast(format!(
                        "transaction underpriced at gas price {} after {} attempts",
                        gas_price, attempts
                    )));
                }
                Err(BlockchainError::Underpriced { gas_price }) => {
                    let delay = self.policy.delay_after(attempt);
                    if !cancel.sleep(delay).await {
                        return Err(BlockchainError::Cancelled { hash: None });
                    }

                    let current = self
                        .rpc
                        .latest_nonce(wallet.address())
                        .await
                        .map_err(|source| rpc_error("eth_getTransactionCount", source))?;
                    if current > nonce {
                        tracing::warn!(nonce, current, "Nonce consumed before escalation");
                        return Err(BlockchainError::NonceConsumed { nonce, current });
                    }

                    let escalated = gas_price.saturating_mul(2);
                    tracing::warn!(
                        nonce,
                        gas_price,
                        escalated_gas_price = escalated,
                        attempt = attempt + 1,
                        "Transaction underpriced, escalating fee"
                    );
                    metrics::record_fee_escalation();

                    signed = wallet.sign_transaction(&signed.unsigned.repriced(escalated))?;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::warn!(nonce, gas_price, error = %e, "Broadcast rejected");
                    return Err(e);
                }
            }
        }
    }

    /// Poll for the receipt until it shows up or the deadline passes.
    async fn confirm(
        &self,
        signed: &SignedTx,
        wallet: &Wallet,
        cancel: &CancelToken,
    ) -> BlockchainResult<TxHash> {
        let hash = signed.hash;
        let timeout = self.confirm_timeout;
        let poll_interval = self.poll_interval;
        let deadline = Instant::now() + timeout;
        let timed_out = || BlockchainError::TimedOut {
            hash,
            timeout_ms: timeout.as_millis() as u64,
        };

        loop {
            if cancel.is_cancelled() {
                return Err(BlockchainError::Cancelled { hash: Some(hash) });
            }
            if has_passed(deadline) {
                tracing::warn!(tx_hash = %hash, "Confirmation deadline passed");
                return Err(timed_out());
            }

            let lookup = tokio::select! {
                lookup = with_deadline(deadline, self.rpc.receipt(hash)) => lookup,
                _ = cancel.cancelled() => return Err(BlockchainError::Cancelled { hash: Some(hash) }),
            };

            match lookup {
                None => {
                    tracing::warn!(tx_hash = %hash, "Confirmation deadline passed");
                    return Err(timed_out());
                }
                Some(Ok(Some(receipt))) if receipt.success => {
                    tracing::info!(
                        tx_hash = %hash,
                        block_number = ?receipt.block_number,
                        "Transaction confirmed"
                    );
                    return Ok(hash);
                }
                Some(Ok(Some(receipt))) => {
                    let reason = self.revert_reason(signed, wallet).await;
                    tracing::warn!(
                        tx_hash = %hash,
                        block_number = ?receipt.block_number,
                        reason = reason.as_deref().unwrap_or("unknown"),
                        "Transaction reverted"
                    );
                    return Err(BlockchainError::Reverted { hash, reason });
                }
                Some(Ok(None)) => {
                    tracing::debug!(tx_hash = %hash, "Transaction pending");
                }
                Some(Err(source)) => {
                    return Err(BlockchainError::ReceiptLookup { hash, source });
                }
            }

            if !cancel.sleep(poll_interval.min(remaining(deadline))).await {
                return Err(BlockchainError::Cancelled { hash: Some(hash) });
            }
        }
    }

    /// Re-run the failed transaction as a call to read its revert reason.
    async fn revert_reason(&self, signed: &SignedTx, wallet: &Wallet) -> Option<String> {
        let tx = &signed.unsigned;
        let simulation = CallMessage {
            from: Some(wallet.address()),
            to: tx.to,
            input: tx.input.clone(),
            gas: Some(tx.gas_limit),
            gas_price: Some(tx.gas_price),
        };

        let data = match self.rpc.call(&simulation).await {
            Ok(data) => data,
            Err(e) => match e.revert_data {
                Some(data) => data,
                None => {
                    tracing::debug!(error = %e.message, "Simulation failed without revert data");
                    return None;
                }
            },
        };

        match decode_revert(&data) {
            Ok(reason) => Some(reason),
            Err(e) => {
                tracing::debug!(error = %e, "No decodable revert reason");
                None
            }
        }
    }
}

fn rpc_error(operation: &str, source: RpcError) -> BlockchainError {
    BlockchainError::Rpc {
        operation: operation.to_string(),
        source,
    }
}

fn outcome_label(result: &BlockchainResult<TxHash>) -> &'static str {
    match result {
        Ok(_) => "confirmed",
        Err(BlockchainError::Reverted { .. }) => "reverted",
        Err(BlockchainError::TimedOut { .. }) => "timed_out",
        Err(BlockchainError::Broadcast(_)) => "broadcast_failed",
        Err(BlockchainError::Cancelled { .. }) => "cancelled",
        Err(_) => "failed",
    }
}

impl std::fmt::Debug for TxSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxSubmitter")
            .field("policy", &self.policy)
            .field("confirm_timeout", &self.confirm_timeout)
            .field("poll_interval", &self.poll_interval)
            .field("format", &self.format)
            .finish()
    }
}
