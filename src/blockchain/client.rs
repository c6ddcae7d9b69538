//! Alloy-backed RPC client with per-request timeouts.
//!
//! # Responsibilities
//! - Connect to a JSON-RPC endpoint
//! - Translate [`ChainRpc`] calls into provider requests
//! - Bound every request with the configured timeout
//! - Keep node error payloads (revert data) intact for the engines

use alloy::eips::BlockNumberOrTag;
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::{Block, BlockTransactions, TransactionRequest};
use alloy::transports::TransportError;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::blockchain::rpc::{CallMessage, ChainRpc, RpcError, RpcResult};
use crate::blockchain::types::{BlockHeader, BlockchainError, BlockchainResult, RawBlock, Receipt};
use crate::observability::metrics;

/// Single-endpoint RPC client.
#[derive(Clone)]
pub struct AlloyRpc {
    provider: Arc<dyn Provider + Send + Sync>,
    rpc_url: String,
    /// Request timeout duration.
    timeout_duration: Duration,
}

impl AlloyRpc {
    /// Create a client for one endpoint.
    ///
    /// No request is made here; an unreachable node surfaces on first use.
    pub fn connect(rpc_url: &str, timeout_duration: Duration) -> BlockchainResult<Self> {
        let url: url::Url = rpc_url.parse().map_err(|e| BlockchainError::Rpc {
            operation: "connect".to_string(),
            source: RpcError::new(format!("Invalid RPC URL '{}': {}", rpc_url, e)),
        })?;

        let provider = ProviderBuilder::new().connect_http(url);

        tracing::info!(
            rpc_url = %rpc_url,
            timeout_ms = timeout_duration.as_millis() as u64,
            "RPC client initialized"
        );

        Ok(Self {
            provider: Arc::new(provider) as Arc<dyn Provider + Send + Sync>,
            rpc_url: rpc_url.to_string(),
            timeout_duration,
        })
    }

    /// Connect to every URL in order.
    pub fn connect_all(
        rpc_urls: &[String],
        timeout_duration: Duration,
    ) -> BlockchainResult<Vec<Arc<dyn ChainRpc>>> {
        rpc_urls
            .iter()
            .map(|url| {
                Self::connect(url, timeout_duration).map(|c| Arc::new(c) as Arc<dyn ChainRpc>)
            })
            .collect()
    }

    /// Verify the connected chain ID matches configuration.
    pub async fn verify_chain_id(&self, expected: u64) -> BlockchainResult<()> {
        let actual = self.chain_id().await.map_err(|source| BlockchainError::Rpc {
            operation: "chain_id".to_string(),
            source,
        })?;
        if actual != expected {
            return Err(BlockchainError::ChainMismatch { expected, actual });
        }
        Ok(())
    }

    /// Check if the endpoint answers a block number query.
    pub async fn is_healthy(&self) -> bool {
        let healthy = self.block_number().await.is_ok();
        metrics::record_endpoint_health(&self.rpc_url, healthy);
        healthy
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    async fn bounded<T, F>(&self, operation: &str, fut: F) -> RpcResult<T>
    where
        F: Future<Output = Result<T, TransportError>>,
    {
        match timeout(self.timeout_duration, fut).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => Err(to_rpc_error(e)),
            Err(_) => {
                tracing::warn!(rpc_url = %self.rpc_url, operation, "RPC timeout");
                Err(RpcError::new(format!(
                    "{} timed out after {} ms",
                    operation,
                    self.timeout_duration.as_millis()
                )))
            }
        }
    }
}

fn to_rpc_error(err: TransportError) -> RpcError {
    let revert_data = err
        .as_error_resp()
        .and_then(|payload| payload.as_revert_data());
    let mut rpc_err = RpcError::new(err.to_string());
    rpc_err.revert_data = revert_data;
    rpc_err
}

fn to_request(call: &CallMessage) -> TransactionRequest {
    let mut request = TransactionRequest::default()
        .with_to(call.to)
        .with_input(call.input.clone());
    if let Some(from) = call.from {
        request = request.with_from(from);
    }
    if let Some(gas) = call.gas {
        request = request.with_gas_limit(gas);
    }
    if let Some(gas_price) = call.gas_price {
        request = request.with_gas_price(gas_price);
    }
    request
}

fn to_header(block: &Block) -> BlockHeader {
    BlockHeader {
        number: block.header.inner.number,
        hash: block.header.hash,
        parent_hash: block.header.inner.parent_hash,
        timestamp: block.header.inner.timestamp,
        gas_limit: block.header.inner.gas_limit,
    }
}

#[async_trait]
impl ChainRpc for AlloyRpc {
    async fn chain_id(&self) -> RpcResult<u64> {
        self.bounded("eth_chainId", async { self.provider.get_chain_id().await })
            .await
    }

    async fn call(&self, call: &CallMessage) -> RpcResult<Bytes> {
        let request = to_request(call);
        self.bounded("eth_call", async { self.provider.call(request).await })
            .await
    }

    async fn estimate_gas(&self, call: &CallMessage) -> RpcResult<u64> {
        let request = to_request(call);
        self.bounded("eth_estimateGas", async {
            self.provider.estimate_gas(request).await
        })
        .await
    }

    async fn gas_price(&self) -> RpcResult<u128> {
        self.bounded("eth_gasPrice", async { self.provider.get_gas_price().await })
            .await
    }

    async fn pending_nonce(&self, address: Address) -> RpcResult<u64> {
        self.bounded("eth_getTransactionCount", async {
            self.provider.get_transaction_count(address).pending().await
        })
        .await
    }

    async fn latest_nonce(&self, address: Address) -> RpcResult<u64> {
        self.bounded("eth_getTransactionCount", async {
            self.provider.get_transaction_count(address).latest().await
        })
        .await
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> RpcResult<TxHash> {
        self.bounded("eth_sendRawTransaction", async {
            let pending = self.provider.send_raw_transaction(raw).await?;
            Ok(*pending.tx_hash())
        })
        .await
    }

    async fn receipt(&self, hash: TxHash) -> RpcResult<Option<Receipt>> {
        let receipt = self
            .bounded("eth_getTransactionReceipt", async {
                self.provider.get_transaction_receipt(hash).await
            })
            .await?;

        Ok(receipt.map(|r| Receipt {
            tx_hash: r.transaction_hash,
            success: r.status(),
            block_number: r.block_number,
            logs: r.logs().iter().map(|log| log.inner.clone()).collect(),
        }))
    }

    async fn block_by_number(&self, number: u64) -> RpcResult<Option<RawBlock>> {
        let block = self
            .bounded("eth_getBlockByNumber", async {
                self.provider
                    .get_block_by_number(BlockNumberOrTag::Number(number))
                    .full()
                    .await
            })
            .await?;

        let Some(block) = block else {
            return Ok(None);
        };

        let header = to_header(&block);
        let transactions = match block.transactions {
            BlockTransactions::Full(txs) => txs.into_iter().map(|tx| tx.inner.into_inner()).collect(),
            // Empty blocks may come back as an empty hash list
            BlockTransactions::Hashes(hashes) if hashes.is_empty() => Vec::new(),
            _ => {
                return Err(RpcError::new(format!(
                    "block {} returned without full transaction bodies",
                    number
                )))
            }
        };

        Ok(Some(RawBlock {
            header,
            transactions,
        }))
    }

    async fn header_by_number(&self, number: Option<u64>) -> RpcResult<Option<BlockHeader>> {
        let tag = number
            .map(BlockNumberOrTag::Number)
            .unwrap_or(BlockNumberOrTag::Latest);
        let block = self
            .bounded("eth_getBlockByNumber", async {
                self.provider.get_block_by_number(tag).await
            })
            .await?;
        Ok(block.as_ref().map(to_header))
    }

    async fn block_number(&self) -> RpcResult<u64> {
        self.bounded("eth_blockNumber", async { self.provider.get_block_number().await })
            .await
    }
}

impl std::fmt::Debug for AlloyRpc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlloyRpc")
            .field("rpc_url", &self.rpc_url)
            .field("timeout_ms", &self.timeout_duration.as_millis())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_rejects_invalid_url() {
        let result = AlloyRpc::connect("not a url", Duration::from_secs(1));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid RPC URL"));
    }

    #[test]
    fn test_to_request_carries_optional_fields() {
        let call = CallMessage {
            from: Some(Address::repeat_byte(1)),
            to: Address::repeat_byte(2),
            input: Bytes::from_static(&[0xde, 0xad]),
            gas: Some(100_000),
            gas_price: Some(7),
        };
        let request = to_request(&call);
        assert_eq!(request.from, Some(Address::repeat_byte(1)));
        assert_eq!(request.gas, Some(100_000));
        assert_eq!(request.gas_price, Some(7));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_errors() {
        // Nothing listens on port 1; the request fails instead of hanging
        let client = AlloyRpc::connect("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        let result = client.block_number().await;
        assert!(result.is_err());
        assert!(!client.is_healthy().await);
    }
}
