//! Contract reads with bounded retry.
//!
//! # Responsibilities
//! - Encode the call through the codec (never retried)
//! - Issue `eth_call` round-robin across equivalent endpoints
//! - Retry transport failures with linear backoff
//! - Decode the returned bytes into the caller's type (never retried)

use std::sync::Arc;

use crate::abi::codec::{Codec, ReturnValue};
use crate::blockchain::rpc::{CallMessage, ChainRpc, RpcError};
use crate::blockchain::types::{BlockchainError, BlockchainResult, CallRequest, RetryConfig};
use crate::lifecycle::cancel::CancelToken;
use crate::load_balancer::RoundRobin;
use crate::resilience::{retry, RetryError, RetryPolicy};

/// Read engine over one or more equivalent endpoints.
pub struct ContractReader {
    endpoints: Vec<Arc<dyn ChainRpc>>,
    selector: RoundRobin,
    codec: Arc<dyn Codec>,
    policy: RetryPolicy,
}

impl ContractReader {
    pub fn new(
        endpoints: Vec<Arc<dyn ChainRpc>>,
        codec: Arc<dyn Codec>,
        policy: RetryPolicy,
    ) -> BlockchainResult<Self> {
        if endpoints.is_empty() {
            return Err(BlockchainError::NoSources);
        }
        Ok(Self {
            endpoints,
            selector: RoundRobin::new(),
            codec,
            policy,
        })
    }

    pub fn from_config(
        endpoints: Vec<Arc<dyn ChainRpc>>,
        codec: Arc<dyn Codec>,
        config: &RetryConfig,
    ) -> BlockchainResult<Self> {
        Self::new(endpoints, codec, RetryPolicy::from(config))
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Call a view method and decode its outputs as `T`.
    pub async fn read<T: ReturnValue>(&self, request: &CallRequest) -> BlockchainResult<T> {
        self.read_with_cancel(request, &CancelToken::never()).await
    }

    /// [`read`](Self::read) that stops between attempts once `cancel` fires.
    pub async fn read_with_cancel<T: ReturnValue>(
        &self,
        request: &CallRequest,
        cancel: &CancelToken,
    ) -> BlockchainResult<T> {
        let input = self.codec.encode_call(&request.method, &request.args)?;
        let message = CallMessage::new(request.to, input);

        let result = retry(&self.policy, "eth_call", cancel, |attempt| {
            let picked = self
                .selector
                .pick(&self.endpoints)
                .map(|(index, endpoint)| (index, endpoint.clone()));
            let message = &message;
            async move {
                let (index, endpoint) =
                    picked.ok_or_else(|| RpcError::new("no endpoint available"))?;
                tracing::debug!(
                    method = %request.method,
                    to = %request.to,
                    endpoint = index,
                    attempt = attempt + 1,
                    "Calling contract"
                );
                endpoint.call(message).await.map_err(|e| {
                    tracing::debug!(endpoint = index, error = %e, "eth_call failed");
                    e
                })
            }
        })
        .await;

        let data = match result {
            Ok(data) => data,
            Err(RetryError::Exhausted { attempts, last }) => {
                return Err(BlockchainError::Call {
                    operation: request.method.clone(),
                    attempts,
                    source: last,
                })
            }
            Err(RetryError::Cancelled) => return Err(BlockchainError::Cancelled { hash: None }),
        };

        let values = self.codec.decode_result(&message.input, &data)?;
        Ok(T::from_values(values)?)
    }
}

impl std::fmt::Debug for ContractReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractReader")
            .field("endpoints", &self.endpoints.len())
            .field("policy", &self.policy)
            .finish()
    }
}
