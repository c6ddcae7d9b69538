//! Multi-source block fetching with cross-source agreement checks.
//!
//! # Responsibilities
//! - Fetch the same height from every configured source
//! - Fail on the first source error or the first divergence (no quorum)
//! - Keep only transactions matching the configured protocol
//! - Recover senders and keep each transaction's original block position
//!
//! Sources are evaluated in configured order in both fan-out modes, so the
//! index in an error always names the first failing source.

use alloy::consensus::{Transaction, TxEnvelope};
use alloy::primitives::Address;
use futures_util::future::join_all;
use std::sync::Arc;
use thiserror::Error;

use crate::blockchain::rpc::ChainRpc;
use crate::blockchain::types::{
    BlockHeader, BlockView, BlockchainError, BlockchainResult, RawBlock, TransactionView,
};
use crate::config::schema::FanOut;
use crate::observability::metrics;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("payload does not match the protocol format")]
    FormatMismatch,

    #[error("failed to parse payload: {0}")]
    Invalid(String),
}

/// Pluggable recognizer and decoder for protocol transactions.
pub trait ProtocolParser: Send + Sync {
    type Output;

    /// Cheap test of whether `payload` belongs to the protocol.
    fn check_format(&self, payload: &[u8]) -> Result<(), ParseError>;

    fn parse(&self, payload: &[u8]) -> Result<Self::Output, ParseError>;
}

/// Read path over independent block sources. The first source is the primary.
pub struct BlockFetcher<P> {
    sources: Vec<Arc<dyn ChainRpc>>,
    parser: P,
    fan_out: FanOut,
}

impl<P: ProtocolParser> BlockFetcher<P> {
    pub fn new(sources: Vec<Arc<dyn ChainRpc>>, parser: P, fan_out: FanOut) -> BlockchainResult<Self> {
        if sources.is_empty() {
            return Err(BlockchainError::NoSources);
        }
        Ok(Self {
            sources,
            parser,
            fan_out,
        })
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn parser(&self) -> &P {
        &self.parser
    }

    fn primary(&self) -> BlockchainResult<&Arc<dyn ChainRpc>> {
        self.sources.first().ok_or(BlockchainError::NoSources)
    }

    /// Latest block height according to the primary source.
    pub async fn current_height(&self) -> BlockchainResult<u64> {
        self.primary()?
            .block_number()
            .await
            .map_err(|source| BlockchainError::Source {
                source_index: 0,
                source,
            })
    }

    /// Header at `height` from the primary source.
    pub async fn header_at(&self, height: u64) -> BlockchainResult<BlockHeader> {
        self.primary()?
            .header_by_number(Some(height))
            .await
            .map_err(|source| BlockchainError::Source {
                source_index: 0,
                source,
            })?
            .ok_or(BlockchainError::BlockNotFound {
                source_index: 0,
                height,
            })
    }

    /// Latest header from the primary source.
    pub async fn latest_header(&self) -> BlockchainResult<BlockHeader> {
        let height = self.current_height().await?;
        self.primary()?
            .header_by_number(None)
            .await
            .map_err(|source| BlockchainError::Source {
                source_index: 0,
                source,
            })?
            .ok_or(BlockchainError::BlockNotFound {
                source_index: 0,
                height,
            })
    }

    /// Fetch `height` from every source, verify agreement and build the view.
    pub async fn fetch_block(&self, height: u64) -> BlockchainResult<BlockView<P::Output>> {
        tracing::debug!(
            height,
            sources = self.sources.len(),
            fan_out = ?self.fan_out,
            "Fetching block"
        );

        let block = match self.fan_out {
            FanOut::Sequential => self.fetch_sequential(height).await?,
            FanOut::Concurrent => self.fetch_concurrent(height).await?,
        };

        self.build_view(block)
    }

    async fn fetch_sequential(&self, height: u64) -> BlockchainResult<RawBlock> {
        let mut reference: Option<RawBlock> = None;
        for (index, source) in self.sources.iter().enumerate() {
            let block = fetch_from(index, source.as_ref(), height).await?;
            match &reference {
                None => reference = Some(block),
                Some(expected) => check_agreement(expected, &block, index)?,
            }
        }
        reference.ok_or(BlockchainError::NoSources)
    }

    async fn fetch_concurrent(&self, height: u64) -> BlockchainResult<RawBlock> {
        let results = join_all(
            self.sources
                .iter()
                .enumerate()
                .map(|(index, source)| fetch_from(index, source.as_ref(), height)),
        )
        .await;

        let mut reference: Option<RawBlock> = None;
        for (index, result) in results.into_iter().enumerate() {
            let block = result?;
            match &reference {
                None => reference = Some(block),
                Some(expected) => check_agreement(expected, &block, index)?,
            }
        }
        reference.ok_or(BlockchainError::NoSources)
    }

    fn build_view(&self, block: RawBlock) -> BlockchainResult<BlockView<P::Output>> {
        let mut transactions = Vec::new();

        for (position, tx) in block.transactions.iter().enumerate() {
            let payload = tx.input();
            if self.parser.check_format(payload).is_err() {
                continue;
            }

            let data = match self.parser.parse(payload) {
                Ok(data) => data,
                Err(e) => {
                    tracing::debug!(
                        block = block.header.number,
                        position,
                        error = %e,
                        "Dropping unparseable transaction"
                    );
                    continue;
                }
            };

            let from = recover_sender(tx)
                .map_err(|message| BlockchainError::SenderRecovery { position, message })?;

            transactions.push(TransactionView {
                data,
                hash: *tx.tx_hash(),
                from,
                to: tx.to(),
                position,
            });
        }

        tracing::debug!(
            block = block.header.number,
            total = block.transactions.len(),
            matched = transactions.len(),
            "Block view built"
        );

        Ok(BlockView {
            header: block.header,
            transactions,
        })
    }
}

async fn fetch_from(index: usize, source: &dyn ChainRpc, height: u64) -> BlockchainResult<RawBlock> {
    source
        .block_by_number(height)
        .await
        .map_err(|e| {
            tracing::warn!(source_index = index, height, error = %e, "Block source failed");
            BlockchainError::Source {
                source_index: index,
                source: e,
            }
        })?
        .ok_or(BlockchainError::BlockNotFound {
            source_index: index,
            height,
        })
}

/// Compare a source's block against the reference by hash and transaction count.
fn check_agreement(expected: &RawBlock, actual: &RawBlock, source_index: usize) -> BlockchainResult<()> {
    if expected.header.hash == actual.header.hash
        && expected.transactions.len() == actual.transactions.len()
    {
        return Ok(());
    }

    metrics::record_block_inconsistency(source_index);
    tracing::warn!(
        source_index,
        expected_hash = %expected.header.hash,
        actual_hash = %actual.header.hash,
        expected_tx_count = expected.transactions.len(),
        actual_tx_count = actual.transactions.len(),
        "Block sources disagree"
    );

    Err(BlockchainError::BlockInconsistency {
        source_index,
        expected_number: expected.header.number,
        actual_number: actual.header.number,
        expected_hash: expected.header.hash,
        actual_hash: actual.header.hash,
        expected_tx_count: expected.transactions.len(),
        actual_tx_count: actual.transactions.len(),
    })
}

/// Recover the signer with the scheme of the envelope's transaction type.
pub fn recover_sender(tx: &TxEnvelope) -> Result<Address, String> {
    let recovered = match tx {
        TxEnvelope::Legacy(signed) => signed.recover_signer(),
        TxEnvelope::Eip2930(signed) => signed.recover_signer(),
        TxEnvelope::Eip1559(signed) => signed.recover_signer(),
        TxEnvelope::Eip4844(signed) => signed.recover_signer(),
        TxEnvelope::Eip7702(signed) => signed.recover_signer(),
    };
    recovered.map_err(|e| e.to_string())
}

impl<P> std::fmt::Debug for BlockFetcher<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockFetcher")
            .field("sources", &self.sources.len())
            .field("fan_out", &self.fan_out)
            .finish()
    }
}
