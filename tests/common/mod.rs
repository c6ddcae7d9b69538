//! Shared utilities for integration testing.
//!
//! `MockRpc` is a scriptable in-memory node: queued responses per operation,
//! call counters and recorded requests.

#![allow(dead_code)]

use alloy::consensus::{SignableTransaction, Signed, TxEip1559, TxEip2930, TxEnvelope, TxLegacy};
use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{keccak256, Address, Bytes, Signature, TxHash, TxKind, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use alloy::sol_types::{Revert, SolError};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use rpc_guard::abi::{AbiCodec, Codec};
use rpc_guard::blockchain::{
    BlockHeader, CallMessage, ChainRpc, RawBlock, Receipt, RpcError, RpcResult, Wallet,
};

// Well-known test private key (Anvil's first account)
pub const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const TEST_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
pub const CHAIN_ID: u64 = 31337;

pub const TOKEN_ABI: &str = r#"[
    {"type":"function","name":"balanceOf","stateMutability":"view",
     "inputs":[{"name":"owner","type":"address"}],
     "outputs":[{"name":"","type":"uint256"}]},
    {"type":"function","name":"transfer","stateMutability":"nonpayable",
     "inputs":[{"name":"to","type":"address"},{"name":"amount","type":"uint256"}],
     "outputs":[{"name":"","type":"bool"}]},
    {"type":"function","name":"approve","stateMutability":"nonpayable",
     "inputs":[{"name":"spender","type":"address"},{"name":"amount","type":"uint256"}],
     "outputs":[{"name":"","type":"bool"}]}
]"#;

pub fn codec() -> AbiCodec {
    AbiCodec::from_json(TOKEN_ABI).unwrap()
}

pub fn shared_codec() -> Arc<dyn Codec> {
    Arc::new(codec())
}

pub fn wallet() -> Wallet {
    Wallet::from_private_key(TEST_PRIVATE_KEY, CHAIN_ID).unwrap()
}

pub fn test_address() -> Address {
    TEST_ADDRESS.parse().unwrap()
}

/// `Error(string)` revert payload.
pub fn revert_payload(reason: &str) -> Bytes {
    Revert {
        reason: reason.to_string(),
    }
    .abi_encode()
    .into()
}

pub fn transfer_input(to: Address, amount: u64) -> Bytes {
    codec()
        .encode_call(
            "transfer",
            &[
                DynSolValue::Address(to),
                DynSolValue::Uint(U256::from(amount), 256),
            ],
        )
        .unwrap()
}

pub fn approve_input(spender: Address, amount: u64) -> Bytes {
    codec()
        .encode_call(
            "approve",
            &[
                DynSolValue::Address(spender),
                DynSolValue::Uint(U256::from(amount), 256),
            ],
        )
        .unwrap()
}

fn signer() -> PrivateKeySigner {
    TEST_PRIVATE_KEY.parse().unwrap()
}

/// Target of every helper-built transaction.
pub fn token() -> Address {
    Address::repeat_byte(0x42)
}

pub fn signed_legacy(input: Bytes, nonce: u64) -> TxEnvelope {
    let tx = TxLegacy {
        chain_id: Some(CHAIN_ID),
        nonce,
        gas_price: 1_000_000_000,
        gas_limit: 100_000,
        to: TxKind::Call(token()),
        value: U256::ZERO,
        input,
    };
    let signature = signer().sign_hash_sync(&tx.signature_hash()).unwrap();
    tx.into_signed(signature).into()
}

/// Legacy transaction carrying an r = s = 0 signature, from which no sender recovers.
pub fn unrecoverable_legacy(input: Bytes, nonce: u64) -> TxEnvelope {
    let tx = TxLegacy {
        chain_id: Some(CHAIN_ID),
        nonce,
        gas_price: 1_000_000_000,
        gas_limit: 100_000,
        to: TxKind::Call(token()),
        value: U256::ZERO,
        input,
    };
    let signature = Signature::new(U256::ZERO, U256::ZERO, false);
    Signed::new_unchecked(tx, signature, B256::repeat_byte(0xee)).into()
}

pub fn signed_eip2930(input: Bytes, nonce: u64) -> TxEnvelope {
    let tx = TxEip2930 {
        chain_id: CHAIN_ID,
        nonce,
        gas_price: 1_000_000_000,
        gas_limit: 100_000,
        to: TxKind::Call(token()),
        value: U256::ZERO,
        access_list: Default::default(),
        input,
    };
    let signature = signer().sign_hash_sync(&tx.signature_hash()).unwrap();
    tx.into_signed(signature).into()
}

pub fn signed_eip1559(input: Bytes, nonce: u64) -> TxEnvelope {
    let tx = TxEip1559 {
        chain_id: CHAIN_ID,
        nonce,
        gas_limit: 100_000,
        max_fee_per_gas: 2_000_000_000,
        max_priority_fee_per_gas: 1_000_000_000,
        to: TxKind::Call(token()),
        value: U256::ZERO,
        access_list: Default::default(),
        input,
    };
    let signature = signer().sign_hash_sync(&tx.signature_hash()).unwrap();
    tx.into_signed(signature).into()
}

pub fn header(number: u64, hash: u8) -> BlockHeader {
    BlockHeader {
        number,
        hash: B256::repeat_byte(hash),
        parent_hash: B256::repeat_byte(hash.wrapping_sub(1)),
        timestamp: 1_700_000_000 + number * 12,
        gas_limit: 30_000_000,
    }
}

pub fn raw_block(number: u64, hash: u8, transactions: Vec<TxEnvelope>) -> RawBlock {
    RawBlock {
        header: header(number, hash),
        transactions,
    }
}

pub fn receipt(success: bool) -> Receipt {
    Receipt {
        tx_hash: TxHash::ZERO,
        success,
        block_number: Some(100),
        logs: Vec::new(),
    }
}

/// Scriptable in-memory node.
pub struct MockRpc {
    pub chain_id: u64,
    pub gas_price: u128,
    pub pending_nonce: u64,
    pub latest_nonce: Mutex<u64>,
    pub estimate: Mutex<RpcResult<u64>>,
    pub latest_header: Mutex<Option<BlockHeader>>,
    pub height: u64,
    /// Delay applied to every receipt lookup.
    pub receipt_delay: Option<Duration>,

    call_responses: Mutex<VecDeque<RpcResult<Bytes>>>,
    send_responses: Mutex<VecDeque<RpcResult<()>>>,
    receipt_responses: Mutex<VecDeque<RpcResult<Option<Receipt>>>>,
    blocks: Mutex<HashMap<u64, RpcResult<Option<RawBlock>>>>,

    pub call_count: AtomicU32,
    pub block_calls: AtomicU32,
    pub calls: Mutex<Vec<CallMessage>>,
    pub broadcasts: Mutex<Vec<Bytes>>,
    pub receipt_lookups: Mutex<Vec<Instant>>,
}

impl MockRpc {
    pub fn new() -> Self {
        Self {
            chain_id: CHAIN_ID,
            gas_price: 1_000_000_000,
            pending_nonce: 7,
            latest_nonce: Mutex::new(7),
            estimate: Mutex::new(Ok(60_000)),
            latest_header: Mutex::new(Some(header(100, 0x10))),
            height: 100,
            receipt_delay: None,
            call_responses: Mutex::new(VecDeque::new()),
            send_responses: Mutex::new(VecDeque::new()),
            receipt_responses: Mutex::new(VecDeque::new()),
            blocks: Mutex::new(HashMap::new()),
            call_count: AtomicU32::new(0),
            block_calls: AtomicU32::new(0),
            calls: Mutex::new(Vec::new()),
            broadcasts: Mutex::new(Vec::new()),
            receipt_lookups: Mutex::new(Vec::new()),
        }
    }

    /// Queue an `eth_call` outcome. An empty queue answers with an error.
    pub fn push_call(&self, response: RpcResult<Bytes>) {
        self.call_responses.lock().unwrap().push_back(response);
    }

    /// Queue a broadcast outcome. An empty queue accepts the transaction.
    pub fn push_send(&self, response: RpcResult<()>) {
        self.send_responses.lock().unwrap().push_back(response);
    }

    /// Queue a receipt lookup outcome. An empty queue answers "not found".
    pub fn push_receipt(&self, response: RpcResult<Option<Receipt>>) {
        self.receipt_responses.lock().unwrap().push_back(response);
    }

    pub fn set_block(&self, height: u64, response: RpcResult<Option<RawBlock>>) {
        self.blocks.lock().unwrap().insert(height, response);
    }

    pub fn set_latest_nonce(&self, nonce: u64) {
        *self.latest_nonce.lock().unwrap() = nonce;
    }

    pub fn set_estimate(&self, estimate: RpcResult<u64>) {
        *self.estimate.lock().unwrap() = estimate;
    }

    pub fn calls(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn block_requests(&self) -> u32 {
        self.block_calls.load(Ordering::SeqCst)
    }

    pub fn broadcast_count(&self) -> usize {
        self.broadcasts.lock().unwrap().len()
    }

    /// Broadcast transactions, decoded, in send order.
    pub fn broadcast_envelopes(&self) -> Vec<TxEnvelope> {
        use alloy::eips::eip2718::Decodable2718;
        self.broadcasts
            .lock()
            .unwrap()
            .iter()
            .map(|raw| TxEnvelope::decode_2718(&mut raw.as_ref()).unwrap())
            .collect()
    }
}

#[async_trait]
impl ChainRpc for MockRpc {
    async fn chain_id(&self) -> RpcResult<u64> {
        Ok(self.chain_id)
    }

    async fn call(&self, call: &CallMessage) -> RpcResult<Bytes> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(call.clone());
        self.call_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(RpcError::new("connection refused")))
    }

    async fn estimate_gas(&self, _call: &CallMessage) -> RpcResult<u64> {
        self.estimate.lock().unwrap().clone()
    }

    async fn gas_price(&self) -> RpcResult<u128> {
        Ok(self.gas_price)
    }

    async fn pending_nonce(&self, _address: Address) -> RpcResult<u64> {
        Ok(self.pending_nonce)
    }

    async fn latest_nonce(&self, _address: Address) -> RpcResult<u64> {
        Ok(*self.latest_nonce.lock().unwrap())
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> RpcResult<TxHash> {
        self.broadcasts
            .lock()
            .unwrap()
            .push(Bytes::copy_from_slice(raw));
        let response = self.send_responses.lock().unwrap().pop_front();
        match response {
            Some(Err(e)) => Err(e),
            _ => Ok(keccak256(raw)),
        }
    }

    async fn receipt(&self, _hash: TxHash) -> RpcResult<Option<Receipt>> {
        self.receipt_lookups.lock().unwrap().push(Instant::now());
        if let Some(delay) = self.receipt_delay {
            tokio::time::sleep(delay).await;
        }
        let response = self.receipt_responses.lock().unwrap().pop_front();
        response.unwrap_or(Ok(None))
    }

    async fn block_by_number(&self, number: u64) -> RpcResult<Option<RawBlock>> {
        self.block_calls.fetch_add(1, Ordering::SeqCst);
        self.blocks
            .lock()
            .unwrap()
            .get(&number)
            .cloned()
            .unwrap_or(Ok(None))
    }

    async fn header_by_number(&self, number: Option<u64>) -> RpcResult<Option<BlockHeader>> {
        match number {
            None => Ok(self.latest_header.lock().unwrap().clone()),
            Some(n) => {
                let blocks = self.blocks.lock().unwrap();
                match blocks.get(&n) {
                    Some(Ok(block)) => Ok(block.as_ref().map(|b| b.header.clone())),
                    Some(Err(e)) => Err(e.clone()),
                    None => Ok(None),
                }
            }
        }
    }

    async fn block_number(&self) -> RpcResult<u64> {
        Ok(self.height)
    }
}
