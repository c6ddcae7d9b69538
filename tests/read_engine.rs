//! Read engine behavior against scripted nodes.

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, Bytes, U256};
use std::sync::Arc;
use std::time::Duration;

use rpc_guard::abi::AbiCodec;
use rpc_guard::blockchain::{BlockchainError, CallRequest, ChainRpc, ContractReader, RpcError};
use rpc_guard::lifecycle::Cancellation;
use rpc_guard::resilience::RetryPolicy;

mod common;
use common::MockRpc;

fn balance_request() -> CallRequest {
    CallRequest::new(
        common::token(),
        "balanceOf",
        vec![DynSolValue::Address(Address::repeat_byte(0x11))],
    )
}

fn encoded_uint(value: u64) -> Bytes {
    DynSolValue::Uint(U256::from(value), 256).abi_encode().into()
}

fn reader(endpoints: Vec<Arc<MockRpc>>, retry_count: u32) -> ContractReader {
    let endpoints = endpoints
        .into_iter()
        .map(|e| e as Arc<dyn ChainRpc>)
        .collect();
    ContractReader::new(
        endpoints,
        common::shared_codec(),
        RetryPolicy::new(retry_count, Duration::from_millis(1)),
    )
    .unwrap()
}

#[tokio::test]
async fn test_read_decodes_result() {
    let node = Arc::new(MockRpc::new());
    node.push_call(Ok(encoded_uint(1234)));

    let balance: U256 = reader(vec![node.clone()], 3).read(&balance_request()).await.unwrap();

    assert_eq!(balance, U256::from(1234u64));
    assert_eq!(node.calls(), 1);
    let sent = node.calls.lock().unwrap()[0].clone();
    assert_eq!(sent.to, common::token());
    assert_eq!(&sent.input[..4], &[0x70, 0xa0, 0x82, 0x31]);
}

const QUOTER_ABI: &str = r#"[
    {"type":"function","name":"quote","stateMutability":"view",
     "inputs":[{"name":"amount","type":"uint256"}],
     "outputs":[{"name":"","type":"string"}]},
    {"type":"function","name":"quote","stateMutability":"view",
     "inputs":[{"name":"amount","type":"uint256"},{"name":"fee","type":"uint256"}],
     "outputs":[{"name":"","type":"uint256"}]}
]"#;

#[tokio::test]
async fn test_overloaded_method_decodes_with_called_overload() {
    let node = Arc::new(MockRpc::new());
    node.push_call(Ok(encoded_uint(42)));
    let reader = ContractReader::new(
        vec![node.clone() as Arc<dyn ChainRpc>],
        Arc::new(AbiCodec::from_json(QUOTER_ABI).unwrap()),
        RetryPolicy::new(0, Duration::from_millis(1)),
    )
    .unwrap();

    let request = CallRequest::new(
        common::token(),
        "quote",
        vec![
            DynSolValue::Uint(U256::from(1u8), 256),
            DynSolValue::Uint(U256::from(2u8), 256),
        ],
    );
    let quote: U256 = reader.read(&request).await.unwrap();

    assert_eq!(quote, U256::from(42u64));
}

#[tokio::test]
async fn test_persistent_failure_makes_n_plus_one_attempts() {
    for retry_count in 0..4u32 {
        let node = Arc::new(MockRpc::new());

        let err = reader(vec![node.clone()], retry_count)
            .read::<U256>(&balance_request())
            .await
            .unwrap_err();

        match err {
            BlockchainError::Call {
                operation,
                attempts,
                source,
            } => {
                assert_eq!(operation, "balanceOf");
                assert_eq!(attempts, retry_count + 1);
                assert_eq!(source.message, "connection refused");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(node.calls(), retry_count + 1);
    }
}

#[tokio::test]
async fn test_transient_failure_recovers() {
    let node = Arc::new(MockRpc::new());
    node.push_call(Err(RpcError::new("503 Service Unavailable")));
    node.push_call(Err(RpcError::new("503 Service Unavailable")));
    node.push_call(Ok(encoded_uint(9)));

    let value: u64 = reader(vec![node.clone()], 3).read(&balance_request()).await.unwrap();
    assert_eq!(value, 9);
    assert_eq!(node.calls(), 3);
}

#[tokio::test]
async fn test_attempts_rotate_across_endpoints() {
    let first = Arc::new(MockRpc::new());
    let second = Arc::new(MockRpc::new());
    first.push_call(Err(RpcError::new("timeout")));
    second.push_call(Ok(encoded_uint(5)));

    let value: U256 = reader(vec![first.clone(), second.clone()], 1)
        .read(&balance_request())
        .await
        .unwrap();

    assert_eq!(value, U256::from(5u64));
    assert_eq!(first.calls(), 1);
    assert_eq!(second.calls(), 1);
}

#[tokio::test]
async fn test_unknown_method_is_not_sent() {
    let node = Arc::new(MockRpc::new());
    let request = CallRequest::new(common::token(), "totalSupply", vec![]);

    let err = reader(vec![node.clone()], 3)
        .read::<U256>(&request)
        .await
        .unwrap_err();

    assert!(matches!(err, BlockchainError::Encoding(_)));
    assert_eq!(node.calls(), 0);
}

#[tokio::test]
async fn test_decode_failure_is_not_retried() {
    let node = Arc::new(MockRpc::new());
    node.push_call(Ok(Bytes::from_static(&[0x01, 0x02, 0x03])));
    node.push_call(Ok(encoded_uint(1)));

    let err = reader(vec![node.clone()], 3)
        .read::<U256>(&balance_request())
        .await
        .unwrap_err();

    assert!(matches!(err, BlockchainError::Decoding(_)));
    assert_eq!(node.calls(), 1);
}

#[tokio::test]
async fn test_backoff_grows_linearly_between_attempts() {
    let node = Arc::new(MockRpc::new());
    let reader = ContractReader::new(
        vec![node.clone() as Arc<dyn ChainRpc>],
        common::shared_codec(),
        RetryPolicy::new(2, Duration::from_millis(30)),
    )
    .unwrap();

    let start = tokio::time::Instant::now();
    let _ = reader.read::<U256>(&balance_request()).await;
    let elapsed = start.elapsed();

    // 30ms after attempt 0, 60ms after attempt 1, nothing after the last
    assert!(elapsed >= Duration::from_millis(90), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(1000), "elapsed {:?}", elapsed);
    assert_eq!(node.calls(), 3);
}

#[tokio::test]
async fn test_cancelled_read_stops_between_attempts() {
    let node = Arc::new(MockRpc::new());
    let reader = ContractReader::new(
        vec![node.clone() as Arc<dyn ChainRpc>],
        common::shared_codec(),
        RetryPolicy::new(5, Duration::from_secs(10)),
    )
    .unwrap();

    let cancellation = Cancellation::new();
    let token = cancellation.token();
    let trigger = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancellation.trigger();
    });

    let start = tokio::time::Instant::now();
    let err = reader
        .read_with_cancel::<U256>(&balance_request(), &token)
        .await
        .unwrap_err();
    trigger.await.unwrap();

    assert!(matches!(err, BlockchainError::Cancelled { hash: None }));
    assert!(start.elapsed() < Duration::from_secs(2));
    assert_eq!(node.calls(), 1);
}

#[test]
fn test_reader_requires_an_endpoint() {
    let result = ContractReader::new(Vec::new(), common::shared_codec(), RetryPolicy::default());
    assert!(matches!(result, Err(BlockchainError::NoSources)));
}
