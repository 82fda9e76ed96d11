//! Unit tests for EVM client functions
//!
//! These tests verify that EVM client functions work correctly against a
//! mocked JSON-RPC endpoint, including receipt queries, account discovery,
//! and transaction submission.

use chain_clients_evm::{EvmClient, RpcError, TransactionRequest};
use serde_json::json;
use wiremock::matchers::{body_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[path = "helpers.rs"]
mod test_helpers;
use test_helpers::{DUMMY_CONTRACT_ADDR_EVM, DUMMY_FARMER_ADDR_EVM, DUMMY_TX_HASH};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Mount a mock that answers one JSON-RPC method/params pair with `result`
async fn mock_rpc(
    mock_server: &MockServer,
    rpc_method: &str,
    params: serde_json::Value,
    result: serde_json::Value,
) {
    Mock::given(method("POST"))
        .and(body_json(json!({
            "jsonrpc": "2.0",
            "method": rpc_method,
            "params": params,
            "id": 1
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "result": result,
            "id": 1
        })))
        .mount(mock_server)
        .await;
}

/// Mount a mock that answers one JSON-RPC method with an error object
async fn mock_rpc_error(mock_server: &MockServer, rpc_method: &str, code: i64, message: &str) {
    Mock::given(method("POST"))
        .and(wiremock::matchers::body_partial_json(json!({ "method": rpc_method })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "error": { "code": code, "message": message },
            "id": 1
        })))
        .mount(mock_server)
        .await;
}

// ============================================================================
// RECEIPT TESTS
// ============================================================================

/// What is tested: get_transaction_receipt() parses status and logs
/// Why: The receipt interpreter needs the full log list, not only the status
#[tokio::test]
async fn test_get_transaction_receipt_with_logs() {
    let mock_server = MockServer::start().await;
    mock_rpc(
        &mock_server,
        "eth_getTransactionReceipt",
        json!([DUMMY_TX_HASH]),
        json!({
            "transactionHash": DUMMY_TX_HASH,
            "blockNumber": "0x10",
            "from": DUMMY_FARMER_ADDR_EVM,
            "to": DUMMY_CONTRACT_ADDR_EVM,
            "status": "0x1",
            "gasUsed": "0x5208",
            "logs": [{
                "address": DUMMY_CONTRACT_ADDR_EVM,
                "topics": ["0x01"],
                "data": "0x",
                "blockNumber": "0x10",
                "transactionHash": DUMMY_TX_HASH,
                "logIndex": "0x2"
            }]
        }),
    )
    .await;

    let client = EvmClient::new(&mock_server.uri()).expect("Failed to create EvmClient");
    let receipt = client
        .get_transaction_receipt(DUMMY_TX_HASH)
        .await
        .expect("Should fetch receipt")
        .expect("Receipt should exist");

    assert!(receipt.succeeded());
    assert_eq!(receipt.block_number_u64(), Some(16));
    assert_eq!(receipt.logs.len(), 1);
    assert_eq!(receipt.logs[0].log_index_u64(), 2);
}

/// What is tested: a null receipt maps to None
/// Why: Pending transactions must read as "not yet" rather than as an error
#[tokio::test]
async fn test_get_transaction_receipt_pending() {
    let mock_server = MockServer::start().await;
    mock_rpc(
        &mock_server,
        "eth_getTransactionReceipt",
        json!([DUMMY_TX_HASH]),
        json!(null),
    )
    .await;

    let client = EvmClient::new(&mock_server.uri()).expect("Failed to create EvmClient");
    let receipt = client
        .get_transaction_receipt(DUMMY_TX_HASH)
        .await
        .expect("Null receipt is not an error");

    assert!(receipt.is_none());
}

/// What is tested: hashes without a 0x prefix are normalised before sending
/// Why: Callers pass hashes copied from different tools
#[tokio::test]
async fn test_get_transaction_normalizes_hash() {
    let mock_server = MockServer::start().await;
    mock_rpc(
        &mock_server,
        "eth_getTransactionByHash",
        json!([DUMMY_TX_HASH]),
        json!({
            "hash": DUMMY_TX_HASH,
            "blockNumber": "0x1",
            "transactionIndex": "0x0",
            "from": DUMMY_FARMER_ADDR_EVM,
            "to": DUMMY_CONTRACT_ADDR_EVM,
            "input": "0x",
            "value": "0x0"
        }),
    )
    .await;

    let client = EvmClient::new(&mock_server.uri()).expect("Failed to create EvmClient");
    let tx = client
        .get_transaction(DUMMY_TX_HASH.trim_start_matches("0x"))
        .await
        .expect("Should query transaction")
        .expect("Transaction should exist");

    assert!(tx.is_mined());
    assert_eq!(tx.from, DUMMY_FARMER_ADDR_EVM);
}

// ============================================================================
// ACCOUNT AND SUBMISSION TESTS
// ============================================================================

/// What is tested: request_accounts() falls back to eth_accounts on -32601
/// Why: Plain nodes with unlocked accounts do not implement eth_requestAccounts
#[tokio::test]
async fn test_request_accounts_falls_back_to_eth_accounts() {
    let mock_server = MockServer::start().await;
    mock_rpc_error(&mock_server, "eth_requestAccounts", -32601, "method not found").await;
    mock_rpc(
        &mock_server,
        "eth_accounts",
        json!([]),
        json!([DUMMY_FARMER_ADDR_EVM]),
    )
    .await;

    let client = EvmClient::new(&mock_server.uri()).expect("Failed to create EvmClient");
    let accounts = client.request_accounts().await.expect("Fallback should succeed");

    assert_eq!(accounts, vec![DUMMY_FARMER_ADDR_EVM.to_string()]);
}

/// What is tested: send_transaction() posts from/to/data/value and returns the hash
/// Why: The provider signs exactly the request we build
#[tokio::test]
async fn test_send_transaction_returns_hash() {
    let mock_server = MockServer::start().await;
    mock_rpc(
        &mock_server,
        "eth_sendTransaction",
        json!([{
            "from": DUMMY_FARMER_ADDR_EVM,
            "to": DUMMY_CONTRACT_ADDR_EVM,
            "data": "0xdeadbeef",
            "value": "0x64"
        }]),
        json!(DUMMY_TX_HASH),
    )
    .await;

    let client = EvmClient::new(&mock_server.uri()).expect("Failed to create EvmClient");
    let hash = client
        .send_transaction(&TransactionRequest {
            from: DUMMY_FARMER_ADDR_EVM.to_string(),
            to: DUMMY_CONTRACT_ADDR_EVM.to_string(),
            data: "0xdeadbeef".to_string(),
            value: Some("0x64".to_string()),
        })
        .await
        .expect("Should submit");

    assert_eq!(hash, DUMMY_TX_HASH);
}

/// What is tested: wallet error objects surface their EIP-1193 code
/// Why: The orchestrator distinguishes user rejection (4001) from other failures
#[tokio::test]
async fn test_send_transaction_user_rejected_code() {
    let mock_server = MockServer::start().await;
    mock_rpc_error(&mock_server, "eth_sendTransaction", 4001, "User rejected the request.").await;

    let client = EvmClient::new(&mock_server.uri()).expect("Failed to create EvmClient");
    let err = client
        .send_transaction(&TransactionRequest {
            from: DUMMY_FARMER_ADDR_EVM.to_string(),
            to: DUMMY_CONTRACT_ADDR_EVM.to_string(),
            data: "0x".to_string(),
            value: None,
        })
        .await
        .unwrap_err();

    assert_eq!(err.code(), Some(4001));
    assert!(!err.is_transport());
}

/// What is tested: an unreachable endpoint yields a transport error
/// Why: Transport failures are the only ones classified as network errors
#[tokio::test]
async fn test_unreachable_endpoint_is_transport_error() {
    let client = EvmClient::new("http://127.0.0.1:1").expect("Failed to create EvmClient");
    let err = client.get_chain_id().await.unwrap_err();

    assert!(err.is_transport());
    assert!(matches!(err, RpcError::Transport { .. }));
}

// ============================================================================
// QUERY TESTS
// ============================================================================

/// What is tested: call() sends eth_call against "latest" and decodes the hex result
/// Why: Integrity checks read committed hashes through eth_call
#[tokio::test]
async fn test_call_decodes_result() {
    let mock_server = MockServer::start().await;
    mock_rpc(
        &mock_server,
        "eth_call",
        json!([{ "to": DUMMY_CONTRACT_ADDR_EVM, "data": "0x12345678" }, "latest"]),
        json!("0x00ff"),
    )
    .await;

    let client = EvmClient::new(&mock_server.uri()).expect("Failed to create EvmClient");
    let output = client
        .call(DUMMY_CONTRACT_ADDR_EVM, &[0x12, 0x34, 0x56, 0x78])
        .await
        .expect("eth_call should succeed");

    assert_eq!(output, vec![0x00, 0xff]);
}

/// What is tested: get_chain_id() parses the hex quantity
/// Why: Startup verifies the node serves the configured chain
#[tokio::test]
async fn test_get_chain_id() {
    let mock_server = MockServer::start().await;
    mock_rpc(&mock_server, "eth_chainId", json!([]), json!("0xaa36a7")).await;

    let client = EvmClient::new(&mock_server.uri()).expect("Failed to create EvmClient");
    assert_eq!(client.get_chain_id().await.unwrap(), 11155111);
}
