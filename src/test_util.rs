use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use alloy::primitives::{keccak256, Address, Bloom, Bytes, Log, TxHash, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::{SolCall, SolEvent};
use async_trait::async_trait;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use reqwest::Url;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use crate::chain::{ChainClient, TxReceipt};
use crate::config::CompletionSettings;
use crate::contract_abi::ChatGPTInfoStore;
use crate::errors::ChainError;

// Local blockchain (Anvil) configurations
pub const CHAIN_ID: u64 = 31337;
pub const INFO_STORE_CONTRACT_ADDR: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";
pub const GAS_WALLET_KEY: &str = "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
pub const GAS_WALLET_PUBLIC_ADDRESS: &str = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8";
pub const TEST_OPENAI_API_KEY: &str = "sk-test-0000";

pub fn test_signer() -> PrivateKeySigner {
    GAS_WALLET_KEY.parse().unwrap()
}

pub fn completion_settings(base_url: &str) -> CompletionSettings {
    CompletionSettings {
        api_key: TEST_OPENAI_API_KEY.to_string(),
        base_url: base_url.to_string(),
        model: "gpt-3.5-turbo".to_string(),
    }
}

pub fn info_updated_log(address: Address, new_info: &str) -> Log {
    let event = ChatGPTInfoStore::ChatGPTInfoUpdated {
        newInfo: new_info.to_string(),
    };

    Log {
        address,
        data: event.encode_log_data(),
    }
}

/// In-memory `ChainClient`. Accepted transactions bump the reported transaction count the
/// way a node's pending state would.
pub struct StubChainClient {
    nonce: AtomicU64,
    gas_price: u128,
    receipt_status: bool,
    receipt_logs: Vec<Log>,
    pending_polls: AtomicUsize,
    nonce_error: Option<String>,
    send_error: Option<String>,
    receipt_error: Option<String>,
    stored_info: Mutex<String>,
    sent: Mutex<Vec<Bytes>>,
    nonce_queries: AtomicUsize,
    receipt_queries: AtomicUsize,
}

impl StubChainClient {
    pub fn new() -> Self {
        Self {
            nonce: AtomicU64::new(0),
            gas_price: 1_000_000_000,
            receipt_status: true,
            receipt_logs: Vec::new(),
            pending_polls: AtomicUsize::new(0),
            nonce_error: None,
            send_error: None,
            receipt_error: None,
            stored_info: Mutex::new(String::new()),
            sent: Mutex::new(Vec::new()),
            nonce_queries: AtomicUsize::new(0),
            receipt_queries: AtomicUsize::new(0),
        }
    }

    pub fn with_nonce(self, nonce: u64) -> Self {
        self.nonce.store(nonce, Ordering::SeqCst);
        self
    }

    pub fn with_gas_price(mut self, gas_price: u128) -> Self {
        self.gas_price = gas_price;
        self
    }

    pub fn with_receipt_status(mut self, status: bool) -> Self {
        self.receipt_status = status;
        self
    }

    pub fn with_receipt_logs(mut self, logs: Vec<Log>) -> Self {
        self.receipt_logs = logs;
        self
    }

    /// Number of receipt queries answered with `ReceiptNotFound` before the receipt shows up.
    pub fn with_pending_polls(self, polls: usize) -> Self {
        self.pending_polls.store(polls, Ordering::SeqCst);
        self
    }

    pub fn with_nonce_error(mut self, error: &str) -> Self {
        self.nonce_error = Some(error.to_string());
        self
    }

    pub fn with_send_error(mut self, error: &str) -> Self {
        self.send_error = Some(error.to_string());
        self
    }

    pub fn with_receipt_error(mut self, error: &str) -> Self {
        self.receipt_error = Some(error.to_string());
        self
    }

    pub fn with_stored_info(self, info: &str) -> Self {
        *self.stored_info.lock().unwrap() = info.to_string();
        self
    }

    pub fn sent_transactions(&self) -> Vec<Bytes> {
        self.sent.lock().unwrap().clone()
    }

    pub fn nonce_queries(&self) -> usize {
        self.nonce_queries.load(Ordering::SeqCst)
    }

    pub fn receipt_queries(&self) -> usize {
        self.receipt_queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainClient for StubChainClient {
    fn chain_id(&self) -> u64 {
        CHAIN_ID
    }

    async fn transaction_count(&self, _address: Address) -> Result<u64, ChainError> {
        self.nonce_queries.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.nonce_error {
            return Err(ChainError::NetworkConnectivity(err.clone()));
        }

        Ok(self.nonce.load(Ordering::SeqCst))
    }

    async fn gas_price(&self) -> Result<u128, ChainError> {
        Ok(self.gas_price)
    }

    async fn send_raw_transaction(&self, raw_transaction: Bytes) -> Result<TxHash, ChainError> {
        if let Some(err) = &self.send_error {
            return Err(ChainError::Rejected(err.clone()));
        }

        let tx_hash = keccak256(&raw_transaction);
        self.sent.lock().unwrap().push(raw_transaction);
        self.nonce.fetch_add(1, Ordering::SeqCst);

        Ok(tx_hash)
    }

    async fn transaction_receipt(&self, tx_hash: TxHash) -> Result<TxReceipt, ChainError> {
        self.receipt_queries.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.receipt_error {
            return Err(ChainError::NetworkConnectivity(err.clone()));
        }

        let still_pending = self
            .pending_polls
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |polls| {
                polls.checked_sub(1)
            })
            .is_ok();
        if still_pending {
            return Err(ChainError::ReceiptNotFound(tx_hash));
        }

        Ok(TxReceipt {
            transaction_hash: tx_hash,
            block_number: Some(1),
            status: self.receipt_status,
            logs: self.receipt_logs.clone(),
        })
    }

    async fn call(&self, _to: Address, input: Bytes) -> Result<Bytes, ChainError> {
        let getter = ChatGPTInfoStore::encodedChatGPTInfoCall {}.abi_encode();
        if input.as_ref() != getter.as_slice() {
            return Err(ChainError::NetworkConnectivity(
                "execution reverted".to_string(),
            ));
        }

        let stored_info = self.stored_info.lock().unwrap().clone();
        Ok(ChatGPTInfoStore::encodedChatGPTInfoCall::abi_encode_returns(&(stored_info,)).into())
    }
}

pub enum MockCompletion {
    Reply(String),
    Status(u16),
    NoChoices,
}

pub struct RecordedRequest {
    pub authorization: String,
    pub body: Value,
}

pub struct MockCompletionServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockCompletionServer {
    pub fn requests(&self) -> std::sync::MutexGuard<'_, Vec<RecordedRequest>> {
        self.requests.lock().unwrap()
    }
}

#[derive(Clone)]
struct MockState {
    reply: Arc<MockCompletion>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

async fn chat_completions(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let authorization = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    state
        .requests
        .lock()
        .unwrap()
        .push(RecordedRequest { authorization, body });

    match state.reply.as_ref() {
        MockCompletion::Reply(content) => (
            StatusCode::OK,
            Json(json!({
                "id": "chatcmpl-test",
                "object": "chat.completion",
                "model": "gpt-3.5-turbo",
                "choices": [{
                    "index": 0,
                    "message": { "role": "assistant", "content": content },
                    "finish_reason": "stop"
                }]
            })),
        ),
        MockCompletion::Status(status) => (
            StatusCode::from_u16(*status).unwrap(),
            Json(json!({
                "error": {
                    "message": "Incorrect API key provided",
                    "type": "invalid_request_error",
                    "code": "invalid_api_key"
                }
            })),
        ),
        MockCompletion::NoChoices => (
            StatusCode::OK,
            Json(json!({ "id": "chatcmpl-test", "choices": [] })),
        ),
    }
}

/// Serves `POST /v1/chat/completions` on an ephemeral local port.
pub async fn spawn_completion_server(reply: MockCompletion) -> MockCompletionServer {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let state = MockState {
        reply: Arc::new(reply),
        requests: requests.clone(),
    };
    let app = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockCompletionServer {
        base_url: format!("http://{addr}/v1"),
        requests,
    }
}

/// JSON-RPC receipt as returned by `eth_getTransactionReceipt` for a legacy transaction mined
/// in block 2.
pub fn rpc_receipt(tx_hash: TxHash, from: Address, status: bool, logs: &[Log]) -> Value {
    let block_hash = B256::repeat_byte(0xbb);
    let logs: Vec<Value> = logs
        .iter()
        .enumerate()
        .map(|(index, log)| {
            json!({
                "address": log.address,
                "topics": log.data.topics(),
                "data": log.data.data,
                "blockHash": block_hash,
                "blockNumber": "0x2",
                "transactionHash": tx_hash,
                "transactionIndex": "0x0",
                "logIndex": format!("{index:#x}"),
                "removed": false
            })
        })
        .collect();

    json!({
        "type": "0x0",
        "status": if status { "0x1" } else { "0x0" },
        "cumulativeGasUsed": "0x8d5c",
        "logs": logs,
        "logsBloom": Bloom::ZERO,
        "transactionHash": tx_hash,
        "transactionIndex": "0x0",
        "blockHash": block_hash,
        "blockNumber": "0x2",
        "gasUsed": "0x8d5c",
        "effectiveGasPrice": "0x3b9aca00",
        "from": from,
        "to": INFO_STORE_CONTRACT_ADDR,
        "contractAddress": null
    })
}

pub struct MockRpcServer {
    pub url: Url,
    receipt_queries: Arc<AtomicUsize>,
}

impl MockRpcServer {
    pub fn receipt_queries(&self) -> usize {
        self.receipt_queries.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
struct RpcState {
    receipt: Arc<Value>,
    pending_polls: Arc<AtomicUsize>,
    receipt_queries: Arc<AtomicUsize>,
}

async fn json_rpc(State(state): State<RpcState>, Json(request): Json<Value>) -> Json<Value> {
    let result = match request["method"].as_str().unwrap_or_default() {
        "eth_chainId" => json!(format!("{CHAIN_ID:#x}")),
        "eth_getTransactionReceipt" => {
            state.receipt_queries.fetch_add(1, Ordering::SeqCst);
            let still_pending = state
                .pending_polls
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |polls| {
                    polls.checked_sub(1)
                })
                .is_ok();
            if still_pending {
                Value::Null
            } else {
                state.receipt.as_ref().clone()
            }
        }
        method => {
            return Json(json!({
                "jsonrpc": "2.0",
                "id": request["id"],
                "error": { "code": -32601, "message": format!("method {method} not supported") }
            }))
        }
    };

    Json(json!({ "jsonrpc": "2.0", "id": request["id"], "result": result }))
}

/// Serves a JSON-RPC node on an ephemeral local port. It answers `eth_chainId` and answers
/// `eth_getTransactionReceipt` with `null` for the first `pending_polls` queries and with
/// `receipt` afterwards.
pub async fn spawn_rpc_server(receipt: Value, pending_polls: usize) -> MockRpcServer {
    let receipt_queries = Arc::new(AtomicUsize::new(0));
    let state = RpcState {
        receipt: Arc::new(receipt),
        pending_polls: Arc::new(AtomicUsize::new(pending_polls)),
        receipt_queries: receipt_queries.clone(),
    };
    let app = Router::new().route("/", post(json_rpc)).with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockRpcServer {
        url: format!("http://{addr}").parse().unwrap(),
        receipt_queries,
    }
}
