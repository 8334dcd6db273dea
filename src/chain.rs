use alloy::eips::BlockId;
use alloy::network::{ReceiptResponse, TransactionBuilder};
use alloy::primitives::{Address, Bytes, Log, TxHash};
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::rpc::types::TransactionRequest;
use alloy::transports::http::reqwest::Client;
use alloy::transports::http::Http;
use async_trait::async_trait;
use tracing::debug;

use crate::config::ChainSettings;
use crate::errors::ChainError;

type HttpProvider = RootProvider<Http<Client>>;

/// The parts of a transaction receipt the submitter inspects.
#[derive(Clone, Debug)]
pub struct TxReceipt {
    pub transaction_hash: TxHash,
    pub block_number: Option<u64>,
    pub status: bool,
    pub logs: Vec<Log>,
}

/// JSON-RPC calls needed to read and update the info store.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Chain id of the connected network, used for replay protected signing.
    fn chain_id(&self) -> u64;

    async fn transaction_count(&self, address: Address) -> Result<u64, ChainError>;

    async fn gas_price(&self) -> Result<u128, ChainError>;

    /// Broadcasts a signed EIP-2718 encoded transaction and returns its hash.
    async fn send_raw_transaction(&self, raw_transaction: Bytes) -> Result<TxHash, ChainError>;

    /// Returns `ChainError::ReceiptNotFound` while the transaction is not yet included.
    async fn transaction_receipt(&self, tx_hash: TxHash) -> Result<TxReceipt, ChainError>;

    /// Executes a read-only call against the latest block.
    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, ChainError>;
}

/// `ChainClient` backed by an HTTP JSON-RPC node.
pub struct HttpChainClient {
    provider: HttpProvider,
    chain_id: u64,
}

impl HttpChainClient {
    /// Connects to the node and reads its chain id. An unreachable node is reported as
    /// `ChainError::NetworkConnectivity`.
    pub async fn connect(settings: &ChainSettings) -> Result<Self, ChainError> {
        if !matches!(settings.rpc_url.scheme(), "http" | "https") {
            return Err(ChainError::InvalidRpcUrl(format!(
                "unsupported scheme {:?}, expected http or https",
                settings.rpc_url.scheme()
            )));
        }

        let provider = ProviderBuilder::new().on_http(settings.rpc_url.clone());
        let chain_id = provider.get_chain_id().await.map_err(|err| {
            ChainError::NetworkConnectivity(format!(
                "Failed to connect to {}. Error: {err}",
                settings.rpc_url
            ))
        })?;
        debug!(chain_id, rpc_url = %settings.rpc_url, "Connected to JSON-RPC node");

        Ok(Self { provider, chain_id })
    }
}

#[async_trait]
impl ChainClient for HttpChainClient {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn transaction_count(&self, address: Address) -> Result<u64, ChainError> {
        self.provider
            .get_transaction_count(address)
            .block_id(BlockId::latest())
            .await
            .map_err(|err| ChainError::NetworkConnectivity(err.to_string()))
    }

    async fn gas_price(&self) -> Result<u128, ChainError> {
        self.provider
            .get_gas_price()
            .await
            .map_err(|err| ChainError::NetworkConnectivity(err.to_string()))
    }

    async fn send_raw_transaction(&self, raw_transaction: Bytes) -> Result<TxHash, ChainError> {
        let pending_txn = self
            .provider
            .send_raw_transaction(&raw_transaction)
            .await
            .map_err(|err| ChainError::Rejected(err.to_string()))?;

        Ok(*pending_txn.tx_hash())
    }

    async fn transaction_receipt(&self, tx_hash: TxHash) -> Result<TxReceipt, ChainError> {
        let receipt = self
            .provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(|err| {
                ChainError::NetworkConnectivity(format!(
                    "Failed to get transaction receipt. Error: {err}"
                ))
            })?
            .ok_or(ChainError::ReceiptNotFound(tx_hash))?;

        Ok(TxReceipt {
            transaction_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            status: ReceiptResponse::status(&receipt),
            logs: receipt
                .inner
                .logs()
                .iter()
                .map(|log| log.inner.clone())
                .collect(),
        })
    }

    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, ChainError> {
        let request = TransactionRequest::default()
            .with_to(to)
            .with_input(input);

        self.provider
            .call(&request)
            .await
            .map_err(|err| ChainError::NetworkConnectivity(err.to_string()))
    }
}
