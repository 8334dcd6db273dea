use std::time::Duration;

use alloy::eips::eip2718::Encodable2718;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, TxHash};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::{SolCall, SolEvent};
use tokio_retry::strategy::FixedInterval;
use tokio_retry::RetryIf;
use tracing::{debug, info};

use crate::chain::{ChainClient, TxReceipt};
use crate::constants::{RECEIPT_POLL_INTERVAL_MS, UPDATE_INFO_GAS_LIMIT};
use crate::contract_abi::ChatGPTInfoStore;
use crate::errors::{parse_send_error, ChainError, SubmitError};

/// Result of an `updateInfo` transaction that made it into a block.
#[derive(Clone, Debug)]
pub struct SubmissionReceipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub success: bool,
    /// Value carried by the `ChatGPTInfoUpdated` event, if the contract emitted one.
    pub stored_info: Option<String>,
}

/// Writes encoded completions to a `ChatGPTInfoStore` contract.
///
/// Every submission reads the sender's transaction count right before building the
/// transaction. Nothing stops another sender using the same key from taking that nonce in
/// between; the node then rejects the transaction with `SubmitError::NonceTooLow`.
pub struct InfoSubmitter<'a, C: ChainClient> {
    chain: &'a C,
    wallet: EthereumWallet,
    sender: Address,
    contract_address: Address,
    receipt_timeout: Option<Duration>,
}

impl<'a, C: ChainClient> InfoSubmitter<'a, C> {
    /// # Arguments
    /// * `chain` - The connected JSON-RPC client
    /// * `private_signer` - Key of the account that owns the contract
    /// * `contract_address` - Address of the deployed info store
    /// * `receipt_timeout` - Upper bound on the wait for inclusion, `None` waits forever
    pub fn new(
        chain: &'a C,
        private_signer: PrivateKeySigner,
        contract_address: Address,
        receipt_timeout: Option<Duration>,
    ) -> Self {
        let sender = private_signer.address();

        Self {
            chain,
            wallet: EthereumWallet::from(private_signer),
            sender,
            contract_address,
            receipt_timeout,
        }
    }

    pub fn sender(&self) -> Address {
        self.sender
    }

    /// Calls `updateInfo(encoded_info)` and blocks until the transaction is included.
    ///
    /// A transaction that is mined but reverted is not an error: the returned receipt has
    /// `success == false`.
    ///
    /// # Errors
    /// * `SubmitError::Nonce`, `SubmitError::GasPrice` - The node could not be queried
    /// * `SubmitError::Sign` - The transaction could not be built or signed
    /// * `SubmitError::NonceTooLow` and the other send kinds - The node rejected the
    ///   transaction
    /// * `SubmitError::Receipt` - Polling for the receipt failed
    /// * `SubmitError::ReceiptTimeout` - The transaction was not included in time. It may
    ///   still be mined later.
    pub async fn submit(&self, encoded_info: &str) -> Result<SubmissionReceipt, SubmitError> {
        info!("Attempting to update on-chain info with: {encoded_info}");

        let raw_transaction = self.build_signed_transaction(encoded_info).await?;

        let tx_hash = self
            .chain
            .send_raw_transaction(raw_transaction)
            .await
            .map_err(|err| match err {
                ChainError::Rejected(msg) => parse_send_error(msg),
                err => SubmitError::Send(err.to_string()),
            })?;
        info!("Transaction sent. Tx Hash: {tx_hash}");

        let receipt = self.wait_for_receipt(tx_hash).await?;
        info!(
            block_number = ?receipt.block_number,
            "Transaction mined. Status: {}",
            u8::from(receipt.status)
        );

        Ok(SubmissionReceipt {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            success: receipt.status,
            stored_info: self.stored_info(&receipt),
        })
    }

    /// Builds the legacy `updateInfo` transaction with the current nonce and gas price and
    /// returns it signed and EIP-2718 encoded.
    async fn build_signed_transaction(&self, encoded_info: &str) -> Result<Bytes, SubmitError> {
        let nonce = self
            .chain
            .transaction_count(self.sender)
            .await
            .map_err(SubmitError::Nonce)?;
        let gas_price = self.chain.gas_price().await.map_err(SubmitError::GasPrice)?;

        let call = ChatGPTInfoStore::updateInfoCall {
            _newInfo: encoded_info.to_string(),
        };

        let transaction_request = TransactionRequest::default()
            .with_from(self.sender)
            .with_to(self.contract_address)
            .with_input(call.abi_encode())
            .with_nonce(nonce)
            .with_chain_id(self.chain.chain_id())
            .with_gas_limit(UPDATE_INFO_GAS_LIMIT)
            .with_gas_price(gas_price);
        debug!(nonce, gas_price, "Built updateInfo transaction");

        let envelope = transaction_request
            .build(&self.wallet)
            .await
            .map_err(|err| SubmitError::Sign(err.to_string()))?;

        Ok(envelope.encoded_2718().into())
    }

    /// Polls for the receipt until the node returns one, the poll fails for a reason other
    /// than the receipt being absent, or the timeout expires.
    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TxReceipt, SubmitError> {
        let poll = RetryIf::spawn(
            FixedInterval::from_millis(RECEIPT_POLL_INTERVAL_MS),
            || self.chain.transaction_receipt(tx_hash),
            |err: &ChainError| matches!(err, ChainError::ReceiptNotFound(_)),
        );

        let receipt = match self.receipt_timeout {
            Some(timeout) => tokio::time::timeout(timeout, poll).await.map_err(|_| {
                SubmitError::ReceiptTimeout {
                    tx_hash,
                    timeout_sec: timeout.as_secs(),
                }
            })?,
            None => poll.await,
        };

        receipt.map_err(|source| SubmitError::Receipt { tx_hash, source })
    }

    fn stored_info(&self, receipt: &TxReceipt) -> Option<String> {
        receipt
            .logs
            .iter()
            .filter(|log| log.address == self.contract_address)
            .find_map(|log| {
                ChatGPTInfoStore::ChatGPTInfoUpdated::decode_log_data(&log.data, true).ok()
            })
            .map(|event| event.newInfo)
    }
}
