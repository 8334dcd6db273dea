use alloy::primitives::TxHash;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Request to completion API failed. Error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Completion API returned status {status}. Body: {body}")]
    Api { status: u16, body: String },
    #[error("Completion API returned no message content")]
    EmptyResponse,
}

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("Invalid RPC URL. Error: {0}")]
    InvalidRpcUrl(String),
    #[error("Network connectivity issue. Error: {0}")]
    NetworkConnectivity(String),
    #[error("Receipt not found for transaction {0}")]
    ReceiptNotFound(TxHash),
    #[error("Node rejected the transaction. Error: {0}")]
    Rejected(String),
    #[error("Failed to decode contract return data. Error: {0}")]
    AbiDecode(String),
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Failed to fetch nonce. Error: {0}")]
    Nonce(ChainError),
    #[error("Failed to fetch gas price. Error: {0}")]
    GasPrice(ChainError),
    #[error("Failed to sign transaction. Error: {0}")]
    Sign(String),
    #[error("Nonce too low. Error: {0}")]
    NonceTooLow(String),
    #[error("Nonce too high. Error: {0}")]
    NonceTooHigh(String),
    #[error("Insufficient balance in wallet. Error: {0}")]
    InsufficientBalance(String),
    #[error("Gas price low. Error: {0}")]
    GasPriceLow(String),
    #[error("Out of gas. Error: {0}")]
    OutOfGas(String),
    #[error("Failed to send transaction. Error: {0}")]
    Send(String),
    #[error("Failed to get receipt for transaction {tx_hash}. Error: {source}")]
    Receipt {
        tx_hash: TxHash,
        #[source]
        source: ChainError,
    },
    #[error("Timed out after {timeout_sec}s waiting for receipt of transaction {tx_hash}")]
    ReceiptTimeout { tx_hash: TxHash, timeout_sec: u64 },
}

/// Maps the error message returned by the node for `eth_sendRawTransaction` onto a
/// `SubmitError` kind.
pub fn parse_send_error(error: String) -> SubmitError {
    let error_lowercase = error.to_lowercase();

    if error_lowercase.contains("nonce too low") || error_lowercase.contains("already known") {
        return SubmitError::NonceTooLow(error);
    }
    if error_lowercase.contains("nonce too high") {
        return SubmitError::NonceTooHigh(error);
    }
    if error_lowercase.contains("insufficient funds") {
        return SubmitError::InsufficientBalance(error);
    }
    if error_lowercase.contains("underpriced")
        || error_lowercase.contains("max fee per gas less than block base fee")
    {
        return SubmitError::GasPriceLow(error);
    }
    if error_lowercase.contains("intrinsic gas too low") || error_lowercase.contains("out of gas")
    {
        return SubmitError::OutOfGas(error);
    }

    SubmitError::Send(error)
}
