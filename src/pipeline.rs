use alloy::primitives::Address;
use alloy::sol_types::SolCall;
use tracing::{error, info, warn};

use crate::chain::ChainClient;
use crate::completion::CompletionFetcher;
use crate::contract_abi::ChatGPTInfoStore;
use crate::encoding::encode_response_for_onchain;
use crate::errors::{ChainError, SubmitError};
use crate::submitter::{InfoSubmitter, SubmissionReceipt};

/// How a single `update` run ended.
#[derive(Debug)]
pub enum PipelineOutcome {
    /// The completion was stored and the transaction succeeded.
    Updated(SubmissionReceipt),
    /// The transaction was mined but reverted, e.g. because the sender is not the owner.
    Reverted(SubmissionReceipt),
    /// The transaction could not be built, sent or confirmed.
    SubmissionFailed(SubmitError),
    /// The completion API returned nothing, so no transaction was sent.
    NoCompletion,
}

/// Fetches a completion for `prompt`, truncates it and stores it on chain.
pub async fn run_update<C: ChainClient>(
    fetcher: &CompletionFetcher,
    submitter: &InfoSubmitter<'_, C>,
    prompt: &str,
) -> PipelineOutcome {
    let completion = fetcher.fetch(prompt).await;
    if completion.is_empty() {
        warn!("Could not get a response from ChatGPT.");
        return PipelineOutcome::NoCompletion;
    }

    let encoded_info = encode_response_for_onchain(&completion);

    match submitter.submit(&encoded_info).await {
        Ok(receipt) if receipt.success => {
            info!(
                tx_hash = %receipt.tx_hash,
                stored_info = receipt.stored_info.as_deref().unwrap_or_default(),
                "On-chain info updated successfully!"
            );
            PipelineOutcome::Updated(receipt)
        }
        Ok(receipt) => {
            error!(tx_hash = %receipt.tx_hash, "Transaction failed!");
            PipelineOutcome::Reverted(receipt)
        }
        Err(err) => {
            error!("Error updating on-chain info: {err}");
            PipelineOutcome::SubmissionFailed(err)
        }
    }
}

/// Reads the value currently held by `encodedChatGPTInfo()`.
pub async fn read_stored_info<C: ChainClient>(
    chain: &C,
    contract_address: Address,
) -> Result<String, ChainError> {
    let call = ChatGPTInfoStore::encodedChatGPTInfoCall {};
    let output = chain
        .call(contract_address, call.abi_encode().into())
        .await?;

    let decoded = ChatGPTInfoStore::encodedChatGPTInfoCall::abi_decode_returns(&output, true)
        .map_err(|err| ChainError::AbiDecode(err.to_string()))?;

    Ok(decoded._0)
}
