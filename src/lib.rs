pub mod args;
pub mod chain;
pub mod completion;
pub mod config;
pub mod constants;
pub mod contract_abi;
pub mod encoding;
pub mod errors;
pub mod pipeline;
pub mod submitter;

#[cfg(test)]
mod test_util;

pub use chain::{ChainClient, HttpChainClient, TxReceipt};
pub use completion::CompletionFetcher;
pub use encoding::encode_response_for_onchain;
pub use pipeline::{read_stored_info, run_update, PipelineOutcome};
pub use submitter::{InfoSubmitter, SubmissionReceipt};
