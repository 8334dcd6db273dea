use clap::{Args, Parser, Subcommand};

use crate::constants::{DEFAULT_PROMPT, DEFAULT_RECEIPT_TIMEOUT_SEC, DEFAULT_SYSTEM_PROMPT};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Stores a ChatGPT completion in the ChatGPTInfoStore contract"
)]
pub struct Cli {
    /// Optional config file (TOML, YAML or JSON). Environment variables take precedence.
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch a completion and write it on chain (default)
    Update(UpdateArgs),
    /// Print the info currently stored in the contract
    Read,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Prompt sent to the completion API
    #[arg(short, long, default_value = DEFAULT_PROMPT)]
    pub prompt: String,

    /// Model identifier, overrides OPENAI_MODEL
    #[arg(short, long)]
    pub model: Option<String>,

    /// System instruction sent ahead of the prompt
    #[arg(long, default_value = DEFAULT_SYSTEM_PROMPT)]
    pub system_prompt: String,

    /// Seconds to wait for the transaction receipt, 0 waits indefinitely
    #[arg(long, default_value_t = DEFAULT_RECEIPT_TIMEOUT_SEC)]
    pub receipt_timeout_secs: u64,
}

impl Default for UpdateArgs {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            model: None,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            receipt_timeout_secs: DEFAULT_RECEIPT_TIMEOUT_SEC,
        }
    }
}
