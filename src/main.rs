use std::time::Duration;

use anyhow::{Context, Result};
use chatgpt_info_store::args::{Cli, Commands, UpdateArgs};
use chatgpt_info_store::config::{Config, ConfigManager};
use chatgpt_info_store::{
    read_stored_info, run_update, ChainClient, CompletionFetcher, HttpChainClient, InfoSubmitter,
};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn setup_logging() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // a missing .env file is fine, the variables may come from the environment
    dotenv::dotenv().ok();

    setup_logging();

    let cli = Cli::parse();

    let result = match ConfigManager::new(cli.config).load_config() {
        Ok(config) => match cli.command.unwrap_or(Commands::Update(UpdateArgs::default())) {
            Commands::Update(args) => run_update_command(&config, args).await,
            Commands::Read => run_read_command(&config).await,
        },
        Err(e) => Err(e).context("Failed to load configuration"),
    };

    if let Err(e) = result {
        tracing::error!("Error: {e:#}");
        std::process::exit(1);
    }

    Ok(())
}

async fn run_update_command(config: &Config, args: UpdateArgs) -> Result<()> {
    let chain_settings = config.chain_settings()?;
    let signer = config.signer()?;
    let mut completion_settings = config.completion_settings()?;
    if let Some(model) = args.model {
        completion_settings.model = model;
    }

    let chain = HttpChainClient::connect(&chain_settings)
        .await
        .context("Failed to connect to Web3 provider!")?;

    let receipt_timeout =
        (args.receipt_timeout_secs > 0).then(|| Duration::from_secs(args.receipt_timeout_secs));
    let submitter = InfoSubmitter::new(
        &chain,
        signer,
        chain_settings.contract_address,
        receipt_timeout,
    );
    info!(
        chain_id = chain.chain_id(),
        "Connected to blockchain. Account: {}",
        submitter.sender()
    );

    let fetcher = CompletionFetcher::new(completion_settings, args.system_prompt);
    info!(model = fetcher.model(), "Requesting completion");

    let outcome = run_update(&fetcher, &submitter, &args.prompt).await;
    tracing::debug!(?outcome, "Update finished");

    info!("Script finished.");
    Ok(())
}

async fn run_read_command(config: &Config) -> Result<()> {
    let chain_settings = config.chain_settings()?;
    let chain = HttpChainClient::connect(&chain_settings)
        .await
        .context("Failed to connect to Web3 provider!")?;

    let info = read_stored_info(&chain, chain_settings.contract_address)
        .await
        .context("Failed to read encodedChatGPTInfo")?;
    info!(contract = %chain_settings.contract_address, "Stored info: {info}");

    Ok(())
}
