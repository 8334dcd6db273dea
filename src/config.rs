use std::ffi::OsString;

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use anyhow::{anyhow, Context, Result};
use config::builder::DefaultState;
use config::{self, ConfigBuilder, ConfigError, Environment, File, Map};
use reqwest::Url;
use serde::Deserialize;

use crate::constants::{DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL};

pub struct ConfigManager {
    path: Option<String>,
}

/// Raw settings as read from the config file and the environment. Keys are the lowercased
/// environment variable names, e.g. `RPC_URL` becomes `rpc_url`.
#[derive(Deserialize)]
pub struct Config {
    pub rpc_url: String,
    pub chatgpt_info_store_address: String,
    pub private_key: Option<String>,
    pub openai_api_key: Option<String>,
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
}

#[derive(Clone, Debug)]
pub struct ChainSettings {
    pub rpc_url: Url,
    pub contract_address: Address,
}

#[derive(Clone)]
pub struct CompletionSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

fn default_openai_base_url() -> String {
    DEFAULT_OPENAI_BASE_URL.to_string()
}

fn default_openai_model() -> String {
    DEFAULT_OPENAI_MODEL.to_string()
}

impl ConfigManager {
    pub fn new(path: Option<String>) -> ConfigManager {
        ConfigManager { path }
    }

    /// Loads the optional config file, then overlays the process environment.
    pub fn load_config(&self) -> Result<Config, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = &self.path {
            builder = builder.add_source(File::with_name(path));
        }

        let vars = utf8_vars(std::env::vars_os());
        deserialize(builder.add_source(environment(vars)))
    }
}

/// Keeps the variables whose name and value are both valid UTF-8. Other variables cannot
/// hold any of our settings and are skipped.
fn utf8_vars(vars: impl IntoIterator<Item = (OsString, OsString)>) -> Map<String, String> {
    vars.into_iter()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect()
}

fn environment(vars: Map<String, String>) -> Environment {
    Environment::default().try_parsing(false).source(Some(vars))
}

fn deserialize(builder: ConfigBuilder<DefaultState>) -> Result<Config, ConfigError> {
    builder.build()?.try_deserialize()
}

impl Config {
    pub fn chain_settings(&self) -> Result<ChainSettings> {
        let rpc_url = self
            .rpc_url
            .parse()
            .with_context(|| format!("Failed to parse RPC URL {:?}", self.rpc_url))?;
        let contract_address = self
            .chatgpt_info_store_address
            .parse()
            .with_context(|| {
                format!(
                    "Failed to parse contract address {:?}",
                    self.chatgpt_info_store_address
                )
            })?;

        Ok(ChainSettings {
            rpc_url,
            contract_address,
        })
    }

    pub fn signer(&self) -> Result<PrivateKeySigner> {
        let private_key = self
            .private_key
            .as_deref()
            .ok_or_else(|| anyhow!("PRIVATE_KEY is not set"))?;

        private_key
            .trim()
            .parse::<PrivateKeySigner>()
            .context("Failed to create signer from private key")
    }

    pub fn completion_settings(&self) -> Result<CompletionSettings> {
        let api_key = self
            .openai_api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| anyhow!("OPENAI_API_KEY is not set"))?;

        Ok(CompletionSettings {
            api_key,
            base_url: self.openai_base_url.clone(),
            model: self.openai_model.clone(),
        })
    }
}
