//! Relay configuration
//!
//! Loaded from a TOML file with `SUBSIDY_RELAY__SECTION__KEY` environment
//! overrides. Path priority: explicit path > `SUBSIDY_RELAY_CONFIG_PATH` >
//! `relay.toml` in the working directory.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const CONFIG_PATH_ENV: &str = "SUBSIDY_RELAY_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "relay.toml";
const ENV_PREFIX: &str = "SUBSIDY_RELAY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    pub chain: ChainConfig,
    /// Absent when running read-only.
    #[serde(default)]
    pub wallet: Option<WalletConfig>,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

/// Read-only node and the deployed subsidy contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub name: String,
    pub rpc_url: String,
    pub chain_id: u64,
    pub contract_addr: String,
}

/// JSON-RPC provider that signs `eth_sendTransaction` for its own accounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    pub rpc_url: String,
    #[serde(default = "default_account_poll_interval_ms")]
    pub account_poll_interval_ms: u64,
}

impl WalletConfig {
    pub fn account_poll_interval(&self) -> Duration {
        Duration::from_millis(self.account_poll_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// How long one receipt wait lasts before giving up (ms)
    #[serde(default = "default_receipt_timeout_ms")]
    pub receipt_timeout_ms: u64,
    /// Delay between receipt polls (ms)
    #[serde(default = "default_receipt_poll_interval_ms")]
    pub receipt_poll_interval_ms: u64,
    /// Attempts for view calls that fail at the transport level
    #[serde(default = "default_read_attempts")]
    pub read_attempts: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            receipt_timeout_ms: default_receipt_timeout_ms(),
            receipt_poll_interval_ms: default_receipt_poll_interval_ms(),
            read_attempts: default_read_attempts(),
        }
    }
}

impl OrchestratorConfig {
    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_millis(self.receipt_timeout_ms)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }
}

fn default_receipt_timeout_ms() -> u64 {
    120_000
}

fn default_receipt_poll_interval_ms() -> u64 {
    2_000
}

fn default_read_attempts() -> u32 {
    3
}

fn default_account_poll_interval_ms() -> u64 {
    1_000
}

impl RelayConfig {
    /// Loads from `SUBSIDY_RELAY_CONFIG_PATH` or `relay.toml`.
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    pub fn load_from_path(path: Option<&str>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_string(),
            None => std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string()),
        };

        if !Path::new(&path).exists() {
            anyhow::bail!("Config file not found: {}", path);
        }

        let settings = config::Config::builder()
            .add_source(config::File::from(Path::new(&path)))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: RelayConfig = settings
            .try_deserialize()
            .with_context(|| format!("Failed to parse config file: {}", path))?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates an in-memory TOML document.
    pub fn from_toml_str(document: &str) -> Result<Self> {
        let config: RelayConfig = toml::from_str(document).context("Failed to parse TOML config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.chain.rpc_url)
            .with_context(|| format!("Invalid chain.rpc_url: {}", self.chain.rpc_url))?;

        let contract = self.chain.contract_addr.trim();
        let contract_hex = contract.strip_prefix("0x").unwrap_or(contract);
        if contract_hex.len() != 40 || hex::decode(contract_hex).is_err() {
            anyhow::bail!(
                "Invalid chain.contract_addr: {} (expected 20-byte hex address)",
                self.chain.contract_addr
            );
        }

        if let Some(wallet) = &self.wallet {
            url::Url::parse(&wallet.rpc_url)
                .with_context(|| format!("Invalid wallet.rpc_url: {}", wallet.rpc_url))?;
            if wallet.account_poll_interval_ms == 0 {
                anyhow::bail!("wallet.account_poll_interval_ms must be greater than zero");
            }
        }

        let orchestrator = &self.orchestrator;
        if orchestrator.receipt_timeout_ms == 0 {
            anyhow::bail!("orchestrator.receipt_timeout_ms must be greater than zero");
        }
        if orchestrator.receipt_poll_interval_ms == 0 {
            anyhow::bail!("orchestrator.receipt_poll_interval_ms must be greater than zero");
        }
        if orchestrator.receipt_poll_interval_ms >= orchestrator.receipt_timeout_ms {
            anyhow::bail!(
                "orchestrator.receipt_poll_interval_ms ({}) must be shorter than receipt_timeout_ms ({})",
                orchestrator.receipt_poll_interval_ms,
                orchestrator.receipt_timeout_ms
            );
        }
        if orchestrator.read_attempts == 0 {
            anyhow::bail!("orchestrator.read_attempts must be at least 1");
        }

        Ok(())
    }
}
