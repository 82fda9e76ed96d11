//! Subsidy Relay CLI
//!
//! Operator front end for the orchestration layer: submit an intent and wait
//! for its confirmation, re-poll a transaction after a timeout, compute the
//! metadata hash of a payload, verify a programme's committed hash, and list
//! the signer's accounts.
//!
//! ## Usage
//!
//! ```bash
//! subsidy-relay --config relay.toml submit --intent @intent.json
//! subsidy-relay status --tx 0xabc... --kind create_program
//! subsidy-relay hash --intent '{"type":"approve_claim","payload":{"claimId":3}}'
//! ```
//!
//! The config path can also come from `SUBSIDY_RELAY_CONFIG_PATH`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use subsidy_relay::{
    account::AccountWatcher,
    chain::{ChainClient, EvmChainClient, TxHash, TxLanding},
    config::{RelayConfig, CONFIG_PATH_ENV},
    domain::ProgramPayload,
    encoder::encode_intent,
    integrity::verify_program_metadata,
    intent::{ChainIntent, IntentKind},
    orchestrator::{OrchestratorError, PendingTransaction, TransactionOrchestrator},
};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "subsidy-relay")]
#[command(about = "Submits and confirms subsidy programme transactions")]
struct Args {
    /// Path to relay configuration file (default: relay.toml or SUBSIDY_RELAY_CONFIG_PATH env var)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode, submit and confirm one intent
    Submit {
        /// Intent JSON, or @path to a file holding it
        #[arg(long)]
        intent: String,
    },
    /// Resume waiting on an already-broadcast transaction
    Status {
        #[arg(long)]
        tx: String,
        /// Intent kind, e.g. create_program
        #[arg(long)]
        kind: String,
        /// Overrides orchestrator.receipt_timeout_ms
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Print the encoded call and metadata hash of an intent (offline)
    Hash {
        #[arg(long)]
        intent: String,
    },
    /// Compare a stored programme payload with the hash committed on-chain
    Verify {
        #[arg(long)]
        program_id: u64,
        /// Programme payload JSON, or @path
        #[arg(long)]
        payload: String,
    },
    /// List the accounts the wallet exposes
    Accounts,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.json_logs {
        tracing_subscriber::fmt().json().init();
    } else {
        tracing_subscriber::fmt::init();
    }

    match args.command {
        Command::Hash { intent } => {
            let intent: ChainIntent = parse_json_arg(&intent, "intent")?;
            let encoded = encode_intent(&intent)?;
            print_json(&encoded)
        }
        Command::Submit { intent } => {
            let intent: ChainIntent = parse_json_arg(&intent, "intent")?;
            // Fail on bad input before touching the network.
            let encoded = encode_intent(&intent)?;
            info!("Metadata hash: {}", encoded.metadata_hash);

            let config = load_config(args.config.as_deref())?;
            let client = connect(&config).await?;
            let watcher = AccountWatcher::new();
            let poller = config
                .wallet
                .as_ref()
                .map(|wallet| watcher.spawn_poller(client.clone(), wallet.account_poll_interval()));

            let orchestrator =
                TransactionOrchestrator::new(client, watcher, config.orchestrator.clone());
            let result = orchestrator.execute_encoded(encoded).await;
            if let Some(poller) = poller {
                poller.abort();
            }

            match result {
                Ok(confirmation) => print_json(&confirmation),
                Err(e @ OrchestratorError::ReceiptTimedOut { .. }) => {
                    if let Some(pending) = e.pending() {
                        warn!(
                            "Still pending. Re-poll with: subsidy-relay status --tx {} --kind {}",
                            pending.tx_hash, pending.kind
                        );
                    }
                    Err(e.into())
                }
                Err(e) => Err(e.into()),
            }
        }
        Command::Status {
            tx,
            kind,
            timeout_ms,
        } => {
            let kind: IntentKind = kind.parse()?;
            let tx_hash = TxHash::new(&tx);
            let config = load_config(args.config.as_deref())?;
            let client = connect(&config).await?;

            match client.transaction_landed(&tx_hash).await? {
                TxLanding::Unknown => anyhow::bail!(
                    "Transaction {} is unknown to the node; it was dropped or never broadcast",
                    tx_hash
                ),
                TxLanding::Pending => info!("Transaction {} is in the mempool, waiting", tx_hash),
                TxLanding::Mined => info!("Transaction {} is mined, fetching receipt", tx_hash),
            }

            let timeout = timeout_ms
                .map(Duration::from_millis)
                .unwrap_or_else(|| config.orchestrator.receipt_timeout());
            let orchestrator = TransactionOrchestrator::new(
                client,
                AccountWatcher::new(),
                config.orchestrator.clone(),
            );
            let pending = PendingTransaction::recovered(tx_hash, kind);
            let confirmation = orchestrator.repoll(&pending, timeout).await?;
            print_json(&confirmation)
        }
        Command::Verify {
            program_id,
            payload,
        } => {
            let payload: ProgramPayload = parse_json_arg(&payload, "payload")?;
            let config = load_config(args.config.as_deref())?;
            let client = connect(&config).await?;
            let report = verify_program_metadata(client.as_ref(), program_id, &payload).await?;
            print_json(&report)?;
            if !report.matches {
                anyhow::bail!("Programme {} metadata does not match its on-chain hash", program_id);
            }
            Ok(())
        }
        Command::Accounts => {
            let config = load_config(args.config.as_deref())?;
            let client = connect(&config).await?;
            for account in client.accounts().await? {
                println!("{}", account);
            }
            Ok(())
        }
    }
}

fn load_config(path: Option<&str>) -> Result<RelayConfig> {
    // Priority: CLI arg > env var > default
    match path {
        Some(path) => info!("Loading configuration from: {}", path),
        None => match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => info!("Loading configuration from {}: {}", CONFIG_PATH_ENV, path),
            Err(_) => info!("Loading configuration from default location"),
        },
    }
    let config = RelayConfig::load_from_path(path)?;
    info!(
        "Chain: {} (chain ID: {}), contract {}",
        config.chain.name, config.chain.chain_id, config.chain.contract_addr
    );
    Ok(config)
}

/// Builds the chain client and checks the node serves the configured chain.
async fn connect(config: &RelayConfig) -> Result<Arc<EvmChainClient>> {
    let client = EvmChainClient::from_config(config)?;
    let chain_id = client
        .node()
        .get_chain_id()
        .await
        .with_context(|| format!("Failed to query chain ID from {}", config.chain.rpc_url))?;
    if chain_id != config.chain.chain_id {
        anyhow::bail!(
            "Node at {} serves chain {} but config expects {}",
            config.chain.rpc_url,
            chain_id,
            config.chain.chain_id
        );
    }
    if config.wallet.is_none() {
        info!("No wallet configured; running read-only");
    }
    Ok(Arc::new(client))
}

fn parse_json_arg<T: serde::de::DeserializeOwned>(value: &str, what: &str) -> Result<T> {
    let text = match value.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {} file: {}", what, path))?,
        None => value.to_string(),
    };
    serde_json::from_str(&text).with_context(|| format!("Invalid {} JSON", what))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
