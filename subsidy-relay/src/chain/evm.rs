//! JSON-RPC implementation of `ChainClient`
//!
//! Holds a read-only node connection for queries and receipt polling and,
//! when a signer is configured, a second connection to the wallet provider
//! that owns the accounts and answers `eth_sendTransaction`.

use async_trait::async_trait;
use chain_clients_common::normalize_hex;
use chain_clients_evm::abi::{decode_args, encode_call, AbiValue};
use chain_clients_evm::error::{UNAUTHORIZED_CODE, USER_REJECTED_CODE};
use chain_clients_evm::{EvmClient, RpcError, TransactionReceipt, TransactionRequest};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{CallSpec, ChainClient, TxHash, TxLanding};
use crate::account::Account;
use crate::config::RelayConfig;
use crate::encoder::EncodedCall;
use crate::error::ChainError;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
const READ_RETRY_DELAY: Duration = Duration::from_millis(500);

pub struct EvmChainClient {
    node: EvmClient,
    wallet: Option<EvmClient>,
    contract_addr: String,
    receipt_poll_interval: Duration,
    read_attempts: u32,
}

impl EvmChainClient {
    /// Read-only client. Submissions fail with `WalletUnavailable` until a
    /// wallet is attached.
    pub fn new(node_url: &str, contract_addr: &str) -> Result<Self, ChainError> {
        Ok(Self {
            node: EvmClient::new(node_url).map_err(|e| map_rpc_error("client", e))?,
            wallet: None,
            contract_addr: normalize_hex(contract_addr),
            receipt_poll_interval: DEFAULT_POLL_INTERVAL,
            read_attempts: 1,
        })
    }

    pub fn from_config(config: &RelayConfig) -> Result<Self, ChainError> {
        let mut client = Self::new(&config.chain.rpc_url, &config.chain.contract_addr)?
            .with_receipt_poll_interval(config.orchestrator.receipt_poll_interval())
            .with_read_attempts(config.orchestrator.read_attempts);
        if let Some(wallet) = &config.wallet {
            client = client.with_wallet(&wallet.rpc_url)?;
        }
        Ok(client)
    }

    pub fn with_wallet(mut self, wallet_url: &str) -> Result<Self, ChainError> {
        self.wallet = Some(EvmClient::new(wallet_url).map_err(|e| map_rpc_error("client", e))?);
        Ok(self)
    }

    pub fn with_receipt_poll_interval(mut self, interval: Duration) -> Self {
        self.receipt_poll_interval = interval;
        self
    }

    pub fn with_read_attempts(mut self, attempts: u32) -> Self {
        self.read_attempts = attempts.max(1);
        self
    }

    /// The underlying node connection.
    pub fn node(&self) -> &EvmClient {
        &self.node
    }

    fn wallet(&self) -> Result<&EvmClient, ChainError> {
        self.wallet.as_ref().ok_or(ChainError::WalletUnavailable)
    }
}

/// Maps transport-crate errors onto the chain taxonomy. Wallet error codes
/// follow EIP-1193.
pub fn map_rpc_error(method: &str, error: RpcError) -> ChainError {
    if error.is_transport() {
        return ChainError::Network(error.to_string());
    }
    match error {
        RpcError::Rpc { code, .. } if code == USER_REJECTED_CODE => ChainError::UserRejected,
        RpcError::Rpc { code, .. } if code == UNAUTHORIZED_CODE => ChainError::AccountUnresolved,
        RpcError::Rpc { code, message, .. } => ChainError::Rpc {
            method: method.to_string(),
            code,
            message,
        },
        other => ChainError::Decode {
            context: method.to_string(),
            reason: other.to_string(),
        },
    }
}

fn parse_accounts(raw: Vec<String>) -> Result<Vec<Account>, ChainError> {
    raw.iter()
        .map(|address| {
            address.parse::<Account>().map_err(|e| ChainError::Decode {
                context: "account list".to_string(),
                reason: e.to_string(),
            })
        })
        .collect()
}

#[async_trait]
impl ChainClient for EvmChainClient {
    fn contract_address(&self) -> &str {
        &self.contract_addr
    }

    async fn read(&self, call: &CallSpec) -> Result<Vec<AbiValue>, ChainError> {
        let calldata = encode_call(call.function, &call.args);
        let mut attempt = 1;
        let output = loop {
            match self.node.call(&self.contract_addr, &calldata).await {
                Ok(output) => break output,
                Err(e) if e.is_transport() && attempt < self.read_attempts => {
                    warn!(
                        "Read {} failed (attempt {}/{}): {}",
                        call.function, attempt, self.read_attempts, e
                    );
                    attempt += 1;
                    tokio::time::sleep(READ_RETRY_DELAY).await;
                }
                Err(e) => return Err(map_rpc_error("eth_call", e)),
            }
        };

        decode_args(&output, &call.returns).map_err(|e| ChainError::Decode {
            context: call.function.to_string(),
            reason: e.to_string(),
        })
    }

    async fn accounts(&self) -> Result<Vec<Account>, ChainError> {
        let raw = self
            .wallet()?
            .accounts()
            .await
            .map_err(|e| map_rpc_error("eth_accounts", e))?;
        parse_accounts(raw)
    }

    async fn request_accounts(&self) -> Result<Vec<Account>, ChainError> {
        let raw = self
            .wallet()?
            .request_accounts()
            .await
            .map_err(|e| map_rpc_error("eth_requestAccounts", e))?;
        parse_accounts(raw)
    }

    async fn submit(&self, call: &EncodedCall, account: &Account) -> Result<TxHash, ChainError> {
        let wallet = self.wallet()?;
        let request = TransactionRequest {
            from: account.to_string(),
            to: self.contract_addr.clone(),
            data: format!("0x{}", hex::encode(call.calldata())),
            value: call.value.map(|value| format!("0x{:x}", value)),
        };

        debug!("Submitting {} from {}", call.function, account);
        let hash = wallet
            .send_transaction(&request)
            .await
            .map_err(|e| map_rpc_error("eth_sendTransaction", e))?;
        let tx_hash = TxHash::new(&hash);
        info!("Broadcast {} as {}", call.function, tx_hash);
        Ok(tx_hash)
    }

    async fn await_receipt(
        &self,
        tx_hash: &TxHash,
        timeout: Duration,
    ) -> Result<TransactionReceipt, ChainError> {
        let poll = async {
            loop {
                match self.node.get_transaction_receipt(tx_hash.as_str()).await {
                    Ok(Some(receipt)) if receipt.block_number.is_some() => return receipt,
                    Ok(_) => debug!("No receipt yet for {}", tx_hash),
                    // Transient node failures must not end the wait early.
                    Err(e) => warn!("Receipt poll for {} failed: {}", tx_hash, e),
                }
                tokio::time::sleep(self.receipt_poll_interval).await;
            }
        };

        let receipt = tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| ChainError::ReceiptTimeout {
                tx_hash: tx_hash.clone(),
                waited: timeout,
            })?;

        if receipt.succeeded() {
            Ok(receipt)
        } else {
            Err(ChainError::TransactionReverted {
                tx_hash: tx_hash.clone(),
                receipt: Box::new(receipt),
            })
        }
    }

    async fn transaction_landed(&self, tx_hash: &TxHash) -> Result<TxLanding, ChainError> {
        let tx = self
            .node
            .get_transaction(tx_hash.as_str())
            .await
            .map_err(|e| map_rpc_error("eth_getTransactionByHash", e))?;
        let landing = match tx {
            None => TxLanding::Unknown,
            Some(tx) if tx.is_mined() => TxLanding::Mined,
            Some(_) => TxLanding::Pending,
        };
        debug!("Transaction {} is {:?}", tx_hash, landing);
        Ok(landing)
    }
}
