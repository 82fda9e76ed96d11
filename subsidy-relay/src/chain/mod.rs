//! Chain Client
//!
//! The orchestrator talks to the network only through `ChainClient`: a
//! retryable `read`, a one-shot `submit`, and a bounded `await_receipt`.
//! `EvmChainClient` is the JSON-RPC implementation; tests substitute an
//! in-memory double.

pub mod evm;

pub use evm::EvmChainClient;

use async_trait::async_trait;
use chain_clients_common::normalize_hex;
use chain_clients_evm::abi::{AbiType, AbiValue};
use chain_clients_evm::TransactionReceipt;
use serde::{Serialize, Serializer};
use std::fmt;
use std::time::Duration;

use crate::account::Account;
use crate::encoder::EncodedCall;
use crate::error::ChainError;

/// Transaction hash, normalised to lowercase with a single 0x prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TxHash(String);

impl TxHash {
    pub fn new(hash: &str) -> Self {
        TxHash(normalize_hex(hash))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for TxHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// What the node knows about a transaction hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TxLanding {
    /// Never seen, or dropped from the mempool.
    Unknown,
    /// In the mempool, not yet in a block.
    Pending,
    Mined,
}

impl TxLanding {
    /// Whether the transaction reached the network at all.
    pub fn is_known(self) -> bool {
        !matches!(self, TxLanding::Unknown)
    }
}

/// A view call against the subsidy contract and the shape of its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSpec {
    pub function: &'static str,
    pub args: Vec<AbiValue>,
    pub returns: Vec<AbiType>,
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Address of the subsidy contract, 0x-prefixed.
    fn contract_address(&self) -> &str;

    /// Side-effect-free query against current state. Safe to retry.
    async fn read(&self, call: &CallSpec) -> Result<Vec<AbiValue>, ChainError>;

    /// Accounts the signer exposes without prompting.
    async fn accounts(&self) -> Result<Vec<Account>, ChainError>;

    /// Asks the signer to expose an account; may prompt the user.
    async fn request_accounts(&self) -> Result<Vec<Account>, ChainError>;

    /// Signs and broadcasts one call from `account`.
    ///
    /// Never retry blindly: a `Network` error does not mean nothing was
    /// broadcast. Use `transaction_landed` first.
    async fn submit(&self, call: &EncodedCall, account: &Account) -> Result<TxHash, ChainError>;

    /// Waits for a terminal receipt. `ReceiptTimeout` on expiry,
    /// `TransactionReverted` if the receipt reports failure.
    async fn await_receipt(
        &self,
        tx_hash: &TxHash,
        timeout: Duration,
    ) -> Result<TransactionReceipt, ChainError>;

    /// Whether the network knows the transaction, and if so whether it is
    /// mined yet.
    async fn transaction_landed(&self, tx_hash: &TxHash) -> Result<TxLanding, ChainError>;
}
