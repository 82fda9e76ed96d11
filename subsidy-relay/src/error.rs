//! Error types
//!
//! `EncodingError` is raised before any network interaction and is always
//! caller-fixable. `ChainError` is the Chain Client's taxonomy; the
//! orchestrator wraps it with intent and transaction context.

use chain_clients_evm::TransactionReceipt;
use std::time::Duration;
use thiserror::Error;

use crate::chain::TxHash;

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("Unknown {kind} value: {value:?}")]
    UnknownEnumValue { kind: &'static str, value: String },

    #[error("Invalid date {value:?}: {reason}")]
    InvalidDate { value: String, reason: String },

    #[error("Amount {value:?} out of range: {reason}")]
    AmountOutOfRange { value: String, reason: String },

    #[error("Invalid amount {value:?}: {reason}")]
    InvalidAmount { value: String, reason: String },

    #[error("Failed to serialize metadata payload: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ChainError {
    /// No signer is configured. Expected when running read-only.
    #[error("No wallet provider configured")]
    WalletUnavailable,

    #[error("Wallet exposes no usable account")]
    AccountUnresolved,

    #[error("Request rejected by the user in the wallet")]
    UserRejected,

    /// Transport-level failure. A `submit` that fails this way may still have
    /// broadcast; check `transaction_landed` before resubmitting.
    #[error("Network error: {0}")]
    Network(String),

    #[error("{method} rejected by node: {message} (code: {code})")]
    Rpc {
        method: String,
        code: i64,
        message: String,
    },

    /// Gave up waiting; says nothing about the transaction's fate.
    #[error("No receipt for {tx_hash} within {waited:?}")]
    ReceiptTimeout { tx_hash: TxHash, waited: Duration },

    #[error("Transaction {tx_hash} reverted")]
    TransactionReverted {
        tx_hash: TxHash,
        receipt: Box<TransactionReceipt>,
    },

    #[error("Failed to decode {context}: {reason}")]
    Decode { context: String, reason: String },
}
