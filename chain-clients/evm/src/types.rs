//! JSON-RPC wire types
//!
//! Field names follow the node's camelCase JSON; quantities stay as the hex
//! strings the node returns and are parsed on demand.

use chain_clients_common::parse_hex_u64;
use serde::{Deserialize, Serialize};

/// EVM event log entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EvmLog {
    /// Address of the contract that emitted the event
    pub address: String,
    /// Array of topics (indexed event parameters)
    pub topics: Vec<String>,
    /// Event data (non-indexed parameters)
    pub data: String,
    /// Block number (JSON-RPC uses camelCase: blockNumber)
    #[serde(rename = "blockNumber")]
    pub block_number: String,
    /// Transaction hash (JSON-RPC uses camelCase: transactionHash)
    #[serde(rename = "transactionHash")]
    pub transaction_hash: String,
    /// Log index (JSON-RPC uses camelCase: logIndex)
    #[serde(rename = "logIndex")]
    pub log_index: String,
}

impl EvmLog {
    /// Log index as a number; malformed indices sort last.
    pub fn log_index_u64(&self) -> u64 {
        parse_hex_u64(&self.log_index).unwrap_or(u64::MAX)
    }
}

/// EVM transaction details from eth_getTransactionByHash
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EvmTransaction {
    /// Transaction hash
    pub hash: String,
    /// Block number (hex string, None while pending)
    #[serde(rename = "blockNumber")]
    pub block_number: Option<String>,
    /// Transaction index in block (hex string)
    #[serde(rename = "transactionIndex")]
    pub transaction_index: Option<String>,
    /// From address (sender)
    pub from: String,
    /// To address (recipient/contract)
    pub to: Option<String>,
    /// Transaction data (calldata)
    pub input: String,
    /// Transaction value (in wei, hex string)
    pub value: String,
    /// Nonce (hex string)
    #[serde(default)]
    pub nonce: Option<String>,
}

impl EvmTransaction {
    /// A transaction with a block number has been mined.
    pub fn is_mined(&self) -> bool {
        self.block_number.is_some()
    }
}

/// Transaction receipt from eth_getTransactionReceipt
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TransactionReceipt {
    #[serde(rename = "transactionHash")]
    pub transaction_hash: String,
    #[serde(rename = "blockNumber")]
    pub block_number: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    /// Transaction status (0x1 = success, 0x0 = failure)
    pub status: Option<String>,
    #[serde(rename = "gasUsed", default)]
    pub gas_used: Option<String>,
    #[serde(default)]
    pub logs: Vec<EvmLog>,
}

impl TransactionReceipt {
    /// Whether the receipt reports successful execution.
    pub fn succeeded(&self) -> bool {
        self.status
            .as_deref()
            .and_then(|status| parse_hex_u64(status).ok())
            == Some(1)
    }

    pub fn block_number_u64(&self) -> Option<u64> {
        self.block_number
            .as_deref()
            .and_then(|block| parse_hex_u64(block).ok())
    }
}

/// Parameters for eth_sendTransaction; the provider signs for `from`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionRequest {
    pub from: String,
    pub to: String,
    /// 0x-prefixed calldata
    pub data: String,
    /// Value in wei as a hex quantity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}
