//! EVM Client Module
//!
//! This module provides a client for communicating with EVM-compatible nodes
//! and wallet providers via their JSON-RPC API. The same client type serves
//! both roles: a read-only node (queries, receipt polling) and a signing
//! provider that owns accounts and answers eth_sendTransaction.

use chain_clients_common::{normalize_hex, parse_hex_u64};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::abi::decode_hex;
use crate::error::{RpcError, METHOD_NOT_FOUND_CODE};
use crate::types::{EvmTransaction, TransactionReceipt, TransactionRequest};

// ============================================================================
// API RESPONSE STRUCTURES
// ============================================================================

/// EVM JSON-RPC request wrapper
#[derive(Debug, Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: Vec<serde_json::Value>,
    id: u64,
}

/// EVM JSON-RPC response wrapper
#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    #[allow(dead_code)]
    jsonrpc: String,
    result: Option<T>,
    error: Option<JsonRpcError>,
    #[allow(dead_code)]
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

// ============================================================================
// EVM CLIENT IMPLEMENTATION
// ============================================================================

/// Client for communicating with EVM-compatible nodes via JSON-RPC
pub struct EvmClient {
    /// HTTP client for making requests
    client: Client,
    /// Base URL of the endpoint (e.g., "http://127.0.0.1:8545")
    base_url: String,
}

impl EvmClient {
    /// Creates a new EVM client for the given endpoint URL
    ///
    /// # Arguments
    ///
    /// * `node_url` - Base URL of the node or wallet provider
    ///
    /// # Returns
    ///
    /// * `Ok(EvmClient)` - Successfully created client
    /// * `Err(RpcError)` - Failed to create the HTTP client
    pub fn new(node_url: &str) -> Result<Self, RpcError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .no_proxy() // Avoid macOS system-configuration issues in tests
            .build()
            .map_err(RpcError::Client)?;

        Ok(Self {
            client,
            base_url: node_url.to_string(),
        })
    }

    /// Sends one JSON-RPC request and returns its (possibly null) result.
    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<serde_json::Value>,
    ) -> Result<Option<T>, RpcError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
            id: 1,
        };

        debug!("Sending {} to {}", method, self.base_url);

        let response: JsonRpcResponse<T> = self
            .client
            .post(&self.base_url)
            .json(&request)
            .send()
            .await
            .map_err(|source| RpcError::Transport {
                method: method.to_string(),
                url: self.base_url.clone(),
                source,
            })?
            .json()
            .await
            .map_err(|source| RpcError::Decode {
                method: method.to_string(),
                url: self.base_url.clone(),
                source,
            })?;

        if let Some(error) = response.error {
            return Err(RpcError::Rpc {
                url: self.base_url.clone(),
                code: error.code,
                message: error.message,
            });
        }

        Ok(response.result)
    }

    fn missing_result(&self, method: &str) -> RpcError {
        RpcError::Unexpected {
            method: method.to_string(),
            url: self.base_url.clone(),
            detail: "no result in response".to_string(),
        }
    }

    /// Executes a read-only contract call against the latest block (eth_call)
    ///
    /// # Arguments
    ///
    /// * `to` - Contract address
    /// * `data` - ABI-encoded calldata
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<u8>)` - Raw return data
    /// * `Err(RpcError)` - Transport failure or node error (including reverts)
    pub async fn call(&self, to: &str, data: &[u8]) -> Result<Vec<u8>, RpcError> {
        let call = serde_json::json!({
            "to": normalize_hex(to),
            "data": format!("0x{}", hex::encode(data)),
        });

        let result: String = self
            .request("eth_call", vec![call, serde_json::json!("latest")])
            .await?
            .ok_or_else(|| self.missing_result("eth_call"))?;

        decode_hex(&result).map_err(|e| RpcError::Unexpected {
            method: "eth_call".to_string(),
            url: self.base_url.clone(),
            detail: e.to_string(),
        })
    }

    /// Lists the accounts the provider currently exposes without prompting
    /// the user (eth_accounts). An empty list means the wallet is locked or
    /// not connected.
    pub async fn accounts(&self) -> Result<Vec<String>, RpcError> {
        Ok(self
            .request::<Vec<String>>("eth_accounts", vec![])
            .await?
            .unwrap_or_default())
    }

    /// Asks the provider to expose its accounts (eth_requestAccounts).
    ///
    /// Wallets may prompt the user here. Plain nodes that do not implement
    /// the method fall back to eth_accounts.
    pub async fn request_accounts(&self) -> Result<Vec<String>, RpcError> {
        match self
            .request::<Vec<String>>("eth_requestAccounts", vec![])
            .await
        {
            Ok(accounts) => Ok(accounts.unwrap_or_default()),
            Err(e) if e.code() == Some(METHOD_NOT_FOUND_CODE) => {
                debug!(
                    "{} does not support eth_requestAccounts, falling back to eth_accounts",
                    self.base_url
                );
                self.accounts().await
            }
            Err(e) => Err(e),
        }
    }

    /// Asks the provider to sign and broadcast a transaction (eth_sendTransaction)
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - Transaction hash
    /// * `Err(RpcError)` - Provider refused, node rejected, or transport failed
    pub async fn send_transaction(&self, tx: &TransactionRequest) -> Result<String, RpcError> {
        let params = serde_json::to_value(tx).map_err(|e| RpcError::Unexpected {
            method: "eth_sendTransaction".to_string(),
            url: self.base_url.clone(),
            detail: e.to_string(),
        })?;

        self.request::<String>("eth_sendTransaction", vec![params])
            .await?
            .ok_or_else(|| self.missing_result("eth_sendTransaction"))
    }

    /// Queries transaction details by hash using eth_getTransactionByHash
    ///
    /// # Arguments
    ///
    /// * `hash` - Transaction hash (with or without 0x prefix)
    ///
    /// # Returns
    ///
    /// * `Ok(Some(EvmTransaction))` - Transaction known to the node
    /// * `Ok(None)` - Node has never seen the transaction
    /// * `Err(RpcError)` - Failed to query transaction
    pub async fn get_transaction(&self, hash: &str) -> Result<Option<EvmTransaction>, RpcError> {
        self.request(
            "eth_getTransactionByHash",
            vec![serde_json::json!(normalize_hex(hash))],
        )
        .await
    }

    /// Queries the full transaction receipt by hash using eth_getTransactionReceipt
    ///
    /// # Returns
    ///
    /// * `Ok(Some(TransactionReceipt))` - Transaction has been mined
    /// * `Ok(None)` - Transaction pending or unknown
    /// * `Err(RpcError)` - Failed to query transaction receipt
    pub async fn get_transaction_receipt(
        &self,
        hash: &str,
    ) -> Result<Option<TransactionReceipt>, RpcError> {
        self.request(
            "eth_getTransactionReceipt",
            vec![serde_json::json!(normalize_hex(hash))],
        )
        .await
    }

    /// Gets the chain ID the endpoint is serving (eth_chainId)
    pub async fn get_chain_id(&self) -> Result<u64, RpcError> {
        self.request_quantity("eth_chainId").await
    }

    async fn request_quantity(&self, method: &str) -> Result<u64, RpcError> {
        let quantity: String = self
            .request(method, vec![])
            .await?
            .ok_or_else(|| self.missing_result(method))?;

        parse_hex_u64(&quantity).map_err(|e| RpcError::Unexpected {
            method: method.to_string(),
            url: self.base_url.clone(),
            detail: format!("invalid quantity {}: {}", quantity, e),
        })
    }

    /// Returns the base URL of this client
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
