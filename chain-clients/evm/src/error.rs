//! Error types

use thiserror::Error;

/// EIP-1193 code returned by wallets when the user declines a request.
pub const USER_REJECTED_CODE: i64 = 4001;
/// EIP-1193 code returned when the requested account is not authorised.
pub const UNAUTHORIZED_CODE: i64 = 4100;
/// JSON-RPC code for an unsupported method.
pub const METHOD_NOT_FOUND_CODE: i64 = -32601;

/// Errors raised while talking to a JSON-RPC endpoint.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Failed to send {method} request to {url}: {source}")]
    Transport {
        method: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to parse {method} response from {url}: {source}")]
    Decode {
        method: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("JSON-RPC error from {url}: {message} (code: {code})")]
    Rpc {
        url: String,
        code: i64,
        message: String,
    },

    #[error("Unexpected {method} result from {url}: {detail}")]
    Unexpected {
        method: String,
        url: String,
        detail: String,
    },
}

impl RpcError {
    /// JSON-RPC error code, if the node answered with an error object.
    pub fn code(&self) -> Option<i64> {
        match self {
            RpcError::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// True when the request never produced a usable response (connection,
    /// timeout, or an unparsable body).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            RpcError::Client(_) | RpcError::Transport { .. } | RpcError::Decode { .. }
        )
    }
}
