//! EVM chain client
//!
//! JSON-RPC transport for EVM-compatible nodes and wallet providers, plus the
//! minimal Solidity ABI codec needed to build contract calls and decode the
//! events they emit.

pub mod abi;
pub mod client;
pub mod error;
pub mod types;

pub use client::EvmClient;
pub use error::RpcError;
pub use types::{EvmLog, EvmTransaction, TransactionReceipt, TransactionRequest};
