//! Subsidy relay
//!
//! Turns subsidy-programme intents into calls on the deployed programme
//! contract, submits them through an external signer, waits for
//! confirmation and extracts assigned identifiers from emitted events.

pub mod account;
pub mod chain;
pub mod config;
pub mod contract;
pub mod domain;
pub mod encoder;
pub mod error;
pub mod integrity;
pub mod intent;
pub mod orchestrator;
pub mod receipt;

pub use account::{Account, AccountState, AccountWatcher};
pub use chain::{CallSpec, ChainClient, EvmChainClient, TxHash, TxLanding};
pub use config::RelayConfig;
pub use encoder::{encode_intent, EncodedCall, EncodedIntent, MetadataHash};
pub use error::{ChainError, EncodingError};
pub use intent::{ChainIntent, IntentKind};
pub use orchestrator::{
    Confirmation, LifecycleEvent, OrchestratorError, PendingStatus, PendingTransaction, Phase,
    TransactionOrchestrator,
};
pub use receipt::{EventMatch, EventPayload, NoMatchFound, ReceiptInterpreter};
