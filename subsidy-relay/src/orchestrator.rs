//! Transaction Orchestrator
//!
//! Drives one intent through
//! `Built → Queued → AccountResolving → Submitting → AwaitingReceipt` and on to
//! a terminal phase. Per instance, at most one intent holds the submission
//! slot; it is taken before account resolution and released only when the
//! receipt wait ends, so a second intent cannot reach `Submitting` while the
//! first is still submitting or awaiting its receipt.
//!
//! Every phase change is published on a broadcast channel so callers (and
//! tests) can follow progress without polling.

use chain_clients_evm::TransactionReceipt;
use chrono::{DateTime, Utc};
use ethereum_types::U256;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::account::{Account, AccountWatcher};
use crate::chain::{ChainClient, TxHash, TxLanding};
use crate::config::OrchestratorConfig;
use crate::encoder::{encode_intent, EncodedCall, EncodedIntent, MetadataHash};
use crate::error::{ChainError, EncodingError};
use crate::intent::{ChainIntent, IntentKind};
use crate::receipt::{EventMatch, ReceiptInterpreter};

const LIFECYCLE_CAPACITY: usize = 256;

// ============================================================================
// LIFECYCLE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Built,
    /// Waiting for the submission slot.
    Queued,
    AccountResolving,
    Submitting,
    AwaitingReceipt,
    Confirmed,
    Reverted,
    /// Stopped waiting; the transaction may still confirm. Re-poll it.
    ReceiptTimedOut,
    /// Ended before anything was broadcast.
    SubmissionFailed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Phase::Confirmed | Phase::Reverted | Phase::ReceiptTimedOut | Phase::SubmissionFailed
        )
    }
}

#[derive(Debug, Clone)]
pub struct LifecycleEvent {
    /// Per-orchestrator sequence number of the intent.
    pub intent_seq: u64,
    pub kind: IntentKind,
    pub phase: Phase,
    pub tx_hash: Option<TxHash>,
    pub at: Instant,
}

// ============================================================================
// PENDING TRANSACTIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingStatus {
    Pending,
    Confirmed,
    Reverted,
    /// The caller stopped waiting; says nothing about the chain.
    Abandoned,
}

/// One broadcast submission. Held for a single submit-and-confirm cycle and
/// handed back to the caller; never persisted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingTransaction {
    pub tx_hash: TxHash,
    pub kind: IntentKind,
    /// The call that was signed, for looking the transaction up out-of-band.
    /// Unknown for recovered records.
    pub call: Option<EncodedCall>,
    /// Account the transaction was signed by. Unknown for recovered records.
    pub account: Option<Account>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub metadata_hash: Option<MetadataHash>,
    pub status: PendingStatus,
}

impl PendingTransaction {
    /// Rebuilds a record from a bare hash, e.g. one a caller kept after a
    /// timeout in an earlier process.
    pub fn recovered(tx_hash: TxHash, kind: IntentKind) -> Self {
        Self {
            tx_hash,
            kind,
            call: None,
            account: None,
            submitted_at: None,
            metadata_hash: None,
            status: PendingStatus::Pending,
        }
    }
}

/// A confirmed transaction and, if one was emitted, the event carrying its
/// result.
#[derive(Debug, Clone, Serialize)]
pub struct Confirmation {
    pub pending: PendingTransaction,
    pub receipt: TransactionReceipt,
    /// `None` when the receipt held no matching event; the transaction still
    /// succeeded.
    pub event: Option<EventMatch>,
}

impl Confirmation {
    pub fn assigned_id(&self) -> Option<U256> {
        self.event.as_ref().and_then(EventMatch::assigned_id)
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Raised before any network call.
    #[error("Cannot encode {kind} intent: {source}")]
    Encoding {
        kind: IntentKind,
        #[source]
        source: EncodingError,
    },

    /// No account could be resolved; nothing was broadcast.
    #[error("Wallet not connected: no account to sign {kind} intent")]
    WalletNotConnected {
        kind: IntentKind,
        cause: Option<ChainError>,
    },

    /// `submit` failed. After a `Network` cause, check `transaction_landed`
    /// before retrying.
    #[error("Submission of {kind} intent failed: {source}")]
    SubmissionFailed {
        kind: IntentKind,
        #[source]
        source: ChainError,
    },

    /// Terminal; the on-chain effect did not happen.
    #[error("{} transaction {} reverted", .pending.kind, .pending.tx_hash)]
    Reverted {
        pending: Box<PendingTransaction>,
        receipt: Box<TransactionReceipt>,
    },

    /// Not a verdict on the transaction. Re-poll with the same hash.
    #[error("No receipt for {} transaction {} within {:?}", .pending.kind, .pending.tx_hash, .waited)]
    ReceiptTimedOut {
        pending: Box<PendingTransaction>,
        waited: Duration,
    },

    #[error("Receipt for {} transaction {} unavailable: {source}", .pending.kind, .pending.tx_hash)]
    ReceiptUnavailable {
        pending: Box<PendingTransaction>,
        #[source]
        source: ChainError,
    },
}

impl OrchestratorError {
    /// The broadcast transaction, once there is one.
    pub fn pending(&self) -> Option<&PendingTransaction> {
        match self {
            OrchestratorError::Reverted { pending, .. }
            | OrchestratorError::ReceiptTimedOut { pending, .. }
            | OrchestratorError::ReceiptUnavailable { pending, .. } => Some(pending),
            _ => None,
        }
    }
}

// ============================================================================
// ORCHESTRATOR
// ============================================================================

pub struct TransactionOrchestrator<C: ChainClient + ?Sized> {
    client: Arc<C>,
    accounts: AccountWatcher,
    config: OrchestratorConfig,
    interpreter: ReceiptInterpreter,
    /// Fair (FIFO) lock: queued intents submit in arrival order.
    submission_slot: Mutex<()>,
    lifecycle: broadcast::Sender<LifecycleEvent>,
    next_seq: AtomicU64,
}

impl<C: ChainClient + ?Sized> TransactionOrchestrator<C> {
    pub fn new(client: Arc<C>, accounts: AccountWatcher, config: OrchestratorConfig) -> Self {
        let interpreter = ReceiptInterpreter::new(client.contract_address());
        let (lifecycle, _) = broadcast::channel(LIFECYCLE_CAPACITY);
        Self {
            client,
            accounts,
            config,
            interpreter,
            submission_slot: Mutex::new(()),
            lifecycle,
            next_seq: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.lifecycle.subscribe()
    }

    pub fn accounts(&self) -> &AccountWatcher {
        &self.accounts
    }

    /// Encodes and executes an intent end to end.
    pub async fn execute(&self, intent: &ChainIntent) -> Result<Confirmation, OrchestratorError> {
        let kind = intent.kind();
        let encoded = encode_intent(intent).map_err(|source| {
            warn!("Rejected {} intent before submission: {}", kind, source);
            OrchestratorError::Encoding { kind, source }
        })?;
        self.execute_encoded(encoded).await
    }

    /// Executes an already-encoded intent, e.g. after persisting its
    /// canonical payload off-chain.
    pub async fn execute_encoded(
        &self,
        encoded: EncodedIntent,
    ) -> Result<Confirmation, OrchestratorError> {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let kind = encoded.kind;
        self.emit(seq, kind, Phase::Built, None);
        debug!(
            "Built {} call {} (metadata {})",
            kind, encoded.call.function, encoded.metadata_hash
        );

        self.emit(seq, kind, Phase::Queued, None);
        let _slot = self.submission_slot.lock().await;

        self.emit(seq, kind, Phase::AccountResolving, None);
        let account = match self.resolve_account(kind).await {
            Ok(account) => account,
            Err(e) => {
                warn!("{}", e);
                self.emit(seq, kind, Phase::SubmissionFailed, None);
                return Err(e);
            }
        };

        self.emit(seq, kind, Phase::Submitting, None);
        let tx_hash = match self.client.submit(&encoded.call, &account).await {
            Ok(tx_hash) => tx_hash,
            Err(source) => {
                error!("Submission of {} from {} failed: {}", kind, account, source);
                self.emit(seq, kind, Phase::SubmissionFailed, None);
                return Err(OrchestratorError::SubmissionFailed { kind, source });
            }
        };

        info!("Submitted {} as {} from {}", kind, tx_hash, account);
        let pending = PendingTransaction {
            tx_hash,
            kind,
            call: Some(encoded.call),
            account: Some(account),
            submitted_at: Some(Utc::now()),
            metadata_hash: Some(encoded.metadata_hash),
            status: PendingStatus::Pending,
        };

        self.wait_for_receipt(seq, pending, self.config.receipt_timeout())
            .await
    }

    /// Resumes waiting on a transaction that was already broadcast. Never
    /// resubmits, so it is safe after `ReceiptTimedOut`.
    pub async fn repoll(
        &self,
        pending: &PendingTransaction,
        timeout: Duration,
    ) -> Result<Confirmation, OrchestratorError> {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let pending = PendingTransaction {
            status: PendingStatus::Pending,
            ..pending.clone()
        };
        info!("Re-polling {} transaction {}", pending.kind, pending.tx_hash);
        self.wait_for_receipt(seq, pending, timeout).await
    }

    /// Whether a transaction is known to the network. Check this before
    /// retrying an intent whose submission failed with a network error.
    pub async fn transaction_landed(&self, tx_hash: &TxHash) -> Result<TxLanding, ChainError> {
        self.client.transaction_landed(tx_hash).await
    }

    /// Cached account if there is one, otherwise ask the wallet. Restarts if
    /// the watcher changes while the wallet is being asked, so the intent
    /// uses the newest account.
    async fn resolve_account(&self, kind: IntentKind) -> Result<Account, OrchestratorError> {
        let mut changes = self.accounts.subscribe();
        loop {
            let state = *changes.borrow_and_update();
            if let Some(account) = state.account {
                return Ok(account);
            }

            debug!("No cached account for {}, requesting one from the wallet", kind);
            let requested = self.client.request_accounts().await;

            if changes.has_changed().unwrap_or(false) {
                debug!("Account changed while resolving {}, re-reading", kind);
                continue;
            }

            let accounts = requested.map_err(|cause| OrchestratorError::WalletNotConnected {
                kind,
                cause: Some(cause),
            })?;
            let Some(&account) = accounts.first() else {
                return Err(OrchestratorError::WalletNotConnected { kind, cause: None });
            };
            if self.accounts.observe(state.epoch, account) {
                return Ok(account);
            }
        }
    }

    async fn wait_for_receipt(
        &self,
        seq: u64,
        mut pending: PendingTransaction,
        timeout: Duration,
    ) -> Result<Confirmation, OrchestratorError> {
        let kind = pending.kind;
        let tx_hash = pending.tx_hash.clone();
        self.emit(seq, kind, Phase::AwaitingReceipt, Some(&tx_hash));

        match self.client.await_receipt(&tx_hash, timeout).await {
            Ok(receipt) => {
                pending.status = PendingStatus::Confirmed;
                self.emit(seq, kind, Phase::Confirmed, Some(&tx_hash));

                let event = match self.interpreter.interpret(kind, &receipt) {
                    Ok(event) => Some(event),
                    Err(no_match) => {
                        warn!("{}", no_match);
                        None
                    }
                };
                match event.as_ref().and_then(EventMatch::assigned_id) {
                    Some(id) => info!("{} confirmed in {}, assigned id {}", kind, tx_hash, id),
                    None => info!("{} confirmed in {}", kind, tx_hash),
                }

                Ok(Confirmation {
                    pending,
                    receipt,
                    event,
                })
            }
            Err(ChainError::TransactionReverted { receipt, .. }) => {
                pending.status = PendingStatus::Reverted;
                warn!("{} transaction {} reverted", kind, tx_hash);
                self.emit(seq, kind, Phase::Reverted, Some(&tx_hash));
                Err(OrchestratorError::Reverted {
                    pending: Box::new(pending),
                    receipt,
                })
            }
            Err(ChainError::ReceiptTimeout { waited, .. }) => {
                pending.status = PendingStatus::Abandoned;
                warn!(
                    "Gave up waiting for {} after {:?}; re-poll {} rather than resubmitting",
                    kind, waited, tx_hash
                );
                self.emit(seq, kind, Phase::ReceiptTimedOut, Some(&tx_hash));
                Err(OrchestratorError::ReceiptTimedOut {
                    pending: Box::new(pending),
                    waited,
                })
            }
            Err(source) => {
                pending.status = PendingStatus::Abandoned;
                error!("Receipt wait for {} failed: {}", tx_hash, source);
                self.emit(seq, kind, Phase::ReceiptTimedOut, Some(&tx_hash));
                Err(OrchestratorError::ReceiptUnavailable {
                    pending: Box::new(pending),
                    source,
                })
            }
        }
    }

    fn emit(&self, intent_seq: u64, kind: IntentKind, phase: Phase, tx_hash: Option<&TxHash>) {
        debug!("{} #{} -> {:?}", kind, intent_seq, phase);
        // No subscribers is fine.
        let _ = self.lifecycle.send(LifecycleEvent {
            intent_seq,
            kind,
            phase,
            tx_hash: tx_hash.cloned(),
            at: Instant::now(),
        });
    }
}
