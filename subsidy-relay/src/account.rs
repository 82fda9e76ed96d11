//! Account Watcher
//!
//! Sole owner of the active signing account. Readers go through `current()`
//! or a `watch` subscription; nobody else caches the account across an await.
//!
//! Every change bumps an epoch. The orchestrator records the epoch it
//! resolved against and confirms it with `observe`, so an account switch
//! that races with resolution is never silently lost.

use ethereum_types::H160;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::chain::ChainClient;

/// A 20-byte signing address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Account(pub H160);

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0.as_bytes()))
    }
}

impl FromStr for Account {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(chain_clients_common::strip_hex_prefix(value.trim()))
            .map_err(|e| format!("invalid address {:?}: {}", value, e))?;
        if bytes.len() != 20 {
            return Err(format!(
                "invalid address {:?}: expected 20 bytes, got {}",
                value,
                bytes.len()
            ));
        }
        Ok(Account(H160::from_slice(&bytes)))
    }
}

impl Serialize for Account {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Snapshot of the watcher's cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccountState {
    /// Incremented on every change, starting at 0.
    pub epoch: u64,
    pub account: Option<Account>,
}

#[derive(Debug, Clone)]
pub struct AccountWatcher {
    state: Arc<watch::Sender<AccountState>>,
}

impl Default for AccountWatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountWatcher {
    pub fn new() -> Self {
        let (state, _) = watch::channel(AccountState::default());
        Self {
            state: Arc::new(state),
        }
    }

    pub fn current(&self) -> Option<Account> {
        self.state.borrow().account
    }

    pub fn state(&self) -> AccountState {
        *self.state.borrow()
    }

    /// Change notifications. The receiver starts out having seen the current
    /// state.
    pub fn subscribe(&self) -> watch::Receiver<AccountState> {
        self.state.subscribe()
    }

    /// Handles a wallet `accountsChanged` notification. The first account is
    /// the active one; an empty list means disconnected. Returns whether the
    /// active account actually changed.
    pub fn notify_accounts_changed(&self, accounts: &[Account]) -> bool {
        self.replace(accounts.first().copied())
    }

    /// Clears the cached account.
    pub fn clear(&self) -> bool {
        self.replace(None)
    }

    /// Records an account resolved by asking the wallet, but only if no
    /// notification arrived since `expected_epoch`. Returns false when the
    /// caller lost the race and must re-read.
    pub fn observe(&self, expected_epoch: u64, account: Account) -> bool {
        let mut accepted = false;
        self.state.send_if_modified(|state| {
            if state.epoch != expected_epoch {
                return false;
            }
            accepted = true;
            if state.account == Some(account) {
                return false;
            }
            state.account = Some(account);
            state.epoch += 1;
            true
        });
        accepted
    }

    fn replace(&self, account: Option<Account>) -> bool {
        let changed = self.state.send_if_modified(|state| {
            if state.account == account {
                return false;
            }
            state.account = account;
            state.epoch += 1;
            true
        });
        if changed {
            match account {
                Some(account) => info!("Active account changed to {}", account),
                None => info!("Wallet disconnected, active account cleared"),
            }
        }
        changed
    }

    /// Polls the signer's non-prompting account list and feeds changes into
    /// this watcher. HTTP providers have no push channel, so this stands in
    /// for `accountsChanged`.
    pub fn spawn_poller<C>(&self, client: Arc<C>, interval: Duration) -> JoinHandle<()>
    where
        C: ChainClient + ?Sized + 'static,
    {
        let watcher = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                match client.accounts().await {
                    Ok(accounts) => {
                        watcher.notify_accounts_changed(&accounts);
                    }
                    Err(e) => {
                        warn!("Account poll failed: {}", e);
                        continue;
                    }
                }
                debug!("Account poll complete, epoch {}", watcher.state().epoch);
            }
        })
    }
}
