//! Shared test helpers for subsidy-relay tests
//!
//! Provides dummy addresses, payload builders, event-log builders, and
//! `MockChainClient`, an instrumented in-memory chain client whose timing is
//! driven by tokio's (paused) clock.

#![allow(dead_code)]

use async_trait::async_trait;
use chain_clients_evm::abi::{encode_args, AbiValue};
use chain_clients_evm::{EvmLog, TransactionReceipt};
use ethereum_types::{H160, U256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use subsidy_relay::account::Account;
use subsidy_relay::chain::{CallSpec, ChainClient, TxHash, TxLanding};
use subsidy_relay::config::OrchestratorConfig;
use subsidy_relay::contract::EventSpec;
use subsidy_relay::domain::{
    EligibilityRule, PayoutRule, PayoutUnit, ProgramPayload, ProgramStatus, ProgramType,
};
use subsidy_relay::encoder::EncodedCall;
use subsidy_relay::error::ChainError;
use tokio::time::Instant;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Dummy subsidy contract address (anvil's first deployment)
pub const DUMMY_CONTRACT_ADDR_EVM: &str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";
/// Dummy farmer / programme officer account
pub const DUMMY_FARMER_ADDR_EVM: &str = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8";
/// Second account, used for account switches
pub const DUMMY_OTHER_ADDR_EVM: &str = "0x3c44cdddb6a900fa2b585dd299e03d12fa4293bc";
/// Contract that is not the subsidy contract
pub const DUMMY_FOREIGN_CONTRACT_ADDR_EVM: &str = "0xe7f1725e7734ce288f8367e1bb143e90bb3f0512";
pub const DUMMY_TX_HASH: &str =
    "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b";

pub fn account(address: &str) -> Account {
    address.parse().expect("valid test address")
}

pub fn h160(address: &str) -> H160 {
    account(address).0
}

// ============================================================================
// PAYLOAD BUILDERS
// ============================================================================

/// A valid CreateProgram payload. Customise with struct update syntax.
pub fn create_base_program_payload() -> ProgramPayload {
    ProgramPayload {
        name: "Maize Input Subsidy 2025".to_string(),
        description: "Seed and fertiliser support for smallholder maize growers".to_string(),
        program_type: ProgramType::Subsidy,
        status: ProgramStatus::Active,
        start_date: "2025-01-01T00:00:00.000Z".to_string(),
        end_date: "2025-12-31".to_string(),
        creator_id: 42,
        payout_rule: PayoutRule {
            amount: "150.5".to_string(),
            unit: PayoutUnit::PerHectare,
            max_per_farm: "1000".to_string(),
        },
        eligibility_rule: EligibilityRule {
            min_farm_size_hectares: 1,
            max_farm_size_hectares: 20,
            eligible_crops: vec!["maize".to_string(), "sorghum".to_string()],
            regions: vec!["Northern".to_string()],
            requirements: vec!["Registered cooperative member".to_string()],
        },
    }
}

/// Orchestrator settings with short, round timings for paused-clock tests.
pub fn test_orchestrator_config() -> OrchestratorConfig {
    OrchestratorConfig {
        receipt_timeout_ms: 60_000,
        receipt_poll_interval_ms: 1_000,
        read_attempts: 3,
    }
}

/// A complete, valid relay.toml document.
pub fn valid_config_toml() -> String {
    format!(
        r#"
[chain]
name = "anvil"
rpc_url = "http://127.0.0.1:8545"
chain_id = 31337
contract_addr = "{}"

[wallet]
rpc_url = "http://127.0.0.1:8546"

[orchestrator]
receipt_timeout_ms = 30000
receipt_poll_interval_ms = 500
"#,
        DUMMY_CONTRACT_ADDR_EVM
    )
}

// ============================================================================
// EVENT LOG BUILDERS
// ============================================================================

pub fn uint_topic(value: u64) -> String {
    format!("0x{:064x}", value)
}

pub fn address_topic(address: &str) -> String {
    format!("0x{:0>64}", address.trim_start_matches("0x"))
}

/// A log emitted by `contract` for `spec` with pre-encoded indexed topics.
pub fn event_log(
    contract: &str,
    spec: &EventSpec,
    indexed: Vec<String>,
    data: &[AbiValue],
    log_index: u64,
) -> EvmLog {
    let mut topics = vec![spec.topic()];
    topics.extend(indexed);
    EvmLog {
        address: contract.to_string(),
        topics,
        data: format!("0x{}", hex::encode(encode_args(data))),
        block_number: "0x10".to_string(),
        transaction_hash: DUMMY_TX_HASH.to_string(),
        log_index: format!("0x{:x}", log_index),
    }
}

/// ProgramCreated(programId, creator, metadataHash) from the subsidy contract.
pub fn program_created_log(program_id: u64, log_index: u64) -> EvmLog {
    event_log(
        DUMMY_CONTRACT_ADDR_EVM,
        &subsidy_relay::contract::PROGRAM_CREATED,
        vec![uint_topic(program_id), address_topic(DUMMY_FARMER_ADDR_EVM)],
        &[AbiValue::Bytes32(ethereum_types::H256::repeat_byte(0xab))],
        log_index,
    )
}

/// An unrelated ERC-20 Transfer log.
pub fn transfer_log(log_index: u64) -> EvmLog {
    EvmLog {
        address: DUMMY_FOREIGN_CONTRACT_ADDR_EVM.to_string(),
        topics: vec![
            chain_clients_evm::abi::event_topic("Transfer(address,address,uint256)"),
            address_topic(DUMMY_FARMER_ADDR_EVM),
            address_topic(DUMMY_OTHER_ADDR_EVM),
        ],
        data: format!("0x{}", hex::encode(encode_args(&[AbiValue::from(5u64)]))),
        block_number: "0x10".to_string(),
        transaction_hash: DUMMY_TX_HASH.to_string(),
        log_index: format!("0x{:x}", log_index),
    }
}

pub fn receipt_with_logs(tx_hash: &str, success: bool, logs: Vec<EvmLog>) -> TransactionReceipt {
    TransactionReceipt {
        transaction_hash: tx_hash.to_string(),
        block_number: Some("0x10".to_string()),
        from: Some(DUMMY_FARMER_ADDR_EVM.to_string()),
        to: Some(DUMMY_CONTRACT_ADDR_EVM.to_string()),
        status: Some(if success { "0x1" } else { "0x0" }.to_string()),
        gas_used: Some("0x5208".to_string()),
        logs,
    }
}

// ============================================================================
// MOCK CHAIN CLIENT
// ============================================================================

/// One accepted `submit` call.
#[derive(Debug, Clone)]
pub struct Submission {
    pub tx_hash: TxHash,
    pub function: &'static str,
    pub account: Account,
    pub value: Option<U256>,
    pub started: Instant,
}

/// In-memory chain with configurable delays.
///
/// Each submitted transaction confirms `confirmation_delay` after its
/// submission returns. `await_receipt` honours the timeout against that
/// deadline, so a short wait times out and a later, longer wait on the same
/// hash sees the confirmation.
pub struct MockChainClient {
    pub wallet_accounts: Mutex<Vec<Account>>,
    pub request_accounts_delay: Duration,
    pub submit_delay: Duration,
    pub confirmation_delay: Duration,
    /// Returned (once) by the next `submit`
    pub submit_error: Mutex<Option<ChainError>>,
    pub revert: bool,
    /// Returned (once) by the next `await_receipt` instead of a receipt
    pub receipt_error: Mutex<Option<ChainError>>,
    /// Logs placed in every receipt
    pub receipt_logs: Mutex<Vec<EvmLog>>,
    /// Canned `read` results by function signature
    pub read_values: Mutex<HashMap<&'static str, Vec<AbiValue>>>,
    pub submissions: Mutex<Vec<Submission>>,
    /// When each receipt was handed back, in order
    pub receipts_returned: Mutex<Vec<(TxHash, Instant)>>,
    pub request_accounts_calls: AtomicU64,
    pub await_receipt_calls: AtomicU64,
    confirm_at: Mutex<HashMap<TxHash, Instant>>,
    next_tx: AtomicU64,
}

impl MockChainClient {
    pub fn new(wallet_accounts: Vec<Account>) -> Self {
        Self {
            wallet_accounts: Mutex::new(wallet_accounts),
            request_accounts_delay: Duration::from_millis(10),
            submit_delay: Duration::from_millis(10),
            confirmation_delay: Duration::from_secs(5),
            submit_error: Mutex::new(None),
            revert: false,
            receipt_error: Mutex::new(None),
            receipt_logs: Mutex::new(vec![]),
            read_values: Mutex::new(HashMap::new()),
            submissions: Mutex::new(vec![]),
            receipts_returned: Mutex::new(vec![]),
            request_accounts_calls: AtomicU64::new(0),
            await_receipt_calls: AtomicU64::new(0),
            confirm_at: Mutex::new(HashMap::new()),
            next_tx: AtomicU64::new(1),
        }
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn receipts_returned(&self) -> Vec<(TxHash, Instant)> {
        self.receipts_returned.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    fn contract_address(&self) -> &str {
        DUMMY_CONTRACT_ADDR_EVM
    }

    async fn read(&self, call: &CallSpec) -> Result<Vec<AbiValue>, ChainError> {
        self.read_values
            .lock()
            .unwrap()
            .get(call.function)
            .cloned()
            .ok_or_else(|| ChainError::Rpc {
                method: "eth_call".to_string(),
                code: 3,
                message: "execution reverted".to_string(),
            })
    }

    async fn accounts(&self) -> Result<Vec<Account>, ChainError> {
        Ok(self.wallet_accounts.lock().unwrap().clone())
    }

    async fn request_accounts(&self) -> Result<Vec<Account>, ChainError> {
        self.request_accounts_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.request_accounts_delay).await;
        Ok(self.wallet_accounts.lock().unwrap().clone())
    }

    async fn submit(&self, call: &EncodedCall, account: &Account) -> Result<TxHash, ChainError> {
        let started = Instant::now();
        tokio::time::sleep(self.submit_delay).await;
        if let Some(error) = self.submit_error.lock().unwrap().take() {
            return Err(error);
        }

        let n = self.next_tx.fetch_add(1, Ordering::SeqCst);
        let tx_hash = TxHash::new(&format!("0x{:064x}", n));
        self.confirm_at
            .lock()
            .unwrap()
            .insert(tx_hash.clone(), Instant::now() + self.confirmation_delay);
        self.submissions.lock().unwrap().push(Submission {
            tx_hash: tx_hash.clone(),
            function: call.function,
            account: *account,
            value: call.value,
            started,
        });
        Ok(tx_hash)
    }

    async fn await_receipt(
        &self,
        tx_hash: &TxHash,
        timeout: Duration,
    ) -> Result<TransactionReceipt, ChainError> {
        self.await_receipt_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.receipt_error.lock().unwrap().take() {
            return Err(error);
        }
        let deadline = Instant::now() + timeout;
        let confirm_at = self.confirm_at.lock().unwrap().get(tx_hash).copied();

        match confirm_at {
            Some(at) if at <= deadline => tokio::time::sleep_until(at).await,
            _ => {
                tokio::time::sleep_until(deadline).await;
                return Err(ChainError::ReceiptTimeout {
                    tx_hash: tx_hash.clone(),
                    waited: timeout,
                });
            }
        }

        let receipt = receipt_with_logs(
            tx_hash.as_str(),
            !self.revert,
            self.receipt_logs.lock().unwrap().clone(),
        );
        self.receipts_returned
            .lock()
            .unwrap()
            .push((tx_hash.clone(), Instant::now()));

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
        Ok(match self.confirm_at.lock().unwrap().get(tx_hash) {
            None => TxLanding::Unknown,
            Some(at) if *at <= Instant::now() => TxLanding::Mined,
            Some(_) => TxLanding::Pending,
        })
    }
}
