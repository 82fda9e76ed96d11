//! Unit tests for the receipt interpreter
//!
//! These tests verify event selection (contract, topic, log order),
//! first-occurrence tie-breaking, and payload decoding for the events
//! that carry assigned identifiers.

use chain_clients_evm::abi::AbiValue;
use ethereum_types::{H256, U256};
use subsidy_relay::contract::{
    AUTOMATION_CONFIG_UPDATED, CLAIM_REJECTED, CLAIM_SUBMITTED, PROGRAM_CREATED,
};
use subsidy_relay::intent::IntentKind;
use subsidy_relay::receipt::{EventPayload, ReceiptInterpreter};

#[path = "helpers.rs"]
mod test_helpers;
use test_helpers::{
    address_topic, event_log, h160, program_created_log, receipt_with_logs, transfer_log,
    uint_topic, DUMMY_CONTRACT_ADDR_EVM, DUMMY_FARMER_ADDR_EVM, DUMMY_FOREIGN_CONTRACT_ADDR_EVM,
    DUMMY_TX_HASH,
};

fn interpreter() -> ReceiptInterpreter {
    ReceiptInterpreter::new(DUMMY_CONTRACT_ADDR_EVM)
}

// ============================================================================
// SELECTION TESTS
// ============================================================================

/// What is tested: [Other, ProgramCreated{7}, ProgramCreated{8}] yields id 7
/// Why: The first matching event in log order is authoritative
#[test]
fn test_first_matching_event_wins() {
    let receipt = receipt_with_logs(
        DUMMY_TX_HASH,
        true,
        vec![transfer_log(0), program_created_log(7, 1), program_created_log(8, 2)],
    );

    let matched = interpreter()
        .interpret(IntentKind::CreateProgram, &receipt)
        .expect("ProgramCreated should match");

    assert_eq!(matched.assigned_id(), Some(U256::from(7)));
    assert_eq!(matched.log_index, 1);
    assert_eq!(matched.kind, IntentKind::CreateProgram);
    assert_eq!(matched.transaction_hash.as_str(), DUMMY_TX_HASH);
}

/// What is tested: ordering follows logIndex, not position in the array
/// Why: Log order is defined by the chain, not by how the node lists them
#[test]
fn test_tie_break_uses_log_index() {
    let receipt = receipt_with_logs(
        DUMMY_TX_HASH,
        true,
        vec![program_created_log(8, 5), program_created_log(7, 2)],
    );

    let matched = interpreter()
        .interpret(IntentKind::CreateProgram, &receipt)
        .unwrap();

    assert_eq!(matched.assigned_id(), Some(U256::from(7)));
    assert_eq!(matched.log_index, 2);
}

/// What is tested: a receipt without the expected event yields NoMatchFound
/// Why: A successful call may legitimately emit nothing; that is not fatal
#[test]
fn test_no_matching_event() {
    let receipt = receipt_with_logs(DUMMY_TX_HASH, true, vec![transfer_log(0)]);

    let err = interpreter()
        .interpret(IntentKind::CreateProgram, &receipt)
        .unwrap_err();

    assert_eq!(err.kind, IntentKind::CreateProgram);
    assert_eq!(err.event, "ProgramCreated");
    assert_eq!(err.tx_hash.as_str(), DUMMY_TX_HASH);
    assert!(err.to_string().contains("ProgramCreated"));
}

/// What is tested: an empty log list yields NoMatchFound
/// Why: Reverted-then-retried or no-op calls produce empty receipts
#[test]
fn test_empty_receipt() {
    let receipt = receipt_with_logs(DUMMY_TX_HASH, true, vec![]);
    assert!(interpreter()
        .interpret(IntentKind::SubmitClaim, &receipt)
        .is_err());
}

/// What is tested: a ProgramCreated-shaped log from another contract is ignored
/// Why: Any contract can emit an event with the same signature
#[test]
fn test_ignores_events_from_other_contracts() {
    let spoofed = event_log(
        DUMMY_FOREIGN_CONTRACT_ADDR_EVM,
        &PROGRAM_CREATED,
        vec![uint_topic(99), address_topic(DUMMY_FARMER_ADDR_EVM)],
        &[AbiValue::Bytes32(H256::zero())],
        0,
    );
    let receipt = receipt_with_logs(DUMMY_TX_HASH, true, vec![spoofed]);

    assert!(interpreter()
        .interpret(IntentKind::CreateProgram, &receipt)
        .is_err());
}

/// What is tested: address comparison is case-insensitive
/// Why: Nodes may return checksummed addresses
#[test]
fn test_contract_address_case_insensitive() {
    let mut log = program_created_log(3, 0);
    log.address = DUMMY_CONTRACT_ADDR_EVM.to_uppercase().replace("0X", "0x");
    let receipt = receipt_with_logs(DUMMY_TX_HASH, true, vec![log]);

    let matched = interpreter()
        .interpret(IntentKind::CreateProgram, &receipt)
        .unwrap();
    assert_eq!(matched.assigned_id(), Some(U256::from(3)));
}

/// What is tested: a malformed matching log is skipped and the next one used
/// Why: One bad log must not hide a valid result
#[test]
fn test_skips_undecodable_log() {
    let mut truncated = program_created_log(5, 0);
    truncated.topics.truncate(2);
    let receipt = receipt_with_logs(
        DUMMY_TX_HASH,
        true,
        vec![truncated, program_created_log(6, 1)],
    );

    let matched = interpreter()
        .interpret(IntentKind::CreateProgram, &receipt)
        .unwrap();
    assert_eq!(matched.assigned_id(), Some(U256::from(6)));
}

// ============================================================================
// DECODING TESTS
// ============================================================================

/// What is tested: ProgramCreated decodes creator and metadata hash
/// Why: Callers compare the committed hash with the one they computed
#[test]
fn test_decode_program_created() {
    let receipt = receipt_with_logs(DUMMY_TX_HASH, true, vec![program_created_log(12, 0)]);
    let matched = interpreter()
        .interpret(IntentKind::CreateProgram, &receipt)
        .unwrap();

    assert_eq!(
        matched.payload,
        EventPayload::ProgramCreated {
            program_id: U256::from(12),
            creator: h160(DUMMY_FARMER_ADDR_EVM),
            metadata_hash: H256::repeat_byte(0xab),
        }
    );
}

/// What is tested: ClaimSubmitted decodes three indexed fields and the amount
/// Why: The claim id is the identifier handed back to the farmer
#[test]
fn test_decode_claim_submitted() {
    let log = event_log(
        DUMMY_CONTRACT_ADDR_EVM,
        &CLAIM_SUBMITTED,
        vec![
            uint_topic(11),
            uint_topic(7),
            address_topic(DUMMY_FARMER_ADDR_EVM),
        ],
        &[AbiValue::from(500u64)],
        0,
    );
    let receipt = receipt_with_logs(DUMMY_TX_HASH, true, vec![log]);

    let matched = interpreter()
        .interpret(IntentKind::SubmitClaim, &receipt)
        .unwrap();

    assert_eq!(matched.assigned_id(), Some(U256::from(11)));
    assert_eq!(
        matched.payload,
        EventPayload::ClaimSubmitted {
            claim_id: U256::from(11),
            program_id: U256::from(7),
            farmer: h160(DUMMY_FARMER_ADDR_EVM),
            amount: U256::from(500),
        }
    );
}

/// What is tested: ClaimRejected decodes its dynamic string reason
/// Why: The reason is shown to the farmer
#[test]
fn test_decode_claim_rejected_reason() {
    let log = event_log(
        DUMMY_CONTRACT_ADDR_EVM,
        &CLAIM_REJECTED,
        vec![uint_topic(4), address_topic(DUMMY_FARMER_ADDR_EVM)],
        &[AbiValue::String("Farm outside eligible region".to_string())],
        3,
    );
    let receipt = receipt_with_logs(DUMMY_TX_HASH, true, vec![log]);

    let matched = interpreter()
        .interpret(IntentKind::RejectClaim, &receipt)
        .unwrap();

    match &matched.payload {
        EventPayload::ClaimRejected { claim_id, reason, .. } => {
            assert_eq!(*claim_id, U256::from(4));
            assert_eq!(reason, "Farm outside eligible region");
        }
        other => panic!("unexpected payload {:?}", other),
    }
    assert_eq!(matched.assigned_id(), None);
}

/// What is tested: events with no indexed parameters decode from data alone
/// Why: AutomationConfigUpdated carries everything in its data section
#[test]
fn test_decode_automation_config_updated() {
    let log = event_log(
        DUMMY_CONTRACT_ADDR_EVM,
        &AUTOMATION_CONFIG_UPDATED,
        vec![],
        &[
            AbiValue::Bool(true),
            AbiValue::from(3600u64),
            AbiValue::from(25u64),
        ],
        0,
    );
    let receipt = receipt_with_logs(DUMMY_TX_HASH, true, vec![log]);

    let matched = interpreter()
        .interpret(IntentKind::UpdateAutomationConfig, &receipt)
        .unwrap();

    assert_eq!(
        matched.payload,
        EventPayload::AutomationConfigUpdated {
            enabled: true,
            interval: U256::from(3600),
            max_batch_size: U256::from(25),
        }
    );
}
