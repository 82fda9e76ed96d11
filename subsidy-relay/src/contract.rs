//! Subsidy contract call surface
//!
//! Function and event signatures of the deployed programme contract. These are
//! fixed by the deployed ABI: parameter order and types must match it exactly.

use chain_clients_evm::abi::{event_topic, AbiType};

use crate::intent::IntentKind;

/// Decimal places of the contract's fixed-point amount unit.
pub const AMOUNT_DECIMALS: usize = 18;

pub mod functions {
    pub const CREATE_PROGRAM: &str = "createProgram(string,string,uint8,uint8,uint256,uint256,uint256,uint256,uint8,uint256,uint256,uint256,bytes32)";
    pub const UPDATE_PROGRAM_STATUS: &str = "updateProgramStatus(uint256,uint8)";
    pub const SUBMIT_CLAIM: &str = "submitClaim(uint256,uint256,uint256,bytes32)";
    pub const APPROVE_CLAIM: &str = "approveClaim(uint256)";
    pub const REJECT_CLAIM: &str = "rejectClaim(uint256,string)";
    pub const ENROLL_IN_PROGRAM: &str = "enrollInProgram(uint256,uint256)";
    /// Payable; the deposit amount travels as transaction value.
    pub const DEPOSIT: &str = "deposit(uint256)";
    pub const UPDATE_AUTOMATION_CONFIG: &str = "updateAutomationConfig(bool,uint256,uint256)";

    // Views
    pub const PROGRAM_COUNT: &str = "programCount()";
    pub const PROGRAM_METADATA_HASH: &str = "programMetadataHash(uint256)";
}

/// Shape of an emitted event: indexed parameters arrive as topics[1..],
/// the rest ABI-encoded in `data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventSpec {
    pub name: &'static str,
    pub signature: &'static str,
    pub indexed: &'static [AbiType],
    pub data: &'static [AbiType],
}

impl EventSpec {
    /// topics[0] of this event.
    pub fn topic(&self) -> String {
        event_topic(self.signature)
    }
}

pub const PROGRAM_CREATED: EventSpec = EventSpec {
    name: "ProgramCreated",
    signature: "ProgramCreated(uint256,address,bytes32)",
    indexed: &[AbiType::Uint, AbiType::Address],
    data: &[AbiType::Bytes32],
};

pub const PROGRAM_STATUS_UPDATED: EventSpec = EventSpec {
    name: "ProgramStatusUpdated",
    signature: "ProgramStatusUpdated(uint256,uint8)",
    indexed: &[AbiType::Uint],
    data: &[AbiType::Uint],
};

pub const CLAIM_SUBMITTED: EventSpec = EventSpec {
    name: "ClaimSubmitted",
    signature: "ClaimSubmitted(uint256,uint256,address,uint256)",
    indexed: &[AbiType::Uint, AbiType::Uint, AbiType::Address],
    data: &[AbiType::Uint],
};

pub const CLAIM_APPROVED: EventSpec = EventSpec {
    name: "ClaimApproved",
    signature: "ClaimApproved(uint256,address,uint256)",
    indexed: &[AbiType::Uint, AbiType::Address],
    data: &[AbiType::Uint],
};

pub const CLAIM_REJECTED: EventSpec = EventSpec {
    name: "ClaimRejected",
    signature: "ClaimRejected(uint256,address,string)",
    indexed: &[AbiType::Uint, AbiType::Address],
    data: &[AbiType::String],
};

pub const FARMER_ENROLLED: EventSpec = EventSpec {
    name: "FarmerEnrolled",
    signature: "FarmerEnrolled(uint256,address,uint256)",
    indexed: &[AbiType::Uint, AbiType::Address],
    data: &[AbiType::Uint],
};

pub const FUNDS_DEPOSITED: EventSpec = EventSpec {
    name: "FundsDeposited",
    signature: "FundsDeposited(uint256,address,uint256)",
    indexed: &[AbiType::Uint, AbiType::Address],
    data: &[AbiType::Uint],
};

pub const AUTOMATION_CONFIG_UPDATED: EventSpec = EventSpec {
    name: "AutomationConfigUpdated",
    signature: "AutomationConfigUpdated(bool,uint256,uint256)",
    indexed: &[],
    data: &[AbiType::Bool, AbiType::Uint, AbiType::Uint],
};

/// The event whose presence confirms the effect of an intent.
pub fn expected_event(kind: IntentKind) -> &'static EventSpec {
    match kind {
        IntentKind::CreateProgram => &PROGRAM_CREATED,
        IntentKind::UpdateProgramStatus => &PROGRAM_STATUS_UPDATED,
        IntentKind::SubmitClaim => &CLAIM_SUBMITTED,
        IntentKind::ApproveClaim => &CLAIM_APPROVED,
        IntentKind::RejectClaim => &CLAIM_REJECTED,
        IntentKind::EnrollInProgram => &FARMER_ENROLLED,
        IntentKind::Deposit => &FUNDS_DEPOSITED,
        IntentKind::UpdateAutomationConfig => &AUTOMATION_CONFIG_UPDATED,
    }
}
