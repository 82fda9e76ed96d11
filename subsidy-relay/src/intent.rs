//! Chain intents
//!
//! A `ChainIntent` is one caller-level request to perform a single contract
//! write, carrying the typed domain payload needed to build the call.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::{
    AutomationConfig, ClaimDecision, ClaimPayload, ClaimRejection, DepositPayload, Enrollment,
    ProgramPayload, ProgramStatusChange,
};
use crate::error::EncodingError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case", deny_unknown_fields)]
pub enum ChainIntent {
    CreateProgram(ProgramPayload),
    UpdateProgramStatus(ProgramStatusChange),
    SubmitClaim(ClaimPayload),
    ApproveClaim(ClaimDecision),
    RejectClaim(ClaimRejection),
    EnrollInProgram(Enrollment),
    Deposit(DepositPayload),
    UpdateAutomationConfig(AutomationConfig),
}

impl ChainIntent {
    pub fn kind(&self) -> IntentKind {
        match self {
            ChainIntent::CreateProgram(_) => IntentKind::CreateProgram,
            ChainIntent::UpdateProgramStatus(_) => IntentKind::UpdateProgramStatus,
            ChainIntent::SubmitClaim(_) => IntentKind::SubmitClaim,
            ChainIntent::ApproveClaim(_) => IntentKind::ApproveClaim,
            ChainIntent::RejectClaim(_) => IntentKind::RejectClaim,
            ChainIntent::EnrollInProgram(_) => IntentKind::EnrollInProgram,
            ChainIntent::Deposit(_) => IntentKind::Deposit,
            ChainIntent::UpdateAutomationConfig(_) => IntentKind::UpdateAutomationConfig,
        }
    }

    /// The domain payload alone, as it is stored off-chain.
    pub fn payload_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            ChainIntent::CreateProgram(p) => serde_json::to_value(p),
            ChainIntent::UpdateProgramStatus(p) => serde_json::to_value(p),
            ChainIntent::SubmitClaim(p) => serde_json::to_value(p),
            ChainIntent::ApproveClaim(p) => serde_json::to_value(p),
            ChainIntent::RejectClaim(p) => serde_json::to_value(p),
            ChainIntent::EnrollInProgram(p) => serde_json::to_value(p),
            ChainIntent::Deposit(p) => serde_json::to_value(p),
            ChainIntent::UpdateAutomationConfig(p) => serde_json::to_value(p),
        }
    }
}

/// Payload-free tag of a `ChainIntent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    CreateProgram,
    UpdateProgramStatus,
    SubmitClaim,
    ApproveClaim,
    RejectClaim,
    EnrollInProgram,
    Deposit,
    UpdateAutomationConfig,
}

impl IntentKind {
    pub const ALL: [IntentKind; 8] = [
        IntentKind::CreateProgram,
        IntentKind::UpdateProgramStatus,
        IntentKind::SubmitClaim,
        IntentKind::ApproveClaim,
        IntentKind::RejectClaim,
        IntentKind::EnrollInProgram,
        IntentKind::Deposit,
        IntentKind::UpdateAutomationConfig,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IntentKind::CreateProgram => "create_program",
            IntentKind::UpdateProgramStatus => "update_program_status",
            IntentKind::SubmitClaim => "submit_claim",
            IntentKind::ApproveClaim => "approve_claim",
            IntentKind::RejectClaim => "reject_claim",
            IntentKind::EnrollInProgram => "enroll_in_program",
            IntentKind::Deposit => "deposit",
            IntentKind::UpdateAutomationConfig => "update_automation_config",
        }
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntentKind {
    type Err = EncodingError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim().to_lowercase().replace('-', "_");
        IntentKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| EncodingError::UnknownEnumValue {
                kind: "intent kind",
                value: value.to_string(),
            })
    }
}
