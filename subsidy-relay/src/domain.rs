//! Domain payloads carried by chain intents
//!
//! Field names serialise in camelCase to match the JSON the dashboard and the
//! off-chain store exchange; the metadata hash is computed over exactly this
//! serialisation. Unknown fields are rejected: a field the hash cannot see
//! must not be accepted.

use serde::{Deserialize, Serialize};

use crate::error::EncodingError;

/// A domain enum with a fixed integer code on the contract side.
///
/// The mapping is closed: `from_domain` only accepts the listed variants and
/// never falls back to a default.
pub trait ContractEnum: Sized + Copy + 'static {
    /// Human-readable name used in errors.
    const KIND: &'static str;
    /// Every variant, in code order.
    const VARIANTS: &'static [Self];

    fn code(self) -> u8;

    /// Canonical domain spelling (snake_case).
    fn as_str(self) -> &'static str;

    /// Parses a domain value. Case, surrounding whitespace, and `-`/space
    /// separators are normalised; anything else outside the set is rejected.
    fn from_domain(value: &str) -> Result<Self, EncodingError> {
        let wanted = value.trim().to_lowercase().replace(['-', ' '], "_");
        Self::VARIANTS
            .iter()
            .copied()
            .find(|variant| variant.as_str() == wanted)
            .ok_or_else(|| EncodingError::UnknownEnumValue {
                kind: Self::KIND,
                value: value.to_string(),
            })
    }
}

macro_rules! contract_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($variant:ident => ($text:literal, $code:literal)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub enum $name {
            $($variant),+
        }

        impl ContractEnum for $name {
            const KIND: &'static str = $kind;
            const VARIANTS: &'static [Self] = &[$($name::$variant),+];

            fn code(self) -> u8 {
                match self {
                    $($name::$variant => $code),+
                }
            }

            fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = EncodingError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                <Self as ContractEnum>::from_domain(value)
            }
        }

        impl TryFrom<String> for $name {
            type Error = EncodingError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.as_str().to_string()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

contract_enum! {
    /// Kind of support a programme provides.
    ProgramType, "program type" {
        Subsidy => ("subsidy", 0),
        Grant => ("grant", 1),
        Loan => ("loan", 2),
        Insurance => ("insurance", 3),
        InputSupply => ("input_supply", 4),
    }
}

contract_enum! {
    ProgramStatus, "program status" {
        Draft => ("draft", 0),
        Active => ("active", 1),
        Paused => ("paused", 2),
        Completed => ("completed", 3),
        Cancelled => ("cancelled", 4),
    }
}

contract_enum! {
    /// Basis on which a payout amount is applied.
    PayoutUnit, "payout unit" {
        PerHectare => ("per_hectare", 0),
        PerFarm => ("per_farm", 1),
        PerKilogram => ("per_kilogram", 2),
    }
}

/// How much a programme pays and on what basis. Amounts are decimal strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PayoutRule {
    pub amount: String,
    pub unit: PayoutUnit,
    pub max_per_farm: String,
}

/// Who may enrol. Only the farm-size bounds go on-chain; the free-text
/// lists live off-chain and are covered by the metadata hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EligibilityRule {
    pub min_farm_size_hectares: u64,
    pub max_farm_size_hectares: u64,
    #[serde(default)]
    pub eligible_crops: Vec<String>,
    #[serde(default)]
    pub regions: Vec<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProgramPayload {
    pub name: String,
    pub description: String,
    pub program_type: ProgramType,
    pub status: ProgramStatus,
    /// ISO-8601 date or date-time
    pub start_date: String,
    /// ISO-8601 date or date-time
    pub end_date: String,
    /// Backend user id of the programme creator
    pub creator_id: u64,
    pub payout_rule: PayoutRule,
    pub eligibility_rule: EligibilityRule,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProgramStatusChange {
    pub program_id: u64,
    pub status: ProgramStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ClaimedProduce {
    pub name: String,
    pub quantity_kg: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ClaimPayload {
    pub program_id: u64,
    pub farm_id: u64,
    /// Requested amount as a decimal string
    pub amount: String,
    #[serde(default)]
    pub produce: Vec<ClaimedProduce>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ClaimDecision {
    pub claim_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ClaimRejection {
    pub claim_id: u64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Enrollment {
    pub program_id: u64,
    pub farm_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DepositPayload {
    pub program_id: u64,
    /// Amount to send as transaction value, decimal string
    pub amount: String,
}

/// Settings for the contract's automated payout runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AutomationConfig {
    pub enabled: bool,
    pub interval_seconds: u64,
    pub max_batch_size: u64,
}
