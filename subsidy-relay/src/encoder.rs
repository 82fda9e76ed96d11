//! Domain Encoder
//!
//! Pure, deterministic functions turning domain intents into contract-ready
//! calls: closed enum mapping, ISO dates to Unix seconds, decimal amounts to
//! 18-decimal fixed point, and the canonical metadata hash that links the
//! off-chain payload to its on-chain commitment.

use chain_clients_evm::abi::{encode_call, keccak256, AbiValue};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use ethereum_types::{H256, U256};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;

use crate::contract::{functions, AMOUNT_DECIMALS};
use crate::domain::{ContractEnum, PayoutUnit, ProgramPayload, ProgramStatus, ProgramType};
use crate::error::EncodingError;
use crate::intent::{ChainIntent, IntentKind};

// ============================================================================
// SCALAR ENCODERS
// ============================================================================

/// Maps a domain enum spelling to its contract code. Never defaults.
pub fn encode_enum<E: ContractEnum>(value: &str) -> Result<u8, EncodingError> {
    Ok(E::from_domain(value)?.code())
}

/// Converts an ISO-8601 date or date-time into Unix seconds.
///
/// Accepts RFC 3339 (`2025-01-01T00:00:00.000Z`), a zone-less date-time
/// (read as UTC) and a bare date (midnight UTC). Sub-second precision is
/// truncated.
pub fn encode_timestamp(value: &str) -> Result<u64, EncodingError> {
    let trimmed = value.trim();
    let invalid = |reason: &str| EncodingError::InvalidDate {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let seconds = if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        dt.timestamp()
    } else if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        Utc.from_utc_datetime(&naive).timestamp()
    } else if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| invalid("no midnight on this date"))?;
        Utc.from_utc_datetime(&midnight).timestamp()
    } else {
        return Err(invalid("not an ISO-8601 date"));
    };

    u64::try_from(seconds).map_err(|_| invalid("before the Unix epoch"))
}

/// Converts a non-negative decimal string into the contract's fixed-point
/// unit (10^18 per whole unit) without floating point.
pub fn encode_amount(value: &str) -> Result<U256, EncodingError> {
    let trimmed = value.trim();
    let invalid = |reason: String| EncodingError::InvalidAmount {
        value: value.to_string(),
        reason,
    };

    if trimmed.starts_with('-') {
        return Err(EncodingError::AmountOutOfRange {
            value: value.to_string(),
            reason: "amount is negative".to_string(),
        });
    }

    let (whole, fraction) = match trimmed.split_once('.') {
        Some((whole, fraction)) => {
            if fraction.is_empty() {
                return Err(invalid("missing digits after the decimal point".to_string()));
            }
            (whole, fraction)
        }
        None => (trimmed, ""),
    };

    if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("expected decimal digits".to_string()));
    }
    if !fraction.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("expected decimal digits".to_string()));
    }

    // Trailing zeros carry no precision.
    let fraction = fraction.trim_end_matches('0');
    if fraction.len() > AMOUNT_DECIMALS {
        return Err(invalid(format!(
            "more than {} decimal places",
            AMOUNT_DECIMALS
        )));
    }

    let digits = format!("{}{:0<width$}", whole, fraction, width = AMOUNT_DECIMALS);
    U256::from_dec_str(&digits).map_err(|_| EncodingError::AmountOutOfRange {
        value: value.to_string(),
        reason: "exceeds uint256".to_string(),
    })
}

// ============================================================================
// METADATA HASH
// ============================================================================

/// Keccak-256 digest of a canonical JSON payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetadataHash(pub [u8; 32]);

impl MetadataHash {
    pub fn to_h256(self) -> H256 {
        H256(self.0)
    }
}

impl From<H256> for MetadataHash {
    fn from(value: H256) -> Self {
        MetadataHash(value.0)
    }
}

impl fmt::Display for MetadataHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl Serialize for MetadataHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Serialises a JSON value with object keys in byte order at every depth and
/// no insignificant whitespace.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.as_bytes().cmp(b.as_bytes()));
            out.push('{');
            for (index, (key, item)) in entries.into_iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Hashes the canonical JSON form of any serialisable payload.
pub fn compute_metadata_hash<T: Serialize>(payload: &T) -> Result<MetadataHash, EncodingError> {
    let value = serde_json::to_value(payload)?;
    Ok(hash_canonical(&canonical_json(&value)))
}

fn hash_canonical(canonical: &str) -> MetadataHash {
    MetadataHash(keccak256(canonical.as_bytes()))
}

// ============================================================================
// INTENT ENCODING
// ============================================================================

/// Contract-ready call: function signature, ordered arguments and the value
/// to attach (payable calls only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodedCall {
    pub function: &'static str,
    pub args: Vec<AbiValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
}

impl EncodedCall {
    fn new(function: &'static str, args: Vec<AbiValue>) -> Self {
        Self {
            function,
            args,
            value: None,
        }
    }

    /// Selector plus ABI-encoded arguments.
    pub fn calldata(&self) -> Vec<u8> {
        encode_call(self.function, &self.args)
    }
}

/// Everything the encoder produces for one intent. `canonical_payload` is the
/// exact byte string that was hashed and is what the off-chain store should
/// persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodedIntent {
    pub kind: IntentKind,
    pub call: EncodedCall,
    pub metadata_hash: MetadataHash,
    pub canonical_payload: String,
}

/// Encodes an intent. Fails before any network interaction.
pub fn encode_intent(intent: &ChainIntent) -> Result<EncodedIntent, EncodingError> {
    let canonical_payload = canonical_json(&intent.payload_json()?);
    let metadata_hash = hash_canonical(&canonical_payload);

    let call = match intent {
        ChainIntent::CreateProgram(program) => encode_create_program(program, metadata_hash)?,
        ChainIntent::UpdateProgramStatus(change) => EncodedCall::new(
            functions::UPDATE_PROGRAM_STATUS,
            vec![
                change.program_id.into(),
                enum_arg(change.status.code()),
            ],
        ),
        ChainIntent::SubmitClaim(claim) => EncodedCall::new(
            functions::SUBMIT_CLAIM,
            vec![
                claim.program_id.into(),
                claim.farm_id.into(),
                encode_amount(&claim.amount)?.into(),
                AbiValue::Bytes32(metadata_hash.to_h256()),
            ],
        ),
        ChainIntent::ApproveClaim(decision) => {
            EncodedCall::new(functions::APPROVE_CLAIM, vec![decision.claim_id.into()])
        }
        ChainIntent::RejectClaim(rejection) => EncodedCall::new(
            functions::REJECT_CLAIM,
            vec![
                rejection.claim_id.into(),
                AbiValue::String(rejection.reason.clone()),
            ],
        ),
        ChainIntent::EnrollInProgram(enrollment) => EncodedCall::new(
            functions::ENROLL_IN_PROGRAM,
            vec![enrollment.program_id.into(), enrollment.farm_id.into()],
        ),
        ChainIntent::Deposit(deposit) => {
            let amount = encode_amount(&deposit.amount)?;
            EncodedCall {
                value: Some(amount),
                ..EncodedCall::new(functions::DEPOSIT, vec![deposit.program_id.into()])
            }
        }
        ChainIntent::UpdateAutomationConfig(automation) => EncodedCall::new(
            functions::UPDATE_AUTOMATION_CONFIG,
            vec![
                AbiValue::Bool(automation.enabled),
                automation.interval_seconds.into(),
                automation.max_batch_size.into(),
            ],
        ),
    };

    Ok(EncodedIntent {
        kind: intent.kind(),
        call,
        metadata_hash,
        canonical_payload,
    })
}

fn encode_create_program(
    program: &ProgramPayload,
    metadata_hash: MetadataHash,
) -> Result<EncodedCall, EncodingError> {
    let start = encode_timestamp(&program.start_date)?;
    let end = encode_timestamp(&program.end_date)?;
    let payout = &program.payout_rule;
    let eligibility = &program.eligibility_rule;

    Ok(EncodedCall::new(
        functions::CREATE_PROGRAM,
        vec![
            AbiValue::String(program.name.clone()),
            AbiValue::String(program.description.clone()),
            enum_arg(ProgramType::code(program.program_type)),
            enum_arg(ProgramStatus::code(program.status)),
            start.into(),
            end.into(),
            program.creator_id.into(),
            encode_amount(&payout.amount)?.into(),
            enum_arg(PayoutUnit::code(payout.unit)),
            encode_amount(&payout.max_per_farm)?.into(),
            eligibility.min_farm_size_hectares.into(),
            eligibility.max_farm_size_hectares.into(),
            AbiValue::Bytes32(metadata_hash.to_h256()),
        ],
    ))
}

fn enum_arg(code: u8) -> AbiValue {
    AbiValue::from(u64::from(code))
}
