//! Receipt Interpreter
//!
//! Finds the event that carries an intent's result in a confirmed receipt and
//! decodes it. Only logs emitted by the subsidy contract with the expected
//! topic and topic count are considered. If several match, the lowest log
//! index wins and the rest are reported as anomalies.

use chain_clients_common::{hex_eq, normalize_hex};
use chain_clients_evm::abi::{decode_args, decode_hex, decode_topic, AbiError, AbiValue};
use chain_clients_evm::{EvmLog, TransactionReceipt};
use ethereum_types::{H160, H256, U256};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::chain::TxHash;
use crate::contract::{expected_event, EventSpec};
use crate::intent::IntentKind;

/// Decoded fields of a subsidy contract event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event")]
pub enum EventPayload {
    #[serde(rename_all = "camelCase")]
    ProgramCreated {
        program_id: U256,
        creator: H160,
        metadata_hash: H256,
    },
    #[serde(rename_all = "camelCase")]
    ProgramStatusUpdated { program_id: U256, status: U256 },
    #[serde(rename_all = "camelCase")]
    ClaimSubmitted {
        claim_id: U256,
        program_id: U256,
        farmer: H160,
        amount: U256,
    },
    #[serde(rename_all = "camelCase")]
    ClaimApproved {
        claim_id: U256,
        approver: H160,
        amount: U256,
    },
    #[serde(rename_all = "camelCase")]
    ClaimRejected {
        claim_id: U256,
        reviewer: H160,
        reason: String,
    },
    #[serde(rename_all = "camelCase")]
    FarmerEnrolled {
        program_id: U256,
        farmer: H160,
        farm_id: U256,
    },
    #[serde(rename_all = "camelCase")]
    FundsDeposited {
        program_id: U256,
        from: H160,
        amount: U256,
    },
    #[serde(rename_all = "camelCase")]
    AutomationConfigUpdated {
        enabled: bool,
        interval: U256,
        max_batch_size: U256,
    },
}

/// The event that answers an intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMatch {
    pub kind: IntentKind,
    pub log_index: u64,
    pub transaction_hash: TxHash,
    pub payload: EventPayload,
}

impl EventMatch {
    /// Identifier the contract assigned to a newly created record, for the
    /// intents that create one.
    pub fn assigned_id(&self) -> Option<U256> {
        match &self.payload {
            EventPayload::ProgramCreated { program_id, .. } => Some(*program_id),
            EventPayload::ClaimSubmitted { claim_id, .. } => Some(*claim_id),
            _ => None,
        }
    }
}

/// The transaction confirmed but emitted no matching event. Not fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("No {event} event for {kind} in {tx_hash}")]
pub struct NoMatchFound {
    pub kind: IntentKind,
    pub event: &'static str,
    pub tx_hash: TxHash,
}

#[derive(Debug, Clone)]
pub struct ReceiptInterpreter {
    contract: String,
}

impl ReceiptInterpreter {
    pub fn new(contract_addr: &str) -> Self {
        Self {
            contract: normalize_hex(contract_addr),
        }
    }

    pub fn interpret(
        &self,
        kind: IntentKind,
        receipt: &TransactionReceipt,
    ) -> Result<EventMatch, NoMatchFound> {
        let spec = expected_event(kind);
        let topic = spec.topic();
        let tx_hash = TxHash::new(&receipt.transaction_hash);

        let mut candidates: Vec<&EvmLog> = receipt
            .logs
            .iter()
            .filter(|log| hex_eq(&log.address, &self.contract))
            .filter(|log| log.topics.first().is_some_and(|t0| hex_eq(t0, &topic)))
            .collect();
        // Nodes return logs in order, but do not rely on it.
        candidates.sort_by_key(|log| log.log_index_u64());

        let mut matches = candidates.into_iter().filter_map(|log| {
            match decode_event(spec, log) {
                Ok(payload) => Some((log.log_index_u64(), payload)),
                Err(e) => {
                    warn!(
                        "Skipping undecodable {} log {} in {}: {}",
                        spec.name, log.log_index, tx_hash, e
                    );
                    None
                }
            }
        });

        let Some((log_index, payload)) = matches.next() else {
            return Err(NoMatchFound {
                kind,
                event: spec.name,
                tx_hash: tx_hash.clone(),
            });
        };

        for (extra_index, _) in matches {
            warn!(
                "Anomaly: additional {} event at log {} in {}; using log {}",
                spec.name, extra_index, tx_hash, log_index
            );
        }

        debug!("Matched {} at log {} in {}", spec.name, log_index, tx_hash);
        Ok(EventMatch {
            kind,
            log_index,
            transaction_hash: tx_hash.clone(),
            payload,
        })
    }
}

fn decode_event(spec: &EventSpec, log: &EvmLog) -> Result<EventPayload, AbiError> {
    let indexed_topics = log.topics.get(1..).unwrap_or_default();
    if indexed_topics.len() != spec.indexed.len() {
        return Err(AbiError::InvalidWord {
            kind: "topic",
            reason: format!(
                "expected {} indexed topics, found {}",
                spec.indexed.len(),
                indexed_topics.len()
            ),
        });
    }

    let mut values = indexed_topics
        .iter()
        .zip(spec.indexed)
        .map(|(topic, ty)| decode_topic(topic, *ty))
        .collect::<Result<Vec<_>, _>>()?;
    values.extend(decode_args(&decode_hex(&log.data)?, spec.data)?);

    let mut fields = Fields(values.into_iter());
    let payload = match spec.name {
        "ProgramCreated" => EventPayload::ProgramCreated {
            program_id: fields.uint()?,
            creator: fields.address()?,
            metadata_hash: fields.bytes32()?,
        },
        "ProgramStatusUpdated" => EventPayload::ProgramStatusUpdated {
            program_id: fields.uint()?,
            status: fields.uint()?,
        },
        "ClaimSubmitted" => EventPayload::ClaimSubmitted {
            claim_id: fields.uint()?,
            program_id: fields.uint()?,
            farmer: fields.address()?,
            amount: fields.uint()?,
        },
        "ClaimApproved" => EventPayload::ClaimApproved {
            claim_id: fields.uint()?,
            approver: fields.address()?,
            amount: fields.uint()?,
        },
        "ClaimRejected" => EventPayload::ClaimRejected {
            claim_id: fields.uint()?,
            reviewer: fields.address()?,
            reason: fields.string()?,
        },
        "FarmerEnrolled" => EventPayload::FarmerEnrolled {
            program_id: fields.uint()?,
            farmer: fields.address()?,
            farm_id: fields.uint()?,
        },
        "FundsDeposited" => EventPayload::FundsDeposited {
            program_id: fields.uint()?,
            from: fields.address()?,
            amount: fields.uint()?,
        },
        "AutomationConfigUpdated" => EventPayload::AutomationConfigUpdated {
            enabled: fields.bool()?,
            interval: fields.uint()?,
            max_batch_size: fields.uint()?,
        },
        other => {
            return Err(AbiError::InvalidWord {
                kind: "event",
                reason: format!("no decoder for {}", other),
            })
        }
    };
    Ok(payload)
}

/// Positional reader over decoded event values.
struct Fields(std::vec::IntoIter<AbiValue>);

impl Fields {
    fn next_as<T>(
        &mut self,
        kind: &'static str,
        take: impl FnOnce(&AbiValue) -> Option<T>,
    ) -> Result<T, AbiError> {
        let value = self.0.next().ok_or_else(|| AbiError::InvalidWord {
            kind,
            reason: "missing field".to_string(),
        })?;
        take(&value).ok_or_else(|| AbiError::InvalidWord {
            kind,
            reason: format!("unexpected {:?}", value.abi_type()),
        })
    }

    fn uint(&mut self) -> Result<U256, AbiError> {
        self.next_as("uint", AbiValue::as_uint)
    }

    fn address(&mut self) -> Result<H160, AbiError> {
        self.next_as("address", AbiValue::as_address)
    }

    fn bytes32(&mut self) -> Result<H256, AbiError> {
        self.next_as("bytes32", AbiValue::as_bytes32)
    }

    fn bool(&mut self) -> Result<bool, AbiError> {
        self.next_as("bool", AbiValue::as_bool)
    }

    fn string(&mut self) -> Result<String, AbiError> {
        self.next_as("string", |value| value.as_str().map(str::to_string))
    }
}
