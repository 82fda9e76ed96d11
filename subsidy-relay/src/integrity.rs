//! Metadata integrity verification
//!
//! Compares the hash a programme committed on-chain with the canonical hash
//! of the payload the off-chain store holds for it. A mismatch means the
//! stored payload is not the one that was submitted.

use chain_clients_evm::abi::{AbiType, AbiValue};
use ethereum_types::U256;
use serde::Serialize;
use tracing::{info, warn};

use crate::chain::{CallSpec, ChainClient};
use crate::contract::functions;
use crate::domain::ProgramPayload;
use crate::encoder::{compute_metadata_hash, MetadataHash};
use crate::error::ChainError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityReport {
    pub program_id: u64,
    /// Recomputed from the stored payload
    pub expected: MetadataHash,
    /// Read from the contract
    pub committed: MetadataHash,
    pub matches: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum IntegrityError {
    #[error(transparent)]
    Encoding(#[from] crate::error::EncodingError),
    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Number of programmes created so far.
pub async fn program_count<C: ChainClient + ?Sized>(client: &C) -> Result<U256, ChainError> {
    let values = client
        .read(&CallSpec {
            function: functions::PROGRAM_COUNT,
            args: vec![],
            returns: vec![AbiType::Uint],
        })
        .await?;
    single(values, "programCount", AbiValue::as_uint)
}

/// The metadata hash committed when the programme was created.
pub async fn read_program_metadata_hash<C: ChainClient + ?Sized>(
    client: &C,
    program_id: u64,
) -> Result<MetadataHash, ChainError> {
    let values = client
        .read(&CallSpec {
            function: functions::PROGRAM_METADATA_HASH,
            args: vec![AbiValue::from(program_id)],
            returns: vec![AbiType::Bytes32],
        })
        .await?;
    single(values, "programMetadataHash", AbiValue::as_bytes32).map(MetadataHash::from)
}

pub async fn verify_program_metadata<C: ChainClient + ?Sized>(
    client: &C,
    program_id: u64,
    stored: &ProgramPayload,
) -> Result<IntegrityReport, IntegrityError> {
    let expected = compute_metadata_hash(stored)?;
    let committed = read_program_metadata_hash(client, program_id).await?;
    let matches = expected == committed;

    if matches {
        info!("Programme {} metadata matches on-chain hash {}", program_id, committed);
    } else {
        warn!(
            "Programme {} metadata mismatch: stored payload hashes to {}, chain has {}",
            program_id, expected, committed
        );
    }

    Ok(IntegrityReport {
        program_id,
        expected,
        committed,
        matches,
    })
}

fn single<T>(
    values: Vec<AbiValue>,
    context: &str,
    take: impl FnOnce(&AbiValue) -> Option<T>,
) -> Result<T, ChainError> {
    values
        .first()
        .and_then(take)
        .ok_or_else(|| ChainError::Decode {
            context: context.to_string(),
            reason: format!("unexpected return values {:?}", values),
        })
}
