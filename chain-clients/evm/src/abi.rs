//! Minimal Solidity ABI codec
//!
//! Covers the parameter types used by the contracts this workspace talks to:
//! `uint256` (and narrower unsigned ints, which share its 32-byte word),
//! `address`, `bool`, `bytes32`, and `string`.
//!
//! Layout follows the ABI head/tail scheme: static values occupy one word in
//! the head, dynamic values put an offset in the head and their length-prefixed
//! bytes in the tail.

use chain_clients_common::strip_hex_prefix;
use ethereum_types::{H160, H256, U256};
use serde::Serialize;
use sha3::{Digest, Keccak256};
use thiserror::Error;

const WORD: usize = 32;

/// Parameter type tags used for decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbiType {
    Uint,
    Address,
    Bool,
    Bytes32,
    String,
}

impl AbiType {
    fn name(self) -> &'static str {
        match self {
            AbiType::Uint => "uint",
            AbiType::Address => "address",
            AbiType::Bool => "bool",
            AbiType::Bytes32 => "bytes32",
            AbiType::String => "string",
        }
    }
}

/// A single ABI-encodable value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AbiValue {
    Uint(U256),
    Address(H160),
    Bool(bool),
    Bytes32(H256),
    String(String),
}

impl AbiValue {
    pub fn abi_type(&self) -> AbiType {
        match self {
            AbiValue::Uint(_) => AbiType::Uint,
            AbiValue::Address(_) => AbiType::Address,
            AbiValue::Bool(_) => AbiType::Bool,
            AbiValue::Bytes32(_) => AbiType::Bytes32,
            AbiValue::String(_) => AbiType::String,
        }
    }

    pub fn as_uint(&self) -> Option<U256> {
        match self {
            AbiValue::Uint(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<H160> {
        match self {
            AbiValue::Address(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AbiValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bytes32(&self) -> Option<H256> {
        match self {
            AbiValue::Bytes32(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AbiValue::String(value) => Some(value),
            _ => None,
        }
    }
}

impl From<u64> for AbiValue {
    fn from(value: u64) -> Self {
        AbiValue::Uint(U256::from(value))
    }
}

impl From<U256> for AbiValue {
    fn from(value: U256) -> Self {
        AbiValue::Uint(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    #[error("ABI data too short: need {needed} bytes at offset {offset}, have {len}")]
    OutOfBounds {
        offset: usize,
        needed: usize,
        len: usize,
    },

    #[error("Invalid {kind} word: {reason}")]
    InvalidWord { kind: &'static str, reason: String },

    #[error("Invalid hex: {0}")]
    Hex(String),
}

/// Keccak-256 of arbitrary bytes.
pub fn keccak256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// First four bytes of the Keccak-256 of a canonical function signature,
/// e.g. `approveClaim(uint256)`.
pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// topics[0] for an event signature, 0x-prefixed lowercase hex as returned by nodes.
pub fn event_topic(signature: &str) -> String {
    format!("0x{}", hex::encode(keccak256(signature.as_bytes())))
}

/// Selector followed by the encoded arguments.
pub fn encode_call(signature: &str, args: &[AbiValue]) -> Vec<u8> {
    let mut calldata = function_selector(signature).to_vec();
    calldata.extend(encode_args(args));
    calldata
}

/// Head/tail encoding of an argument tuple.
pub fn encode_args(args: &[AbiValue]) -> Vec<u8> {
    let head_len = WORD * args.len();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for arg in args {
        match arg {
            AbiValue::String(value) => {
                head.extend_from_slice(&uint_word(U256::from(head_len + tail.len())));
                tail.extend_from_slice(&uint_word(U256::from(value.len())));
                tail.extend_from_slice(value.as_bytes());
                let padding = (WORD - value.len() % WORD) % WORD;
                tail.resize(tail.len() + padding, 0);
            }
            AbiValue::Uint(value) => head.extend_from_slice(&uint_word(*value)),
            AbiValue::Address(value) => {
                let mut word = [0u8; WORD];
                word[12..].copy_from_slice(value.as_bytes());
                head.extend_from_slice(&word);
            }
            AbiValue::Bool(value) => {
                head.extend_from_slice(&uint_word(U256::from(u8::from(*value))))
            }
            AbiValue::Bytes32(value) => head.extend_from_slice(value.as_bytes()),
        }
    }

    head.extend(tail);
    head
}

/// Decodes an argument tuple (event data or call return data).
pub fn decode_args(data: &[u8], types: &[AbiType]) -> Result<Vec<AbiValue>, AbiError> {
    types
        .iter()
        .enumerate()
        .map(|(index, ty)| {
            let word = read_word(data, index * WORD)?;
            match ty {
                AbiType::String => decode_string(data, word),
                static_type => decode_static(word, *static_type),
            }
        })
        .collect()
}

/// Decodes a single indexed topic. Dynamic types are hashed when indexed and
/// cannot be recovered, so only static types are accepted.
pub fn decode_topic(topic: &str, ty: AbiType) -> Result<AbiValue, AbiError> {
    if ty == AbiType::String {
        return Err(AbiError::InvalidWord {
            kind: "string",
            reason: "indexed dynamic values are hashed".to_string(),
        });
    }
    let bytes = decode_hex(topic)?;
    let word = read_word(&bytes, 0)?;
    if bytes.len() != WORD {
        return Err(AbiError::InvalidWord {
            kind: ty.name(),
            reason: format!("topic is {} bytes, expected 32", bytes.len()),
        });
    }
    decode_static(word, ty)
}

/// Decodes 0x-prefixed (or bare) hex.
pub fn decode_hex(value: &str) -> Result<Vec<u8>, AbiError> {
    hex::decode(strip_hex_prefix(value)).map_err(|e| AbiError::Hex(e.to_string()))
}

fn uint_word(value: U256) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    value.to_big_endian(&mut word);
    word
}

fn read_word(data: &[u8], offset: usize) -> Result<&[u8], AbiError> {
    data.get(offset..offset + WORD).ok_or(AbiError::OutOfBounds {
        offset,
        needed: WORD,
        len: data.len(),
    })
}

fn decode_static(word: &[u8], ty: AbiType) -> Result<AbiValue, AbiError> {
    match ty {
        AbiType::Uint => Ok(AbiValue::Uint(U256::from_big_endian(word))),
        AbiType::Address => {
            if word[..12].iter().any(|b| *b != 0) {
                return Err(AbiError::InvalidWord {
                    kind: "address",
                    reason: "high 12 bytes are not zero".to_string(),
                });
            }
            Ok(AbiValue::Address(H160::from_slice(&word[12..])))
        }
        AbiType::Bool => match U256::from_big_endian(word) {
            v if v.is_zero() => Ok(AbiValue::Bool(false)),
            v if v == U256::one() => Ok(AbiValue::Bool(true)),
            v => Err(AbiError::InvalidWord {
                kind: "bool",
                reason: format!("value {} is neither 0 nor 1", v),
            }),
        },
        AbiType::Bytes32 => Ok(AbiValue::Bytes32(H256::from_slice(word))),
        AbiType::String => Err(AbiError::InvalidWord {
            kind: "string",
            reason: "dynamic type in static position".to_string(),
        }),
    }
}

fn decode_string(data: &[u8], offset_word: &[u8]) -> Result<AbiValue, AbiError> {
    let offset = word_to_usize(offset_word, data.len())?;
    let len = word_to_usize(read_word(data, offset)?, data.len())?;
    let start = offset + WORD;
    let bytes = data.get(start..start + len).ok_or(AbiError::OutOfBounds {
        offset: start,
        needed: len,
        len: data.len(),
    })?;
    String::from_utf8(bytes.to_vec())
        .map(AbiValue::String)
        .map_err(|e| AbiError::InvalidWord {
            kind: "string",
            reason: e.to_string(),
        })
}

/// Offsets and lengths can never exceed the buffer they index into.
fn word_to_usize(word: &[u8], limit: usize) -> Result<usize, AbiError> {
    let value = U256::from_big_endian(word);
    if value > U256::from(limit) {
        return Err(AbiError::OutOfBounds {
            offset: 0,
            needed: value.low_u64() as usize,
            len: limit,
        });
    }
    Ok(value.as_usize())
}
