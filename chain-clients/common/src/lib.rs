//! Shared hex helpers for chain clients
//!
//! JSON-RPC nodes and wallets are inconsistent about `0x` prefixes and letter
//! case. These helpers normalise values before they are compared or sent.

use std::num::ParseIntError;

/// Strips a leading `0x`/`0X` if present.
pub fn strip_hex_prefix(value: &str) -> &str {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value)
}

/// Returns the value lowercased with exactly one `0x` prefix.
pub fn normalize_hex(value: &str) -> String {
    format!("0x{}", strip_hex_prefix(value.trim()).to_lowercase())
}

/// Case- and prefix-insensitive comparison of two hex strings.
pub fn hex_eq(a: &str, b: &str) -> bool {
    strip_hex_prefix(a.trim()).eq_ignore_ascii_case(strip_hex_prefix(b.trim()))
}

/// Parses a JSON-RPC quantity (`"0x1a"`) into a u64.
pub fn parse_hex_u64(value: &str) -> Result<u64, ParseIntError> {
    u64::from_str_radix(strip_hex_prefix(value), 16)
}
