//! Hex helpers for canonical hash representations.
//!
//! Hashes are exchanged as lowercase hex (lookups, commit headers) and
//! stored as raw bytes everywhere else.

use crate::error::{RehashError, RehashResult};

/// Decode a hex string into exactly `width` bytes
pub fn decode_hex(hex_str: &str, width: usize) -> RehashResult<Vec<u8>> {
    if hex_str.len() != width * 2 {
        return Err(RehashError::InvalidHash {
            expected: format!("{} hex characters", width * 2),
            actual: format!("{} characters", hex_str.len()),
        });
    }
    hex::decode(hex_str).map_err(|e| RehashError::InvalidHash {
        expected: "valid hex string".to_string(),
        actual: format!("invalid hex: {}", e),
    })
}

/// Check that a string is lowercase hex, the form written into headers
pub fn is_lower_hex(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
