//! Byte encoding of keys and values.
//!
//! Keys are stored as their UTF-8 bytes. Values are stored as ASCII decimal
//! strings with no padding, so the reverse table is ordered lexicographically by
//! digits: `"10"` sorts before `"9"`. Sampling seeks through that order, which
//! makes it biased toward entries that follow large gaps in the string order.
//! Changing the encoding would invalidate existing data directories.

use crate::error::{Error, Result};

/// Encode a value for storage.
pub fn encode_value(value: u64) -> Vec<u8> {
    value.to_string().into_bytes()
}

/// Decode a stored value.
///
/// # Errors
///
/// Returns [`Error::Corrupt`] if the bytes are not a decimal `u64`.
pub fn decode_value(bytes: &[u8]) -> Result<u64> {
    std::str::from_utf8(bytes)
        .ok()
        .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| {
            let shown = String::from_utf8_lossy(bytes);
            Error::corrupt(format!("stored value {shown:?} is not a decimal integer"))
        })
}

/// Decode a stored key.
///
/// # Errors
///
/// Returns [`Error::Corrupt`] if the bytes are not valid UTF-8.
pub fn decode_key(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|e| Error::corrupt(format!("stored key is not UTF-8: {e}")))
}
