//! Lenient hex codec used by the delivery-provider cipher

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Regex matching one hex byte (two digits, either case)
    static ref HEX_PAIR_REGEX: Regex = Regex::new(r"[0-9a-fA-F]{2}").unwrap();
}

/// Decode every hex pair found in `text`, skipping anything else.
/// Never fails: input without a single valid pair yields an empty buffer.
pub fn hex_to_bytes(text: &str) -> Vec<u8> {
    HEX_PAIR_REGEX
        .find_iter(text.trim())
        .filter_map(|m| u8::from_str_radix(m.as_str(), 16).ok())
        .collect()
}

/// Encode as lowercase hex, two digits per byte, no separator
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}
