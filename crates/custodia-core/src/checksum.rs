//! Content-addressed integrity hashing.
//!
//! Archived file content is fingerprinted with SHA-256 at execution time;
//! the stored digest is write-once and every later comparison against it
//! is an integrity check.

use sha2::{Digest, Sha256};

/// Length of a SHA-256 hex digest.
pub const CHECKSUM_HEX_LEN: usize = 64;

/// Compute the SHA-256 digest of content as 64 lowercase hex characters.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Whether a string is a well-formed stored checksum.
pub fn is_valid_checksum(s: &str) -> bool {
    s.len() == CHECKSUM_HEX_LEN && s.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
}
