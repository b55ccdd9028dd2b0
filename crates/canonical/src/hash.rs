//! Versioned content hashing.

use sha2::{Digest, Sha256};

/// Identity hash of normalized text under a given normalization version.
///
/// Computes `SHA-256(version_be || 0x00 || bytes)` and hex-encodes it.
/// Folding the version in keeps hashes produced by different normalization
/// schemas from ever colliding as "identical content".
pub fn hash_normalized_bytes(version: u32, bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(version.to_be_bytes());
    hasher.update([0u8]);
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Plain SHA-256 hex digest of arbitrary text, for logs and diagnostics.
/// Identity hashes go through [`hash_normalized_bytes`].
pub fn hash_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}
