//! Weighted SimHash fingerprints over shingle features.
//!
//! A document's filtered tokens become overlapping shingles, each weighted
//! by its repetition count, and the shingles vote bit-by-bit into a single
//! 64-bit [`Fingerprint`]. Near-identical token streams produce fingerprints
//! a few bits apart, which the index layer exploits for blocked retrieval.

mod config;
mod error;
mod features;
mod simhash;

pub use config::{FingerprintConfig, DEFAULT_WINDOW, FINGERPRINT_BITS};
pub use error::FingerprintError;
pub use features::{shingle_features, FeatureSet};
pub use simhash::{simhash, Fingerprint};

/// Shingle and fingerprint a token stream in one call.
pub fn fingerprint_tokens<S: AsRef<str>>(
    tokens: &[S],
    cfg: &FingerprintConfig,
) -> Result<Fingerprint, FingerprintError> {
    simhash(&shingle_features(tokens, cfg.window), cfg)
}
