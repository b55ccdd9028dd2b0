//! Near-duplicate detection for frequently republished text records.
//!
//! The pipeline has four stages, one crate each, re-exported here:
//!
//! 1. `canonical` turns raw text into a deterministic identity string and
//!    filtered token stream.
//! 2. `fingerprint` folds weighted shingles into a 64-bit SimHash.
//! 3. `index` stores fingerprints in block buckets for candidate retrieval
//!    over pluggable key-value backends.
//! 4. `resolver` layers duplicate signals (external id, content hash,
//!    Hamming distance) into per-record verdicts, plus an export-time
//!    reconciliation pass with an edit-distance fallback.
//!
//! ```
//! use neardup::{DedupEngine, EngineConfig, RawRecord};
//!
//! let engine = DedupEngine::new(EngineConfig::default()).unwrap();
//! let verdict = engine
//!     .ingest(&RawRecord::new("doc-1", "Quarterly revenue rose sharply."))
//!     .unwrap();
//! assert!(!verdict.is_duplicate);
//! ```

pub use canonical::{
    hash_normalized_bytes, hash_text, normalize, CanonicalError, NormalizeConfig,
    NormalizedDocument,
};
pub use fingerprint::{
    fingerprint_tokens, shingle_features, simhash, FeatureSet, Fingerprint, FingerprintConfig,
    FingerprintError, DEFAULT_WINDOW, FINGERPRINT_BITS,
};
#[cfg(feature = "backend-redb")]
pub use index::RedbBackend;
pub use index::{
    block_values, BackendConfig, BlockIndex, BlockIndexConfig, CandidateEntry, DocEntry,
    InMemoryBackend, IndexBackend, IndexError, IndexStats, DEFAULT_SHARED_TTL,
};
pub use resolver::{
    filter_candidates, reconcile, AnnotatedRecord, DedupEngine, DuplicateGroup, EngineConfig,
    EngineError, GroupMember, MatchReason, RawRecord, ReconcileOutcome, RemovedRecord, Verdict,
    ZERO_FINGERPRINT_HEX,
};

use std::error::Error as StdError;
use std::fmt;

/// Errors from the one-call pipeline helpers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Normalization produced no tokens; the text cannot be fingerprinted.
    EmptyContent,
    Canonical(CanonicalError),
    Fingerprint(FingerprintError),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::EmptyContent => write!(f, "content is empty after normalization"),
            PipelineError::Canonical(e) => write!(f, "canonicalization failed: {e}"),
            PipelineError::Fingerprint(e) => write!(f, "fingerprinting failed: {e}"),
        }
    }
}

impl StdError for PipelineError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            PipelineError::EmptyContent => None,
            PipelineError::Canonical(e) => Some(e),
            PipelineError::Fingerprint(e) => Some(e),
        }
    }
}

impl From<CanonicalError> for PipelineError {
    fn from(e: CanonicalError) -> Self {
        PipelineError::Canonical(e)
    }
}

impl From<FingerprintError> for PipelineError {
    fn from(e: FingerprintError) -> Self {
        PipelineError::Fingerprint(e)
    }
}

/// Normalize and fingerprint a text in one call.
///
/// Text that normalizes to nothing is rejected here, so an all-zero
/// fingerprint can never reach an index.
pub fn fingerprint_text(
    text: &str,
    normalize_cfg: &NormalizeConfig,
    fingerprint_cfg: &FingerprintConfig,
) -> Result<(NormalizedDocument, Fingerprint), PipelineError> {
    let doc = normalize(text, normalize_cfg)?;
    if doc.is_empty() {
        return Err(PipelineError::EmptyContent);
    }
    let features = shingle_features(&doc.tokens, fingerprint_cfg.window);
    let fp = simhash(&features, fingerprint_cfg)?;
    Ok((doc, fp))
}

/// Similarity between two fingerprints, `1 - hamming / 64`.
pub fn similarity(a: Fingerprint, b: Fingerprint) -> f64 {
    a.similarity(&b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_text_round_trip() {
        let ncfg = NormalizeConfig::default();
        let fcfg = FingerprintConfig::default();
        let (doc, fp) = fingerprint_text("The market closed higher today.", &ncfg, &fcfg).unwrap();
        assert!(!doc.is_empty());
        assert_eq!(fp.to_hex().len(), 16);
        let (_, again) = fingerprint_text("The market closed higher today.", &ncfg, &fcfg).unwrap();
        assert_eq!(fp, again);
    }

    #[test]
    fn empty_text_rejected() {
        let err = fingerprint_text("<p> </p>", &NormalizeConfig::default(), &FingerprintConfig::default())
            .unwrap_err();
        assert_eq!(err, PipelineError::EmptyContent);
    }

    #[test]
    fn similarity_bounds() {
        assert_eq!(similarity(Fingerprint(7), Fingerprint(7)), 1.0);
        assert_eq!(similarity(Fingerprint(0), Fingerprint(u64::MAX)), 0.0);
    }
}
