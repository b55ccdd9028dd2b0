use std::time::Duration;

use canonical::{CanonicalError, NormalizeConfig};
use fingerprint::{FingerprintConfig, FingerprintError, FINGERPRINT_BITS};
use index::{BackendConfig, IndexError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Digest reported for documents that could not be fingerprinted.
pub const ZERO_FINGERPRINT_HEX: &str = "0000000000000000";

/// An input record as it arrives from upstream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawRecord {
    /// External identifier, opaque to the engine.
    pub id: String,
    pub content: String,
    /// Optional publication timestamp; RFC 3339 or `YYYY-MM-DD HH:MM:SS`.
    /// Used only for representative tie-breaking during reconciliation.
    #[serde(default)]
    pub publish_time: Option<String>,
}

impl RawRecord {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            publish_time: None,
        }
    }

    pub fn with_publish_time(mut self, publish_time: impl Into<String>) -> Self {
        self.publish_time = Some(publish_time.into());
        self
    }
}

/// Which signal established a duplicate relation, strongest first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MatchReason {
    /// Same external id was already registered.
    #[serde(rename = "exact-id")]
    ExactId,
    /// Identical normalized-content hash.
    #[serde(rename = "content-hash")]
    ContentHash,
    /// Fingerprint within the Hamming threshold.
    #[serde(rename = "simhash")]
    SimHash,
}

/// Per-record classification attached on ingest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Verdict {
    pub is_duplicate: bool,
    /// Representative the record was folded into, when duplicate.
    pub duplicate_of: Option<String>,
    pub reason: Option<MatchReason>,
    /// The record's own fingerprint digest, 16 hex digits. All zeros for
    /// non-comparable content.
    pub duplicate_id: String,
    /// Similarity to the matched record, rounded to three decimals. `1.0`
    /// for exact matches and for fresh representatives, `0.0` when not
    /// comparable.
    pub duplication_rate: f64,
    /// Hamming distance to the matched record. `None` when the content was
    /// not comparable.
    pub hamming_distance: Option<u32>,
    pub simhash_value: String,
}

impl Verdict {
    /// Verdict for content that produced no tokens.
    pub(crate) fn not_comparable() -> Self {
        Self {
            is_duplicate: false,
            duplicate_of: None,
            reason: None,
            duplicate_id: ZERO_FINGERPRINT_HEX.to_owned(),
            duplication_rate: 0.0,
            hamming_distance: None,
            simhash_value: ZERO_FINGERPRINT_HEX.to_owned(),
        }
    }
}

/// An input record with its verdict.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnnotatedRecord {
    pub record: RawRecord,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupMember {
    pub doc_id: String,
    /// Similarity to the representative at join time.
    pub similarity: f64,
}

/// A duplicate group grown incrementally during ingest. The representative
/// is the first-seen member and never changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DuplicateGroup {
    pub representative_id: String,
    /// Signal that created the group.
    pub formation_reason: MatchReason,
    /// All members including the representative itself.
    pub members: Vec<GroupMember>,
}

/// A record dropped during reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemovedRecord {
    pub id: String,
    /// Surviving record it collapsed into.
    pub representative_id: String,
    pub similarity: f64,
}

/// Summary of one reconciliation run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReconcileOutcome {
    pub original_count: usize,
    pub deduplicated_count: usize,
    pub removed_count: usize,
    /// Distinct representatives that absorbed at least one record.
    pub group_count: usize,
    /// Survivors in original input order.
    pub survivors: Vec<RawRecord>,
    pub removed: Vec<RemovedRecord>,
}

/// Engine configuration. Defaults match a single-process deployment with
/// an in-memory index.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub normalize: NormalizeConfig,
    pub fingerprint: FingerprintConfig,
    /// Blocks the fingerprint is split into for retrieval.
    pub num_blocks: usize,
    /// Maximum Hamming distance treated as a duplicate. Must stay below
    /// the block width (`64 / num_blocks`); beyond it, blocked retrieval
    /// can miss matches and the distance loses meaning as a duplicate
    /// signal.
    pub hamming_threshold: u32,
    /// Normalized edit-distance floor for the reconciliation fallback.
    pub fallback_similarity: f64,
    /// Optional index entry lifetime.
    pub ttl: Option<Duration>,
    pub backend: BackendConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            normalize: NormalizeConfig::default(),
            fingerprint: FingerprintConfig::default(),
            num_blocks: 4,
            hamming_threshold: 4,
            fallback_similarity: 0.85,
            ttl: None,
            backend: BackendConfig::InMemory,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_num_blocks(mut self, num_blocks: usize) -> Self {
        self.num_blocks = num_blocks;
        self
    }

    pub fn with_hamming_threshold(mut self, threshold: u32) -> Self {
        self.hamming_threshold = threshold;
        self
    }

    pub fn with_fallback_similarity(mut self, similarity: f64) -> Self {
        self.fallback_similarity = similarity;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_backend(mut self, backend: BackendConfig) -> Self {
        self.backend = backend;
        self
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let bits = FINGERPRINT_BITS as usize;
        if self.num_blocks == 0 || bits % self.num_blocks != 0 {
            return Err(EngineError::InvalidConfig(format!(
                "num_blocks must divide {bits}, got {}",
                self.num_blocks
            )));
        }
        let block_width = FINGERPRINT_BITS / self.num_blocks as u32;
        if self.hamming_threshold >= block_width {
            return Err(EngineError::InvalidConfig(format!(
                "hamming_threshold {} must be below the block width {block_width}",
                self.hamming_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.fallback_similarity) {
            return Err(EngineError::InvalidConfig(format!(
                "fallback_similarity must be in [0, 1], got {}",
                self.fallback_similarity
            )));
        }
        self.fingerprint.validate()?;
        if self.normalize.version == 0 {
            return Err(EngineError::InvalidConfig(
                "normalize version must be >= 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Error, Clone)]
pub enum EngineError {
    #[error("invalid engine config: {0}")]
    InvalidConfig(String),

    #[error("normalization failed: {0}")]
    Canonical(#[from] CanonicalError),

    #[error("fingerprinting failed: {0}")]
    Fingerprint(#[from] FingerprintError),

    /// Index failures abort the whole operation; a half-written index must
    /// not silently report records as unique.
    #[error("index failure: {0}")]
    Index(#[from] IndexError),
}
