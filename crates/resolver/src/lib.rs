//! Duplicate resolution over canonicalized, fingerprinted records.
//!
//! Two entry points: [`DedupEngine`] classifies records one at a time (or
//! in order-preserving batches) against a live index, and [`reconcile`]
//! re-groups a complete batch at export time with explicit keeper rules.

mod engine;
mod reconcile;
mod types;

pub use engine::{filter_candidates, DedupEngine};
pub use reconcile::reconcile;
pub use types::{
    AnnotatedRecord, DuplicateGroup, EngineConfig, EngineError, GroupMember, MatchReason,
    RawRecord, ReconcileOutcome, RemovedRecord, Verdict, ZERO_FINGERPRINT_HEX,
};
