use std::collections::HashMap;
use std::sync::RwLock;

use canonical::{normalize, NormalizedDocument};
use fingerprint::{shingle_features, simhash, Fingerprint};
use index::{BlockIndex, BlockIndexConfig, CandidateEntry, DocEntry, IndexStats};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::types::{
    AnnotatedRecord, DuplicateGroup, EngineConfig, EngineError, GroupMember, MatchReason,
    RawRecord, Verdict,
};

/// Exact Hamming filter over retrieved candidates.
///
/// Returns every candidate within `max_distance`, sorted by distance and
/// then by document id so the nearest match is deterministic under ties.
pub fn filter_candidates(
    fp: Fingerprint,
    candidates: &[CandidateEntry],
    max_distance: u32,
) -> Vec<(CandidateEntry, u32)> {
    let mut hits: Vec<(CandidateEntry, u32)> = candidates
        .iter()
        .map(|c| (c.clone(), fp.hamming(&c.fingerprint)))
        .filter(|(_, d)| *d <= max_distance)
        .collect();
    hits.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.doc_id.cmp(&b.0.doc_id)));
    hits
}

pub(crate) fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Duplicate groups grown during ingest, representative keyed.
#[derive(Default)]
struct GroupTable {
    groups: HashMap<String, DuplicateGroup>,
    member_to_rep: HashMap<String, String>,
}

impl GroupTable {
    /// Resolve an id to its group representative; ungrouped ids represent
    /// themselves.
    fn representative(&self, doc_id: &str) -> String {
        self.member_to_rep
            .get(doc_id)
            .cloned()
            .unwrap_or_else(|| doc_id.to_owned())
    }

    fn join(&mut self, rep: &str, member: &str, similarity: f64, reason: MatchReason) {
        if rep == member || self.member_to_rep.contains_key(member) {
            return;
        }
        let group = self
            .groups
            .entry(rep.to_owned())
            .or_insert_with(|| DuplicateGroup {
                representative_id: rep.to_owned(),
                formation_reason: reason,
                members: vec![GroupMember {
                    doc_id: rep.to_owned(),
                    similarity: 1.0,
                }],
            });
        group.members.push(GroupMember {
            doc_id: member.to_owned(),
            similarity,
        });
        self.member_to_rep.insert(member.to_owned(), rep.to_owned());
    }
}

/// Incremental near-duplicate detection engine.
///
/// Records flow through query-then-register: each record is classified
/// against everything registered before it, then registered itself, so the
/// first occurrence of any content becomes the lasting representative.
pub struct DedupEngine {
    cfg: EngineConfig,
    index: BlockIndex,
    groups: RwLock<GroupTable>,
}

impl DedupEngine {
    pub fn new(cfg: EngineConfig) -> Result<Self, EngineError> {
        cfg.validate()?;
        let index = BlockIndex::new(BlockIndexConfig {
            num_blocks: cfg.num_blocks,
            ttl: cfg.ttl,
            backend: cfg.backend.clone(),
        })?;
        Ok(Self {
            cfg,
            index,
            groups: RwLock::new(GroupTable::default()),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    /// Classify one record against the index, then register it.
    ///
    /// Content that normalizes to nothing yields a not-comparable verdict
    /// and is never indexed.
    pub fn ingest(&self, record: &RawRecord) -> Result<Verdict, EngineError> {
        match prepare(record, &self.cfg)? {
            Some((doc, fp)) => self.resolve(record, &doc, fp),
            None => {
                debug!(id = %record.id, "content not comparable");
                Ok(Verdict::not_comparable())
            }
        }
    }

    /// Classify a batch, preserving input order in the output.
    ///
    /// Normalization and fingerprinting fan out across threads; resolution
    /// runs sequentially in input order so earlier records win
    /// representative status. A record whose preparation fails degrades to
    /// a not-comparable verdict; an index failure aborts the whole batch.
    pub fn detect_batch(&self, records: &[RawRecord]) -> Result<Vec<AnnotatedRecord>, EngineError> {
        let prepared: Vec<Result<Option<(NormalizedDocument, Fingerprint)>, EngineError>> =
            records.par_iter().map(|r| prepare(r, &self.cfg)).collect();

        let mut out = Vec::with_capacity(records.len());
        let mut duplicates = 0usize;
        for (record, prep) in records.iter().zip(prepared) {
            let verdict = match prep {
                Ok(Some((doc, fp))) => match self.resolve(record, &doc, fp) {
                    Ok(verdict) => verdict,
                    Err(EngineError::Index(e)) => return Err(EngineError::Index(e)),
                    Err(e) => {
                        warn!(id = %record.id, error = %e, "record degraded to not comparable");
                        Verdict::not_comparable()
                    }
                },
                Ok(None) => Verdict::not_comparable(),
                Err(e) => {
                    warn!(id = %record.id, error = %e, "record degraded to not comparable");
                    Verdict::not_comparable()
                }
            };
            if verdict.is_duplicate {
                duplicates += 1;
            }
            out.push(AnnotatedRecord {
                record: record.clone(),
                verdict,
            });
        }
        info!(records = records.len(), duplicates, "batch classified");
        Ok(out)
    }

    /// Duplicate groups formed so far, sorted by representative id.
    pub fn groups(&self) -> Vec<DuplicateGroup> {
        let table = self
            .groups
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut groups: Vec<DuplicateGroup> = table.groups.values().cloned().collect();
        groups.sort_by(|a, b| a.representative_id.cmp(&b.representative_id));
        groups
    }

    pub fn stats(&self) -> Result<IndexStats, EngineError> {
        Ok(self.index.stats()?)
    }

    pub fn flush(&self) -> Result<(), EngineError> {
        Ok(self.index.flush()?)
    }

    fn resolve(
        &self,
        record: &RawRecord,
        doc: &NormalizedDocument,
        fp: Fingerprint,
    ) -> Result<Verdict, EngineError> {
        let hex = fp.to_hex();

        // Strongest signal first: the id itself is already registered.
        if self.index.contains_doc(&record.id)? {
            let rep = self.representative(&record.id);
            debug!(id = %record.id, "duplicate by external id");
            return Ok(Verdict {
                is_duplicate: true,
                duplicate_of: Some(rep),
                reason: Some(MatchReason::ExactId),
                duplicate_id: hex.clone(),
                duplication_rate: 1.0,
                hamming_distance: Some(0),
                simhash_value: hex,
            });
        }

        // Identical normalized content under a different id.
        if let Some(existing) = self.index.lookup_content_hash(&doc.content_hash)? {
            self.register(record, doc, fp)?;
            let rep = self.representative(&existing);
            self.join_group(&rep, &record.id, 1.0, MatchReason::ContentHash);
            debug!(id = %record.id, rep = %rep, "duplicate by content hash");
            return Ok(Verdict {
                is_duplicate: true,
                duplicate_of: Some(rep),
                reason: Some(MatchReason::ContentHash),
                duplicate_id: hex.clone(),
                duplication_rate: 1.0,
                hamming_distance: Some(0),
                simhash_value: hex,
            });
        }

        // Nearest registered fingerprint within the threshold.
        let candidates = self.index.candidates(fp)?;
        let nearest = filter_candidates(fp, &candidates, self.cfg.hamming_threshold)
            .into_iter()
            .next();
        self.register(record, doc, fp)?;

        if let Some((candidate, distance)) = nearest {
            let similarity = round3(fp.similarity(&candidate.fingerprint));
            let rep = self.representative(&candidate.doc_id);
            self.join_group(&rep, &record.id, similarity, MatchReason::SimHash);
            debug!(id = %record.id, rep = %rep, distance, "duplicate by fingerprint");
            return Ok(Verdict {
                is_duplicate: true,
                duplicate_of: Some(rep),
                reason: Some(MatchReason::SimHash),
                duplicate_id: hex.clone(),
                duplication_rate: similarity,
                hamming_distance: Some(distance),
                simhash_value: hex,
            });
        }

        Ok(Verdict {
            is_duplicate: false,
            duplicate_of: None,
            reason: None,
            duplicate_id: hex.clone(),
            duplication_rate: 1.0,
            hamming_distance: Some(0),
            simhash_value: hex,
        })
    }

    fn register(
        &self,
        record: &RawRecord,
        doc: &NormalizedDocument,
        fp: Fingerprint,
    ) -> Result<(), EngineError> {
        self.index.register(&DocEntry::new(
            record.id.clone(),
            fp,
            doc.content_hash.clone(),
            record.publish_time.clone(),
        ))?;
        Ok(())
    }

    fn representative(&self, doc_id: &str) -> String {
        self.groups
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .representative(doc_id)
    }

    fn join_group(&self, rep: &str, member: &str, similarity: f64, reason: MatchReason) {
        self.groups
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .join(rep, member, similarity, reason);
    }
}

/// Normalize and fingerprint a record. `Ok(None)` means not comparable.
fn prepare(
    record: &RawRecord,
    cfg: &EngineConfig,
) -> Result<Option<(NormalizedDocument, Fingerprint)>, EngineError> {
    let doc = normalize(&record.content, &cfg.normalize)?;
    if doc.is_empty() {
        return Ok(None);
    }
    let features = shingle_features(&doc.tokens, cfg.fingerprint.window);
    let fp = simhash(&features, &cfg.fingerprint)?;
    Ok(Some((doc, fp)))
}
