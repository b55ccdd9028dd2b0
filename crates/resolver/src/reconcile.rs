use std::collections::{HashMap, HashSet};

use canonical::{normalize, NormalizedDocument};
use chrono::{DateTime, NaiveDateTime};
use fingerprint::{shingle_features, simhash, Fingerprint};
use index::{BackendConfig, BlockIndex, BlockIndexConfig, DocEntry};
use rayon::prelude::*;
use strsim::normalized_levenshtein;
use tracing::{debug, info};

use crate::engine::{filter_candidates, round3};
use crate::types::{EngineConfig, EngineError, RawRecord, ReconcileOutcome, RemovedRecord};

/// Export-time reconciliation over a complete batch.
///
/// Unlike ingest, which resolves each record against whatever happened to
/// arrive earlier, reconciliation sees the whole set at once and picks
/// keepers by explicit rules. Three passes, strongest signal first:
///
/// 1. Records sharing an external id collapse to the one with the earliest
///    parseable `publish_time` (ties keep the earliest in input order).
/// 2. Records sharing a normalized-content hash collapse to the smallest id.
/// 3. The residue runs through a fresh in-memory fingerprint index in
///    ascending id order; records within the Hamming threshold of an
///    already-kept record collapse into it. Retrieved candidates beyond the
///    threshold get one more chance through normalized edit distance on the
///    identity text, at the configured `fallback_similarity` floor.
///
/// Non-comparable records (no tokens) pass through untouched. Survivors
/// keep their original input order.
pub fn reconcile(
    records: &[RawRecord],
    cfg: &EngineConfig,
) -> Result<ReconcileOutcome, EngineError> {
    cfg.validate()?;

    let mut removed: Vec<RemovedRecord> = Vec::new();
    // Ids removed in passes 2 and 3, where the removed record and its
    // representative have different ids.
    let mut dropped_ids: HashSet<String> = HashSet::new();
    let mut rep_of: HashMap<String, String> = HashMap::new();

    // Pass 1: collapse repeated external ids.
    let mut keeper_by_id: HashMap<&str, usize> = HashMap::new();
    let mut id_order: Vec<&str> = Vec::new();
    for (pos, record) in records.iter().enumerate() {
        match keeper_by_id.get(record.id.as_str()).copied() {
            None => {
                keeper_by_id.insert(record.id.as_str(), pos);
                id_order.push(record.id.as_str());
            }
            Some(incumbent) => {
                if publishes_earlier(record, &records[incumbent]) {
                    keeper_by_id.insert(record.id.as_str(), pos);
                }
                removed.push(RemovedRecord {
                    id: record.id.clone(),
                    representative_id: record.id.clone(),
                    similarity: 1.0,
                });
            }
        }
    }
    // Keepers in first-seen order of their ids.
    let keeper_order: Vec<usize> = id_order
        .iter()
        .filter_map(|id| keeper_by_id.get(id).copied())
        .collect();

    // Normalize and fingerprint the keepers in parallel; resolution below
    // is order-sensitive and stays sequential.
    let prepared: Vec<(NormalizedDocument, Option<Fingerprint>)> = keeper_order
        .par_iter()
        .map(|&pos| -> Result<(NormalizedDocument, Option<Fingerprint>), EngineError> {
            let doc = normalize(&records[pos].content, &cfg.normalize)?;
            let fp = if doc.is_empty() {
                None
            } else {
                let features = shingle_features(&doc.tokens, cfg.fingerprint.window);
                Some(simhash(&features, &cfg.fingerprint)?)
            };
            Ok((doc, fp))
        })
        .collect::<Result<_, EngineError>>()?;

    // Pass 2: collapse identical normalized content, keeper is the
    // smallest id.
    let mut by_hash: HashMap<&str, Vec<usize>> = HashMap::new();
    for (slot, (doc, _)) in prepared.iter().enumerate() {
        if !doc.is_empty() {
            by_hash.entry(doc.content_hash.as_str()).or_default().push(slot);
        }
    }
    for slots in by_hash.values() {
        if slots.len() < 2 {
            continue;
        }
        let Some(keeper) = slots
            .iter()
            .copied()
            .min_by(|&a, &b| records[keeper_order[a]].id.cmp(&records[keeper_order[b]].id))
        else {
            continue;
        };
        let keeper_id = records[keeper_order[keeper]].id.clone();
        for &slot in slots {
            if slot == keeper {
                continue;
            }
            let id = records[keeper_order[slot]].id.clone();
            rep_of.insert(id.clone(), keeper_id.clone());
            dropped_ids.insert(id.clone());
            removed.push(RemovedRecord {
                id,
                representative_id: keeper_id.clone(),
                similarity: 1.0,
            });
        }
    }

    // Pass 3: fingerprint the residue against a fresh in-memory index,
    // ascending id order so the smallest id in a cluster survives.
    let idx = BlockIndex::new(BlockIndexConfig {
        num_blocks: cfg.num_blocks,
        ttl: None,
        backend: BackendConfig::InMemory,
    })?;
    let mut text_by_id: HashMap<String, &str> = HashMap::new();

    let mut residue: Vec<usize> = (0..keeper_order.len())
        .filter(|slot| {
            prepared[*slot].1.is_some()
                && !dropped_ids.contains(&records[keeper_order[*slot]].id)
        })
        .collect();
    residue.sort_by(|&a, &b| records[keeper_order[a]].id.cmp(&records[keeper_order[b]].id));

    for slot in residue {
        let record = &records[keeper_order[slot]];
        let (doc, fp) = &prepared[slot];
        let Some(fp) = *fp else {
            continue;
        };

        let candidates = idx.candidates(fp)?;
        let hits = filter_candidates(fp, &candidates, cfg.hamming_threshold);
        if let Some((nearest, distance)) = hits.into_iter().next() {
            let similarity = round3(fp.similarity(&nearest.fingerprint));
            debug!(id = %record.id, rep = %nearest.doc_id, distance, "collapsed by fingerprint");
            rep_of.insert(record.id.clone(), nearest.doc_id.clone());
            dropped_ids.insert(record.id.clone());
            removed.push(RemovedRecord {
                id: record.id.clone(),
                representative_id: nearest.doc_id,
                similarity,
            });
            continue;
        }

        // Retrieved but too far apart in Hamming space: compare the
        // identity texts directly before giving up.
        let mut matched = false;
        for candidate in &candidates {
            let Some(text) = text_by_id.get(candidate.doc_id.as_str()) else {
                continue;
            };
            let ratio = normalized_levenshtein(&doc.normalized_text, text);
            if ratio >= cfg.fallback_similarity {
                debug!(id = %record.id, rep = %candidate.doc_id, ratio, "collapsed by edit distance");
                rep_of.insert(record.id.clone(), candidate.doc_id.clone());
                dropped_ids.insert(record.id.clone());
                removed.push(RemovedRecord {
                    id: record.id.clone(),
                    representative_id: candidate.doc_id.clone(),
                    similarity: round3(ratio),
                });
                matched = true;
                break;
            }
        }
        if matched {
            continue;
        }

        idx.register(&DocEntry::new(
            record.id.clone(),
            fp,
            doc.content_hash.clone(),
            record.publish_time.clone(),
        ))?;
        text_by_id.insert(record.id.clone(), doc.normalized_text.as_str());
    }

    // Point every removal at a record that actually survived.
    for entry in &mut removed {
        entry.representative_id = resolve_representative(&rep_of, &entry.representative_id);
    }

    let survivors: Vec<RawRecord> = keeper_order
        .iter()
        .filter(|&&pos| !dropped_ids.contains(&records[pos].id))
        .map(|&pos| records[pos].clone())
        .collect();
    let group_count = removed
        .iter()
        .map(|r| r.representative_id.as_str())
        .collect::<HashSet<_>>()
        .len();

    let outcome = ReconcileOutcome {
        original_count: records.len(),
        deduplicated_count: survivors.len(),
        removed_count: removed.len(),
        group_count,
        survivors,
        removed,
    };
    info!(
        original = outcome.original_count,
        kept = outcome.deduplicated_count,
        removed = outcome.removed_count,
        groups = outcome.group_count,
        "reconciliation complete"
    );
    Ok(outcome)
}

fn resolve_representative(rep_of: &HashMap<String, String>, id: &str) -> String {
    let mut current = id;
    // Chains are short; removals always point at records kept by a later
    // or equal pass.
    while let Some(next) = rep_of.get(current) {
        if next == current {
            break;
        }
        current = next;
    }
    current.to_owned()
}

fn publishes_earlier(challenger: &RawRecord, incumbent: &RawRecord) -> bool {
    match (
        parse_publish_time(challenger.publish_time.as_deref()),
        parse_publish_time(incumbent.publish_time.as_deref()),
    ) {
        (Some(a), Some(b)) => a < b,
        (Some(_), None) => true,
        _ => false,
    }
}

/// Accepts RFC 3339 and two naive layouts common in feed exports.
fn parse_publish_time(raw: Option<&str>) -> Option<NaiveDateTime> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.naive_utc())
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok())
        .or_else(|| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").ok())
}
