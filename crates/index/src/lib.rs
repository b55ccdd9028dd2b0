//! Blocked retrieval index for 64-bit fingerprints.
//!
//! Each fingerprint is split into `num_blocks` contiguous equal-width
//! blocks; a document is appended to one bucket per block value. A query
//! unions the buckets matching its own block values, so any stored
//! fingerprint that agrees with the query on at least one whole block is
//! guaranteed to be retrieved. In particular every fingerprint within
//! Hamming distance `num_blocks - 1` is always found.

mod backend;

#[cfg(feature = "backend-redb")]
pub use backend::RedbBackend;
pub use backend::{BackendConfig, InMemoryBackend, IndexBackend};

use std::sync::Mutex;
use std::time::Duration;

use bincode::config::standard;
use bincode::error::{DecodeError, EncodeError};
use bincode::serde::{decode_from_slice, encode_to_vec};
use fingerprint::{Fingerprint, FINGERPRINT_BITS};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Default entry lifetime for shared deployments, seven days.
pub const DEFAULT_SHARED_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Error, Clone)]
pub enum IndexError {
    #[error("backend error: {0}")]
    Backend(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("invalid index config: {0}")]
    InvalidConfig(String),
}

impl IndexError {
    pub fn backend(msg: impl Into<String>) -> Self {
        IndexError::Backend(msg.into())
    }
}

impl From<EncodeError> for IndexError {
    fn from(e: EncodeError) -> Self {
        IndexError::Encode(e.to_string())
    }
}

impl From<DecodeError> for IndexError {
    fn from(e: DecodeError) -> Self {
        IndexError::Decode(e.to_string())
    }
}

/// Configuration for a [`BlockIndex`].
#[derive(Debug, Clone)]
pub struct BlockIndexConfig {
    /// Number of equal-width blocks, must divide 64.
    pub num_blocks: usize,
    /// Optional entry lifetime. Expired entries are skipped and pruned on
    /// access; `None` keeps everything forever.
    pub ttl: Option<Duration>,
    pub backend: BackendConfig,
}

impl Default for BlockIndexConfig {
    fn default() -> Self {
        Self {
            num_blocks: 4,
            ttl: None,
            backend: BackendConfig::InMemory,
        }
    }
}

impl BlockIndexConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_num_blocks(mut self, num_blocks: usize) -> Self {
        self.num_blocks = num_blocks;
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

    pub fn validate(&self) -> Result<(), IndexError> {
        let bits = FINGERPRINT_BITS as usize;
        if self.num_blocks == 0 || self.num_blocks > bits {
            return Err(IndexError::InvalidConfig(format!(
                "num_blocks must be in 1..={bits}, got {}",
                self.num_blocks
            )));
        }
        if bits % self.num_blocks != 0 {
            return Err(IndexError::InvalidConfig(format!(
                "num_blocks must divide {bits}, got {}",
                self.num_blocks
            )));
        }
        Ok(())
    }
}

/// A document stored in the index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocEntry {
    pub doc_id: String,
    pub fingerprint: Fingerprint,
    /// Versioned hash of the normalized content.
    pub content_hash: String,
    pub publish_time: Option<String>,
    /// Unix timestamp in seconds, drives TTL pruning.
    pub registered_at: i64,
}

impl DocEntry {
    /// Entry stamped with the current wall-clock time.
    pub fn new(
        doc_id: impl Into<String>,
        fingerprint: Fingerprint,
        content_hash: impl Into<String>,
        publish_time: Option<String>,
    ) -> Self {
        Self {
            doc_id: doc_id.into(),
            fingerprint,
            content_hash: content_hash.into(),
            publish_time,
            registered_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// Per-bucket record, kept small because buckets are rewritten on append.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BucketEntry {
    doc_id: String,
    fingerprint: u64,
    registered_at: i64,
}

/// A stored document retrieved through block lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateEntry {
    pub doc_id: String,
    pub fingerprint: Fingerprint,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Documents registered.
    pub documents: usize,
    /// Non-empty block buckets.
    pub buckets: usize,
}

/// Split a fingerprint into `(position, value)` blocks, least significant
/// block first.
pub fn block_values(fp: Fingerprint, num_blocks: usize) -> Vec<(usize, u64)> {
    let width = FINGERPRINT_BITS as usize / num_blocks;
    let mask = if width == 64 { u64::MAX } else { (1u64 << width) - 1 };
    (0..num_blocks)
        .map(|pos| (pos, (fp.0 >> (pos * width)) & mask))
        .collect()
}

/// Blocking index over a key-value backend.
///
/// Key schema: `doc:{id}` holds the [`DocEntry`], `hash:{digest}` maps a
/// content hash to the first document that carried it, and
/// `block:{pos}:{value:016x}` holds the bucket for one block value.
pub struct BlockIndex {
    backend: Box<dyn IndexBackend>,
    cfg: BlockIndexConfig,
    /// Serializes bucket read-modify-write in `register`. Reads take no
    /// lock and may briefly miss an in-flight registration.
    write_lock: Mutex<()>,
}

impl BlockIndex {
    pub fn new(cfg: BlockIndexConfig) -> Result<Self, IndexError> {
        cfg.validate()?;
        let backend = cfg.backend.build()?;
        Ok(Self {
            backend,
            cfg,
            write_lock: Mutex::new(()),
        })
    }

    /// Build over an already-constructed backend, bypassing
    /// [`BackendConfig::build`].
    pub fn with_backend(
        cfg: BlockIndexConfig,
        backend: Box<dyn IndexBackend>,
    ) -> Result<Self, IndexError> {
        cfg.validate()?;
        Ok(Self {
            backend,
            cfg,
            write_lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &BlockIndexConfig {
        &self.cfg
    }

    fn doc_key(doc_id: &str) -> String {
        format!("doc:{doc_id}")
    }

    fn hash_key(content_hash: &str) -> String {
        format!("hash:{content_hash}")
    }

    fn bucket_key(pos: usize, value: u64) -> String {
        format!("block:{pos}:{value:016x}")
    }

    /// Store a document and append it to one bucket per block value.
    ///
    /// Idempotent: re-registering a `doc_id` overwrites its record and
    /// leaves buckets without duplicate entries.
    pub fn register(&self, entry: &DocEntry) -> Result<(), IndexError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| IndexError::backend("poisoned lock"))?;

        self.backend
            .put(&Self::doc_key(&entry.doc_id), &encode_to_vec(entry, standard())?)?;

        // First live writer wins for a content hash; a slot whose owner
        // expired is reclaimed.
        let hash_key = Self::hash_key(&entry.content_hash);
        if self.lookup_content_hash(&entry.content_hash)?.is_none() {
            self.backend.put(&hash_key, entry.doc_id.as_bytes())?;
        }

        for (pos, value) in block_values(entry.fingerprint, self.cfg.num_blocks) {
            let key = Self::bucket_key(pos, value);
            let mut bucket = self.read_bucket(&key)?;
            self.prune_expired(&mut bucket, entry.registered_at);
            if !bucket.iter().any(|e| e.doc_id == entry.doc_id) {
                bucket.push(BucketEntry {
                    doc_id: entry.doc_id.clone(),
                    fingerprint: entry.fingerprint.0,
                    registered_at: entry.registered_at,
                });
            }
            self.backend.put(&key, &encode_to_vec(&bucket, standard())?)?;
        }
        Ok(())
    }

    /// Union of the buckets matching the query's block values, deduplicated
    /// by document id and sorted by id for deterministic downstream
    /// tie-breaking.
    pub fn candidates(&self, fp: Fingerprint) -> Result<Vec<CandidateEntry>, IndexError> {
        let now = chrono::Utc::now().timestamp();
        let mut seen: HashMap<String, u64> = HashMap::new();
        for (pos, value) in block_values(fp, self.cfg.num_blocks) {
            let key = Self::bucket_key(pos, value);
            let mut bucket = self.read_bucket(&key)?;
            self.prune_expired(&mut bucket, now);
            for entry in bucket {
                seen.entry(entry.doc_id).or_insert(entry.fingerprint);
            }
        }
        let mut out: Vec<CandidateEntry> = seen
            .into_iter()
            .map(|(doc_id, bits)| CandidateEntry {
                doc_id,
                fingerprint: Fingerprint(bits),
            })
            .collect();
        out.sort_by(|a, b| a.doc_id.cmp(&b.doc_id));
        Ok(out)
    }

    /// Fetch a document record. Expired or undecodable records read as
    /// absent; corruption is logged, never propagated.
    pub fn lookup_doc(&self, doc_id: &str) -> Result<Option<DocEntry>, IndexError> {
        let Some(bytes) = self.backend.get(&Self::doc_key(doc_id))? else {
            return Ok(None);
        };
        let entry: DocEntry = match decode_from_slice(&bytes, standard()) {
            Ok((entry, _)) => entry,
            Err(e) => {
                warn!(doc_id, error = %e, "skipping malformed document record");
                return Ok(None);
            }
        };
        if self.is_expired(entry.registered_at, chrono::Utc::now().timestamp()) {
            return Ok(None);
        }
        Ok(Some(entry))
    }

    /// Id of the first live document registered under this content hash.
    ///
    /// The slot shares the lifetime of the document it points at: once the
    /// document expires out of the index, the hash entry reads as absent
    /// and is dropped so a later writer can claim it.
    pub fn lookup_content_hash(&self, content_hash: &str) -> Result<Option<String>, IndexError> {
        let key = Self::hash_key(content_hash);
        let Some(bytes) = self.backend.get(&key)? else {
            return Ok(None);
        };
        let doc_id = match String::from_utf8(bytes) {
            Ok(doc_id) => doc_id,
            Err(e) => {
                warn!(content_hash, error = %e, "skipping malformed content-hash entry");
                return Ok(None);
            }
        };
        if self.lookup_doc(&doc_id)?.is_none() {
            self.backend.delete(&key)?;
            return Ok(None);
        }
        Ok(Some(doc_id))
    }

    pub fn contains_doc(&self, doc_id: &str) -> Result<bool, IndexError> {
        Ok(self.lookup_doc(doc_id)?.is_some())
    }

    pub fn stats(&self) -> Result<IndexStats, IndexError> {
        let mut stats = IndexStats::default();
        self.backend.scan(&mut |key, _| {
            if key.starts_with("doc:") {
                stats.documents += 1;
            } else if key.starts_with("block:") {
                stats.buckets += 1;
            }
            Ok(())
        })?;
        Ok(stats)
    }

    pub fn flush(&self) -> Result<(), IndexError> {
        self.backend.flush()
    }

    /// Decode a bucket, treating corruption as an empty bucket so one bad
    /// record cannot poison retrieval.
    fn read_bucket(&self, key: &str) -> Result<Vec<BucketEntry>, IndexError> {
        let Some(bytes) = self.backend.get(key)? else {
            return Ok(Vec::new());
        };
        match decode_from_slice(&bytes, standard()) {
            Ok((bucket, _)) => Ok(bucket),
            Err(e) => {
                warn!(key, error = %e, "skipping malformed bucket");
                Ok(Vec::new())
            }
        }
    }

    fn is_expired(&self, registered_at: i64, now: i64) -> bool {
        match self.cfg.ttl {
            Some(ttl) => now.saturating_sub(registered_at) > ttl.as_secs() as i64,
            None => false,
        }
    }

    fn prune_expired(&self, bucket: &mut Vec<BucketEntry>, now: i64) {
        if self.cfg.ttl.is_some() {
            bucket.retain(|e| !self.is_expired(e.registered_at, now));
        }
    }
}
