use serde::{Deserialize, Serialize};

/// Output of [`normalize`](crate::normalize).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizedDocument {
    /// Markup-stripped, casefolded, whitespace-collapsed identity text.
    /// Built from every retained character run, with no stop-word or
    /// length filtering, so it is stable input for content hashing and
    /// edit-distance comparison.
    pub normalized_text: String,
    /// Filtered token stream feeding fingerprint features: ASCII
    /// alphanumeric runs of length >= 2 minus stop words, plus CJK
    /// character bigrams.
    pub tokens: Vec<String>,
    /// Versioned SHA-256 digest of `normalized_text`.
    pub content_hash: String,
    /// Normalization version that produced this document.
    pub version: u32,
}

impl NormalizedDocument {
    /// True when normalization yielded no tokens. Such documents are not
    /// comparable and must never be fingerprinted.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
