//! Deterministic text canonicalization for near-duplicate detection.
//!
//! Raw record text passes through markup stripping, Unicode NFKC, and a
//! character-class scan that yields two views of the same content: a
//! `normalized_text` identity string (hashed for exact-content matching)
//! and a filtered `tokens` stream (fed to fingerprint features). Both are
//! byte-for-byte reproducible for the same input and config.

mod config;
mod document;
mod error;
mod hash;
mod normalize;
mod stopwords;

pub use config::NormalizeConfig;
pub use document::NormalizedDocument;
pub use error::CanonicalError;
pub use hash::{hash_normalized_bytes, hash_text};
pub use normalize::normalize;
