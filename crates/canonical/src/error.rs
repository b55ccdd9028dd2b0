use thiserror::Error;

/// Errors produced while normalizing raw text.
///
/// Empty or markup-only input is not an error; it degrades to an empty
/// [`NormalizedDocument`](crate::NormalizedDocument).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CanonicalError {
    #[error("invalid normalize config: {0}")]
    InvalidConfig(String),
}
