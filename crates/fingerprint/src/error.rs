use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FingerprintError {
    #[error("invalid fingerprint config: {0}")]
    InvalidConfig(String),

    /// The feature set had no entries. Returned instead of an all-zero
    /// fingerprint so empty documents can never match each other.
    #[error("feature set is empty, document is not comparable")]
    EmptyFeatureSet,

    #[error("malformed fingerprint digest: {0:?}")]
    MalformedHex(String),
}
