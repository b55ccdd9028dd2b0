use serde::{Deserialize, Serialize};

use crate::error::FingerprintError;

/// Width of every fingerprint, in bits.
pub const FINGERPRINT_BITS: u32 = 64;

/// Default sliding-window size for shingle features, in tokens.
pub const DEFAULT_WINDOW: usize = 6;

/// Configuration for feature extraction and SimHash computation.
///
/// Fingerprints are only comparable when they were produced under the same
/// `(version, window, seed)` triple.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FingerprintConfig {
    /// Fingerprint schema version, must be >= 1.
    pub version: u32,
    /// Shingle window size in tokens, must be >= 1.
    pub window: usize,
    /// Seed for feature hashing.
    pub seed: u64,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            version: 1,
            window: DEFAULT_WINDOW,
            seed: 0,
        }
    }
}

impl FingerprintConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<(), FingerprintError> {
        if self.version == 0 {
            return Err(FingerprintError::InvalidConfig(
                "version must be >= 1".into(),
            ));
        }
        if self.window == 0 {
            return Err(FingerprintError::InvalidConfig(
                "window must be >= 1".into(),
            ));
        }
        Ok(())
    }
}
