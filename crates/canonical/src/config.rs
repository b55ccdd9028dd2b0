use serde::{Deserialize, Serialize};

/// Configuration for the normalization pipeline.
///
/// The `version` participates in every content hash, so two deployments can
/// only agree on identity when they run the same normalization version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizeConfig {
    /// Normalization schema version, must be >= 1.
    pub version: u32,
    /// Apply Unicode NFKC before character classification.
    pub normalize_unicode: bool,
    /// Remove tag-like `<...>` spans before anything else.
    pub strip_markup: bool,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            version: 1,
            normalize_unicode: true,
            strip_markup: true,
        }
    }
}

impl NormalizeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn with_strip_markup(mut self, strip: bool) -> Self {
        self.strip_markup = strip;
        self
    }

    pub fn with_normalize_unicode(mut self, normalize: bool) -> Self {
        self.normalize_unicode = normalize;
        self
    }
}
