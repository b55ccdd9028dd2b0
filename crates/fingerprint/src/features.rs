use std::collections::HashMap;

/// Weighted feature multiset for one document.
///
/// Ephemeral: built during fingerprint computation and never persisted.
/// Weights count repetitions, so repeating a feature strengthens its vote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureSet {
    weights: HashMap<String, u32>,
}

impl FeatureSet {
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Number of distinct features.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn add(&mut self, feature: String) {
        *self.weights.entry(feature).or_insert(0) += 1;
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.weights.iter().map(|(k, &w)| (k.as_str(), w))
    }
}

/// Build shingle features from a token stream.
///
/// A window of `window` consecutive tokens slides one token at a time;
/// each shingle is the window's tokens concatenated without a separator.
/// Streams shorter than the window fall back to single-token features so
/// short documents still fingerprint. An empty stream yields an empty set.
pub fn shingle_features<S: AsRef<str>>(tokens: &[S], window: usize) -> FeatureSet {
    let mut features = FeatureSet::default();
    if tokens.is_empty() || window == 0 {
        return features;
    }
    if tokens.len() < window {
        for token in tokens {
            features.add(token.as_ref().to_owned());
        }
        return features;
    }
    for shingle in tokens.windows(window) {
        let mut feature = String::new();
        for token in shingle {
            feature.push_str(token.as_ref());
        }
        features.add(feature);
    }
    features
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sliding_window_counts() {
        let tokens = ["a", "b", "c", "d"];
        let features = shingle_features(&tokens, 2);
        // ab, bc, cd
        assert_eq!(features.len(), 3);
    }

    #[test]
    fn repeated_shingles_accumulate_weight() {
        let tokens = ["x", "y", "x", "y", "x", "y"];
        let features = shingle_features(&tokens, 2);
        let weights: std::collections::HashMap<_, _> = features.iter().collect();
        assert_eq!(weights["xy"], 3);
        assert_eq!(weights["yx"], 2);
    }

    #[test]
    fn short_stream_falls_back_to_tokens() {
        let tokens = ["alpha", "beta"];
        let features = shingle_features(&tokens, 6);
        assert_eq!(features.len(), 2);
        let weights: std::collections::HashMap<_, _> = features.iter().collect();
        assert_eq!(weights["alpha"], 1);
    }

    #[test]
    fn empty_stream_yields_empty_set() {
        let tokens: [&str; 0] = [];
        assert!(shingle_features(&tokens, 6).is_empty());
    }
}
