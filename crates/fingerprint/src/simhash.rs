use std::fmt;

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64_with_seed;

use crate::config::{FingerprintConfig, FINGERPRINT_BITS};
use crate::error::FingerprintError;
use crate::features::FeatureSet;

/// A 64-bit SimHash fingerprint.
///
/// Documents with similar feature multisets land within a small Hamming
/// distance of each other. The digest is neither reversible nor
/// cryptographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(pub u64);

impl Fingerprint {
    /// Hamming distance to another fingerprint: XOR plus popcount.
    /// Symmetric, in `[0, 64]`.
    pub fn hamming(&self, other: &Fingerprint) -> u32 {
        (self.0 ^ other.0).count_ones()
    }

    /// Similarity score `1 - distance / 64`, in `[0.0, 1.0]`.
    pub fn similarity(&self, other: &Fingerprint) -> f64 {
        1.0 - f64::from(self.hamming(other)) / f64::from(FINGERPRINT_BITS)
    }

    /// 16 lowercase hex digits, zero padded.
    pub fn to_hex(&self) -> String {
        format!("{:016x}", self.0)
    }

    /// Parse a digest produced by [`to_hex`](Self::to_hex). Anything other
    /// than exactly 16 hex digits is rejected.
    pub fn from_hex(digest: &str) -> Result<Fingerprint, FingerprintError> {
        if digest.len() != 16 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(FingerprintError::MalformedHex(digest.to_owned()));
        }
        u64::from_str_radix(digest, 16)
            .map(Fingerprint)
            .map_err(|_| FingerprintError::MalformedHex(digest.to_owned()))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Compute the SimHash of a weighted feature set.
///
/// Every feature is hashed once; for each bit position the feature votes
/// `+weight` when its hash bit is set and `-weight` when clear. A final bit
/// is 1 iff its tally is strictly positive, so ties resolve to 0. The sum
/// is commutative, which makes the result independent of feature order.
pub fn simhash(features: &FeatureSet, cfg: &FingerprintConfig) -> Result<Fingerprint, FingerprintError> {
    cfg.validate()?;
    if features.is_empty() {
        return Err(FingerprintError::EmptyFeatureSet);
    }

    let mut votes = [0i64; FINGERPRINT_BITS as usize];
    for (feature, weight) in features.iter() {
        let hash = xxh3_64_with_seed(feature.as_bytes(), cfg.seed);
        let weight = i64::from(weight);
        for (bit, vote) in votes.iter_mut().enumerate() {
            if (hash >> bit) & 1 == 1 {
                *vote += weight;
            } else {
                *vote -= weight;
            }
        }
    }

    let mut bits = 0u64;
    for (bit, &vote) in votes.iter().enumerate() {
        if vote > 0 {
            bits |= 1 << bit;
        }
    }
    Ok(Fingerprint(bits))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shingle_features;

    fn fp(tokens: &[&str]) -> Fingerprint {
        let cfg = FingerprintConfig::default();
        simhash(&shingle_features(tokens, cfg.window), &cfg).unwrap()
    }

    #[test]
    fn deterministic() {
        let tokens = ["market", "closed", "higher", "after", "strong", "earnings", "reports"];
        assert_eq!(fp(&tokens), fp(&tokens));
    }

    #[test]
    fn empty_features_rejected() {
        let err = simhash(&FeatureSet::default(), &FingerprintConfig::default()).unwrap_err();
        assert_eq!(err, FingerprintError::EmptyFeatureSet);
    }

    #[test]
    fn seed_changes_fingerprint() {
        let cfg_a = FingerprintConfig::default();
        let cfg_b = FingerprintConfig::default().with_seed(7);
        let features = shingle_features(&["alpha", "beta", "gamma"], 6);
        assert_ne!(
            simhash(&features, &cfg_a).unwrap(),
            simhash(&features, &cfg_b).unwrap()
        );
    }

    #[test]
    fn hamming_is_symmetric_and_bounded() {
        let a = Fingerprint(0xDEAD_BEEF_0000_FFFF);
        let b = Fingerprint(0x0000_BEEF_DEAD_0F0F);
        assert_eq!(a.hamming(&b), b.hamming(&a));
        assert!(a.hamming(&b) <= 64);
        assert_eq!(a.hamming(&a), 0);
        assert_eq!(Fingerprint(0).hamming(&Fingerprint(u64::MAX)), 64);
    }

    #[test]
    fn similarity_maps_distance() {
        let a = Fingerprint(0);
        let b = Fingerprint(0b1111);
        assert!((a.similarity(&b) - (1.0 - 4.0 / 64.0)).abs() < 1e-12);
        assert!((a.similarity(&a) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn hex_round_trip() {
        let a = Fingerprint(0x00AB_CDEF_1234_5678);
        assert_eq!(a.to_hex(), "00abcdef12345678");
        assert_eq!(Fingerprint::from_hex(&a.to_hex()).unwrap(), a);
    }

    #[test]
    fn malformed_hex_rejected() {
        for bad in ["", "abc", "zzzzzzzzzzzzzzzz", "00abcdef123456789"] {
            assert!(matches!(
                Fingerprint::from_hex(bad),
                Err(FingerprintError::MalformedHex(_))
            ));
        }
    }

    #[test]
    fn small_edit_small_distance() {
        let base: Vec<&str> = "quarterly revenue rose sharply across every operating segment \
            while costs held steady and management raised its full year guidance citing \
            resilient consumer demand improving supply chains and disciplined capital \
            spending across both domestic and overseas markets the company reported record \
            cash flow from operations repaid a large portion of its outstanding term debt \
            and announced an expanded buyback program alongside a modest dividend increase \
            analysts noted that gross margins widened for the third consecutive quarter \
            driven by better pricing lower freight costs and a richer product mix executives \
            cautioned that currency headwinds and softer industrial orders could weigh on \
            results next year but maintained their medium term growth targets unchanged"
            .split_whitespace()
            .collect();
        let mut edited = base.clone();
        edited[40] = "declined";
        let d = fp(&base).hamming(&fp(&edited));
        assert!(d > 0, "distinct texts should differ");
        assert!(d < 16, "one-word edit moved {d} bits");
    }

    #[test]
    fn serde_transparent_digest() {
        let json = serde_json::to_string(&Fingerprint(42)).unwrap();
        assert_eq!(json, "42");
    }
}
