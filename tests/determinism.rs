//! The same text must always produce the same fingerprint, no matter which
//! engine instance, call order, or surface noise produced it.

use neardup::{
    fingerprint_text, DedupEngine, EngineConfig, Fingerprint, FingerprintConfig, NormalizeConfig,
    RawRecord,
};

const TEXT: &str = "Regulators approved the long debated merger on Friday after both \
    companies agreed to divest several regional assets and to maintain current staffing \
    levels for at least three years while the combined group integrates its operations.";

#[test]
fn digest_stable_across_engines() {
    let a = DedupEngine::new(EngineConfig::default()).unwrap();
    let b = DedupEngine::new(EngineConfig::default()).unwrap();
    let va = a.ingest(&RawRecord::new("x", TEXT)).unwrap();
    let vb = b.ingest(&RawRecord::new("y", TEXT)).unwrap();
    assert_eq!(va.simhash_value, vb.simhash_value);
    assert_eq!(va.duplicate_id, va.simhash_value);
}

#[test]
fn digest_stable_across_calls() {
    let ncfg = NormalizeConfig::default();
    let fcfg = FingerprintConfig::default();
    let (_, first) = fingerprint_text(TEXT, &ncfg, &fcfg).unwrap();
    for _ in 0..5 {
        let (_, again) = fingerprint_text(TEXT, &ncfg, &fcfg).unwrap();
        assert_eq!(first, again);
    }
}

#[test]
fn markup_and_whitespace_noise_invariant() {
    let ncfg = NormalizeConfig::default();
    let fcfg = FingerprintConfig::default();
    let noisy = format!(
        "<html><body><h1>{}</h1></body></html>",
        TEXT.replace(' ', "   ")
    );
    let (clean_doc, clean_fp) = fingerprint_text(TEXT, &ncfg, &fcfg).unwrap();
    let (noisy_doc, noisy_fp) = fingerprint_text(&noisy, &ncfg, &fcfg).unwrap();
    assert_eq!(clean_doc.normalized_text, noisy_doc.normalized_text);
    assert_eq!(clean_doc.content_hash, noisy_doc.content_hash);
    assert_eq!(clean_fp, noisy_fp);
}

#[test]
fn reported_digest_parses_back() {
    let engine = DedupEngine::new(EngineConfig::default()).unwrap();
    let verdict = engine.ingest(&RawRecord::new("x", TEXT)).unwrap();
    let fp = Fingerprint::from_hex(&verdict.simhash_value).unwrap();
    assert_eq!(fp.to_hex(), verdict.simhash_value);
}
