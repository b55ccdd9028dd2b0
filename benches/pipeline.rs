use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use neardup::{
    fingerprint_text, DedupEngine, EngineConfig, FingerprintConfig, NormalizeConfig, RawRecord,
};

fn sample_text(words: usize) -> String {
    let vocabulary = [
        "market", "revenue", "quarter", "growth", "margin", "pricing", "segment", "guidance",
        "demand", "supply", "capital", "dividend", "earnings", "forecast", "index", "sector",
    ];
    (0..words)
        .map(|i| vocabulary[(i * 7 + i / 5) % vocabulary.len()])
        .collect::<Vec<_>>()
        .join(" ")
}

fn bench_fingerprint(c: &mut Criterion) {
    let ncfg = NormalizeConfig::default();
    let fcfg = FingerprintConfig::default();
    let text = sample_text(400);
    c.bench_function("fingerprint_text_400w", |b| {
        b.iter(|| fingerprint_text(black_box(&text), &ncfg, &fcfg).unwrap())
    });
}

fn bench_detect_batch(c: &mut Criterion) {
    let records: Vec<RawRecord> = (0..100)
        .map(|i| RawRecord::new(format!("doc-{i}"), format!("{} item {i}", sample_text(200))))
        .collect();
    c.bench_function("detect_batch_100", |b| {
        b.iter(|| {
            let engine = DedupEngine::new(EngineConfig::default()).unwrap();
            engine.detect_batch(black_box(&records)).unwrap()
        })
    });
}

criterion_group!(benches, bench_fingerprint, bench_detect_batch);
criterion_main!(benches);
