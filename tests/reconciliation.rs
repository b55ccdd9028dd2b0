//! Export-time reconciliation: whole-batch grouping with explicit keeper
//! rules instead of arrival order.

use neardup::{reconcile, EngineConfig, RawRecord};

const ARTICLE: &str = "Quarterly revenue rose sharply across every operating segment while \
    costs held steady and management raised its full year guidance citing resilient consumer \
    demand improving supply chains and disciplined capital spending across both domestic and \
    overseas markets. The company reported record cash flow from operations repaid a large \
    portion of its outstanding term debt and announced an expanded buyback program alongside \
    a modest dividend increase. Analysts noted that gross margins widened for the third \
    consecutive quarter driven by better pricing lower freight costs and a richer product \
    mix. Executives cautioned that currency headwinds and softer industrial orders could \
    weigh on results next year but maintained their medium term growth targets unchanged. \
    The flagship consumer division grew fastest supported by new subscription offerings and \
    holiday promotions while the industrial unit saw flat volumes offset by favorable \
    pricing. Research spending climbed again as the firm accelerated development of its next \
    generation platform and hired across engineering and data science. Regional performance \
    diverged with strong gains in North America steady expansion in Europe and a slower \
    recovery across parts of Asia. The board reviewed capital allocation priorities and \
    reaffirmed its commitment to balancing reinvestment shareholder returns and a \
    conservative balance sheet through the coming cycle.";

const WEATHER: &str = "A slow moving cold front will bring scattered thunderstorms to the \
    valley this evening with locally heavy rainfall and gusty winds expected along the \
    foothills before conditions clear overnight and temperatures drop near seasonal \
    averages for the remainder of the week.";

fn wide_config() -> EngineConfig {
    EngineConfig::default()
        .with_num_blocks(8)
        .with_hamming_threshold(7)
}

#[test]
fn repeated_id_keeps_earliest_publication() {
    let records = vec![
        RawRecord::new("7", "Updated wording of the original story.")
            .with_publish_time("2025-03-02 09:00:00"),
        RawRecord::new("7", "Original wording of the story.")
            .with_publish_time("2025-03-01 09:00:00"),
        RawRecord::new("7", "Third variant with no timestamp."),
    ];
    let outcome = reconcile(&records, &EngineConfig::default()).unwrap();
    assert_eq!(outcome.original_count, 3);
    assert_eq!(outcome.deduplicated_count, 1);
    assert_eq!(outcome.removed_count, 2);
    assert_eq!(outcome.group_count, 1);
    assert_eq!(outcome.survivors[0].content, "Original wording of the story.");
}

#[test]
fn identical_content_collapses_to_smallest_id() {
    let records = vec![
        RawRecord::new("b2", WEATHER),
        RawRecord::new("b1", WEATHER),
    ];
    let outcome = reconcile(&records, &EngineConfig::default()).unwrap();
    assert_eq!(outcome.deduplicated_count, 1);
    assert_eq!(outcome.survivors[0].id, "b1");
    assert_eq!(outcome.removed[0].id, "b2");
    assert_eq!(outcome.removed[0].representative_id, "b1");
    assert_eq!(outcome.removed[0].similarity, 1.0);
}

#[test]
fn near_duplicate_collapses_by_fingerprint() {
    let records = vec![
        RawRecord::new("a1", ARTICLE),
        RawRecord::new("a2", format!("{ARTICLE} A correction followed.")),
        RawRecord::new("a3", WEATHER),
    ];
    let outcome = reconcile(&records, &wide_config()).unwrap();
    assert_eq!(outcome.deduplicated_count, 2);
    assert_eq!(outcome.removed_count, 1);
    assert_eq!(outcome.removed[0].id, "a2");
    assert_eq!(outcome.removed[0].representative_id, "a1");
    assert!(outcome.removed[0].similarity >= 0.85);
    let ids: Vec<&str> = outcome.survivors.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["a1", "a3"]);
}

#[test]
fn edit_distance_fallback_catches_reworded_text() {
    // Hamming threshold zero: everything except exact fingerprint matches
    // must go through the normalized edit-distance fallback.
    let cfg = EngineConfig::default()
        .with_num_blocks(8)
        .with_hamming_threshold(0);
    let reworded = ARTICLE.replacen("sharply", "modestly", 1);
    let records = vec![
        RawRecord::new("x1", ARTICLE),
        RawRecord::new("x2", reworded),
    ];
    let outcome = reconcile(&records, &cfg).unwrap();
    assert_eq!(outcome.deduplicated_count, 1);
    assert_eq!(outcome.removed[0].id, "x2");
    assert_eq!(outcome.removed[0].representative_id, "x1");
    assert!(outcome.removed[0].similarity >= 0.85);
}

#[test]
fn unrelated_records_all_survive() {
    let records = vec![
        RawRecord::new("u1", ARTICLE),
        RawRecord::new("u2", WEATHER),
    ];
    let outcome = reconcile(&records, &wide_config()).unwrap();
    assert_eq!(outcome.deduplicated_count, 2);
    assert_eq!(outcome.removed_count, 0);
    assert_eq!(outcome.group_count, 0);
}

#[test]
fn non_comparable_records_pass_through() {
    let records = vec![
        RawRecord::new("e1", ""),
        RawRecord::new("e2", "<p>   </p>"),
        RawRecord::new("u1", WEATHER),
    ];
    let outcome = reconcile(&records, &EngineConfig::default()).unwrap();
    assert_eq!(outcome.deduplicated_count, 3);
    assert_eq!(outcome.removed_count, 0);
}

#[test]
fn mixed_passes_compose() {
    let records = vec![
        RawRecord::new("9", ARTICLE).with_publish_time("2025-01-02 00:00:00"),
        RawRecord::new("9", ARTICLE).with_publish_time("2025-01-01 00:00:00"),
        RawRecord::new("5", WEATHER),
        RawRecord::new("6", WEATHER),
    ];
    let outcome = reconcile(&records, &EngineConfig::default()).unwrap();
    assert_eq!(outcome.original_count, 4);
    assert_eq!(outcome.deduplicated_count, 2);
    assert_eq!(outcome.removed_count, 2);
    assert_eq!(outcome.group_count, 2);
    let ids: Vec<&str> = outcome.survivors.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["9", "5"]);
}

#[test]
fn empty_batch_is_a_no_op() {
    let outcome = reconcile(&[], &EngineConfig::default()).unwrap();
    assert_eq!(outcome.original_count, 0);
    assert_eq!(outcome.deduplicated_count, 0);
    assert!(outcome.survivors.is_empty());
    assert!(outcome.removed.is_empty());
}
