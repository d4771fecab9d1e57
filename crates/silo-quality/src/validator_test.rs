use super::*;
use crate::reference::InMemoryReferences;
use silo_core::row::FieldValue;
use silo_core::rules::Ruleset;
use silo_core::{RunStatus, StageOutcome};
use silo_meta::tracker::RunTracker;

fn measurement(indicator: &str, year: &str, value: Option<f64>) -> Row {
    let value_field = value.map(FieldValue::Number).unwrap_or(FieldValue::Null);
    Row::new()
        .with("indicator", FieldValue::Text(indicator.into()))
        .with("year_label", FieldValue::Text(year.into()))
        .with("value", value_field)
}

fn ruleset(yaml: &str) -> Ruleset {
    Ruleset::from_yaml_str(yaml).unwrap()
}

/// Start a run, validate, then complete the run; returns the summary and
/// the run id for post-hoc queries.
fn run_validation(
    meta: &MetaDb,
    refs: &dyn ReferenceResolver,
    rows: &[Row],
    rules: &Ruleset,
) -> (ValidationSummary, String) {
    let guard = RunTracker::start(meta, "health_etl", "transform", None, None).unwrap();
    let run_id = guard.run_id().to_string();
    let summary = Validator::new(meta, refs)
        .validate(rows, rules, &run_id)
        .unwrap();
    guard
        .complete(RunStatus::Success, &StageOutcome::default())
        .unwrap();
    (summary, run_id)
}

#[test]
fn threshold_passes_when_ratio_met() {
    let meta = MetaDb::open_memory().unwrap();
    let refs = InMemoryReferences::new();
    let rules = ruleset(
        r#"
rules:
  - name: completeness_value
    category: completeness
    table_name: staging
    column_name: value
    type: threshold
    min_ratio: 0.75
"#,
    );

    let rows: Vec<Row> = (0..4)
        .map(|i| measurement("mmr", "2016/17", if i == 0 { None } else { Some(1.0) }))
        .collect();

    let (summary, run_id) = run_validation(&meta, &refs, &rows, &rules);
    assert_eq!(summary.checks_run, 1);
    assert_eq!(summary.checks_passed, 1);
    assert!(summary.overall_passed);
    assert_eq!(summary.score, 100.0);

    // Exactly one metric row per rule evaluation.
    let count: i64 = meta
        .conn()
        .query_row(
            "SELECT COUNT(*) FROM silo_meta.data_quality_metrics WHERE run_id = ?",
            duckdb::params![run_id],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn threshold_fails_below_ratio() {
    let meta = MetaDb::open_memory().unwrap();
    let refs = InMemoryReferences::new();
    let rules = ruleset(
        r#"
rules:
  - name: completeness_value
    category: completeness
    table_name: staging
    column_name: value
    type: threshold
    min_ratio: 0.95
"#,
    );

    let rows = vec![
        measurement("mmr", "2016/17", Some(1.0)),
        measurement("mmr", "2017/18", None),
    ];

    let (summary, _) = run_validation(&meta, &refs, &rows, &rules);
    assert_eq!(summary.checks_failed, 1);
    assert_eq!(summary.critical_failures, 1);
    assert!(!summary.overall_passed);
    assert_eq!(summary.score, 0.0);
}

#[test]
fn range_rejects_negative_accepts_zero() {
    let meta = MetaDb::open_memory().unwrap();
    let refs = InMemoryReferences::new();
    let rules = ruleset(
        r#"
rules:
  - name: validity_no_negatives
    category: validity
    table_name: staging
    column_name: value
    type: range
    min: 0.0
    max: 1000000000.0
"#,
    );

    // Zero is inside the range; -5 is not.
    let passing = vec![measurement("mmr", "2016/17", Some(0.0))];
    let (summary, _) = run_validation(&meta, &refs, &passing, &rules);
    assert!(summary.overall_passed);

    let failing = vec![measurement("mmr", "2016/17", Some(-5.0))];
    let (summary, run_id) = run_validation(&meta, &refs, &failing, &rules);
    assert!(!summary.overall_passed);

    let (category, failure_count): (String, i64) = meta
        .conn()
        .query_row(
            "SELECT check_category, failure_count FROM silo_meta.data_quality_metrics WHERE run_id = ?",
            duckdb::params![run_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(category, "validity");
    assert_eq!(failure_count, 1);
}

#[test]
fn range_tolerance_allows_outliers() {
    let meta = MetaDb::open_memory().unwrap();
    let refs = InMemoryReferences::new();
    let rules = ruleset(
        r#"
rules:
  - name: validity_value_range
    category: validity
    table_name: staging
    column_name: value
    type: range
    min: 0.0
    max: 100.0
    tolerance: 1
"#,
    );

    let rows = vec![
        measurement("mmr", "2016/17", Some(50.0)),
        measurement("mmr", "2017/18", Some(101.0)),
    ];
    let (summary, _) = run_validation(&meta, &refs, &rows, &rules);
    assert!(summary.overall_passed, "one outlier within tolerance");
}

#[test]
fn uniqueness_counts_duplicated_rows() {
    let meta = MetaDb::open_memory().unwrap();
    let refs = InMemoryReferences::new();
    let rules = ruleset(
        r#"
rules:
  - name: uniqueness_measurement_key
    category: uniqueness
    table_name: staging
    type: uniqueness
    key_columns: [indicator, year_label]
"#,
    );

    let rows = vec![
        measurement("mmr", "2016/17", Some(1.0)),
        measurement("mmr", "2016/17", Some(2.0)),
        measurement("anc4", "2016/17", Some(3.0)),
    ];

    let (summary, run_id) = run_validation(&meta, &refs, &rows, &rules);
    assert!(!summary.overall_passed);

    let failure_count: i64 = meta
        .conn()
        .query_row(
            "SELECT failure_count FROM silo_meta.data_quality_metrics WHERE run_id = ?",
            duckdb::params![run_id],
            |r| r.get(0),
        )
        .unwrap();
    // Both rows sharing the key count as duplicates.
    assert_eq!(failure_count, 2);
}

#[test]
fn custom_rule_finds_orphans() {
    let meta = MetaDb::open_memory().unwrap();
    let mut refs = InMemoryReferences::new();
    refs.insert(
        "dim_indicator",
        "indicator_name",
        ["mmr", "anc4"],
    );
    let rules = ruleset(
        r#"
rules:
  - name: consistency_indicator_fk
    category: consistency
    table_name: staging
    column_name: indicator
    type: custom
    reference_table: dim_indicator
    reference_column: indicator_name
"#,
    );

    let rows = vec![
        measurement("mmr", "2016/17", Some(1.0)),
        measurement("unknown_indicator", "2016/17", Some(2.0)),
    ];

    let (summary, _) = run_validation(&meta, &refs, &rows, &rules);
    assert!(!summary.overall_passed);
    assert_eq!(summary.checks_failed, 1);
}

#[test]
fn custom_rule_without_reference_set_is_error() {
    let meta = MetaDb::open_memory().unwrap();
    let refs = InMemoryReferences::new();
    let rules = ruleset(
        r#"
rules:
  - name: consistency_indicator_fk
    category: consistency
    table_name: staging
    column_name: indicator
    type: custom
    reference_table: dim_indicator
    reference_column: indicator_name
"#,
    );

    let guard = RunTracker::start(&meta, "health_etl", "transform", None, None).unwrap();
    let run_id = guard.run_id().to_string();
    let err = Validator::new(&meta, &refs)
        .validate(&[measurement("mmr", "2016/17", Some(1.0))], &rules, &run_id)
        .unwrap_err();
    assert!(matches!(err, QualityError::Reference { .. }));
    guard.fail("reference lookup failed", None).unwrap();
}

#[test]
fn warning_failure_does_not_flip_overall_pass() {
    let meta = MetaDb::open_memory().unwrap();
    let refs = InMemoryReferences::new();
    let rules = ruleset(
        r#"
rules:
  - name: completeness_value
    category: completeness
    table_name: staging
    column_name: value
    type: threshold
    min_ratio: 0.5
  - name: validity_value_range
    category: validity
    table_name: staging
    column_name: value
    type: range
    min: 0.0
    max: 10.0
    severity: warning
"#,
    );

    let rows = vec![measurement("mmr", "2016/17", Some(50.0))];
    let (summary, _) = run_validation(&meta, &refs, &rows, &rules);

    assert_eq!(summary.checks_run, 2);
    assert_eq!(summary.checks_failed, 1);
    assert_eq!(summary.critical_failures, 0);
    assert!(summary.overall_passed, "warning failures are recorded only");
    // Score still counts the warning failure: 1 of 2 passed.
    assert_eq!(summary.score, 50.0);
}

#[test]
fn score_is_eighty_for_eight_of_ten() {
    let meta = MetaDb::open_memory().unwrap();
    let refs = InMemoryReferences::new();

    // Ten threshold rules over columns a..j; rows leave two columns null.
    let mut yaml = String::from("rules:\n");
    for (i, col) in ["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"]
        .iter()
        .enumerate()
    {
        yaml.push_str(&format!(
            "  - name: completeness_{col}\n    category: completeness\n    table_name: staging\n    column_name: {col}\n    type: threshold\n    min_ratio: 1.0\n    severity: {}\n",
            if i % 2 == 0 { "critical" } else { "warning" }
        ));
    }
    let rules = ruleset(&yaml);

    let mut row = Row::new();
    for col in ["a", "b", "c", "d", "e", "f", "g", "h"] {
        row.push(col, FieldValue::Number(1.0));
    }
    row.push("i", FieldValue::Null);
    row.push("j", FieldValue::Null);

    let (summary, run_id) = run_validation(&meta, &refs, &[row], &rules);
    assert_eq!(summary.checks_run, 10);
    assert_eq!(summary.checks_failed, 2);
    assert_eq!(summary.score, 80.00);
    assert_eq!(
        silo_meta::quality::quality_score(meta.conn(), &run_id).unwrap(),
        80.00
    );
}

#[test]
fn empty_ruleset_scores_zero() {
    let meta = MetaDb::open_memory().unwrap();
    let refs = InMemoryReferences::new();
    let rules = Ruleset::default();

    let (summary, _) = run_validation(&meta, &refs, &[], &rules);
    assert_eq!(summary.checks_run, 0);
    assert!(summary.overall_passed);
    assert_eq!(summary.score, 0.0);
}

#[test]
fn inactive_rules_are_skipped() {
    let meta = MetaDb::open_memory().unwrap();
    let refs = InMemoryReferences::new();
    let rules = ruleset(
        r#"
rules:
  - name: completeness_value
    category: completeness
    table_name: staging
    column_name: value
    type: threshold
    min_ratio: 1.0
    is_active: false
"#,
    );

    let rows = vec![measurement("mmr", "2016/17", None)];
    let (summary, _) = run_validation(&meta, &refs, &rows, &rules);
    assert_eq!(summary.checks_run, 0);
    assert!(summary.overall_passed);
}
