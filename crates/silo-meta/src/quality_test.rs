use super::*;
use crate::tracker::RunTracker;
use crate::MetaDb;
use silo_core::rules::Ruleset;

fn metric(run_id: &str, name: &str, passed: bool) -> QualityMetricRecord {
    QualityMetricRecord {
        run_id: run_id.to_string(),
        check_name: name.to_string(),
        category: RuleCategory::Completeness,
        table_name: Some("fact_measurement".to_string()),
        column_name: Some("value".to_string()),
        passed,
        metric_value: Some(if passed { 1.0 } else { 0.5 }),
        threshold_value: Some(0.95),
        row_count: Some(100),
        failure_count: Some(if passed { 0 } else { 50 }),
        details: None,
    }
}

fn start_run(meta: &MetaDb) -> String {
    let guard = RunTracker::start(meta, "health_etl", "transform", None, None).unwrap();
    let run_id = guard.run_id().to_string();
    guard
        .complete(silo_core::RunStatus::Success, &Default::default())
        .unwrap();
    run_id
}

#[test]
fn score_is_pass_ratio_times_100() {
    let meta = MetaDb::open_memory().unwrap();
    let run_id = start_run(&meta);

    for i in 0..10 {
        record_quality_metric(meta.conn(), &metric(&run_id, &format!("check_{i}"), i >= 2))
            .unwrap();
    }

    // 8 of 10 passed.
    assert_eq!(quality_score(meta.conn(), &run_id).unwrap(), 80.00);
}

#[test]
fn score_with_no_checks_is_zero() {
    let meta = MetaDb::open_memory().unwrap();
    let run_id = start_run(&meta);
    assert_eq!(quality_score(meta.conn(), &run_id).unwrap(), 0.0);
}

#[test]
fn score_rounds_to_two_decimals() {
    let meta = MetaDb::open_memory().unwrap();
    let run_id = start_run(&meta);

    // 1 of 3 passed -> 33.333... -> 33.33
    record_quality_metric(meta.conn(), &metric(&run_id, "a", true)).unwrap();
    record_quality_metric(meta.conn(), &metric(&run_id, "b", false)).unwrap();
    record_quality_metric(meta.conn(), &metric(&run_id, "c", false)).unwrap();

    assert_eq!(quality_score(meta.conn(), &run_id).unwrap(), 33.33);
}

#[test]
fn failure_count_above_row_count_rejected() {
    let meta = MetaDb::open_memory().unwrap();
    let run_id = start_run(&meta);

    let mut bad = metric(&run_id, "impossible", false);
    bad.failure_count = Some(200);
    bad.row_count = Some(100);

    let err = record_quality_metric(meta.conn(), &bad).unwrap_err();
    assert!(matches!(err, MetaError::InvalidRecord(_)));
}

#[test]
fn failed_checks_lists_only_failures_with_run_context() {
    let meta = MetaDb::open_memory().unwrap();
    let run_id = start_run(&meta);

    record_quality_metric(meta.conn(), &metric(&run_id, "passing", true)).unwrap();
    record_quality_metric(meta.conn(), &metric(&run_id, "failing", false)).unwrap();

    let failed = failed_checks(meta.conn(), 10).unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].check_name, "failing");
    assert_eq!(failed[0].pipeline_name, "health_etl");
}

#[test]
fn quality_by_category_groups_counts() {
    let meta = MetaDb::open_memory().unwrap();
    let run_id = start_run(&meta);

    record_quality_metric(meta.conn(), &metric(&run_id, "comp_1", true)).unwrap();
    let mut validity = metric(&run_id, "val_1", false);
    validity.category = RuleCategory::Validity;
    record_quality_metric(meta.conn(), &validity).unwrap();

    let summary = quality_by_category(meta.conn(), &run_id).unwrap();
    assert_eq!(summary.len(), 2);
    assert_eq!(summary[0].category, "completeness");
    assert_eq!(summary[0].passed_checks, 1);
    assert_eq!(summary[1].category, "validity");
    assert_eq!(summary[1].passed_checks, 0);
}

const RULES_YAML: &str = r#"
rules:
  - name: completeness_value
    category: completeness
    table_name: fact_measurement
    column_name: value
    type: threshold
    min_ratio: 0.95
  - name: validity_value_range
    category: validity
    table_name: fact_measurement
    column_name: value
    type: range
    min: 0.0
    max: 1000000000.0
    severity: warning
  - name: uniqueness_measurement_key
    category: uniqueness
    table_name: fact_measurement
    type: uniqueness
    key_columns: [indicator, year_label]
"#;

#[test]
fn rules_round_trip_through_quality_rules_table() {
    let meta = MetaDb::open_memory().unwrap();
    let ruleset = Ruleset::from_yaml_str(RULES_YAML).unwrap();

    assert_eq!(store_rules(meta.conn(), &ruleset).unwrap(), 3);
    let loaded = load_rules(meta.conn()).unwrap();
    assert_eq!(loaded.rules.len(), 3);

    let range = loaded.get("validity_value_range").unwrap();
    assert_eq!(range.severity, RuleSeverity::Warning);
    assert_eq!(
        range.kind,
        RuleKind::Range {
            min: 0.0,
            max: 1_000_000_000.0,
            tolerance: 0
        }
    );
}

#[test]
fn store_rules_upserts_by_name() {
    let meta = MetaDb::open_memory().unwrap();
    let mut ruleset = Ruleset::from_yaml_str(RULES_YAML).unwrap();

    store_rules(meta.conn(), &ruleset).unwrap();
    ruleset.rules[0].kind = RuleKind::Threshold { min_ratio: 0.99 };
    ruleset.rules[0].is_active = false;
    store_rules(meta.conn(), &ruleset).unwrap();

    let loaded = load_rules(meta.conn()).unwrap();
    assert_eq!(loaded.rules.len(), 3);
    let updated = loaded.get("completeness_value").unwrap();
    assert_eq!(updated.kind, RuleKind::Threshold { min_ratio: 0.99 });
    assert!(!updated.is_active);
}
