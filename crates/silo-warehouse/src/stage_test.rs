use super::*;
use crate::schema::Warehouse;
use silo_core::row::FieldValue;
use silo_meta::source_files::get_source_file;
use silo_meta::tracker::load_run;

fn measurement(indicator: &str, year: &str, value: f64) -> Row {
    Row::new()
        .with("indicator", FieldValue::Text(indicator.into()))
        .with("year_label", FieldValue::Text(year.into()))
        .with("value", FieldValue::Number(value))
}

fn batch(path: &str, bytes: &[u8], rows: Vec<Row>) -> FileBatch {
    FileBatch {
        path: PathBuf::from(path),
        bytes: bytes.to_vec(),
        shape: None,
        rows,
    }
}

fn permissive_ruleset() -> Ruleset {
    Ruleset::from_yaml_str(
        r#"
rules:
  - name: completeness_value
    category: completeness
    table_name: staging
    column_name: value
    type: threshold
    min_ratio: 0.5
"#,
    )
    .unwrap()
}

fn strict_ruleset() -> Ruleset {
    Ruleset::from_yaml_str(
        r#"
rules:
  - name: completeness_location
    category: completeness
    table_name: staging
    column_name: location
    type: threshold
    min_ratio: 1.0
"#,
    )
    .unwrap()
}

#[test]
fn successful_stage_completes_run_and_marks_file() {
    let wh = Warehouse::open_memory().unwrap();
    let b = batch(
        "data/raw/fy2016.csv",
        b"v1",
        vec![
            measurement("mmr", "2016/17", 336.0),
            measurement("anc4", "2016/17", 62.1),
        ],
    );

    let report = run_load_stage(&wh, "health_etl", &b, &permissive_ruleset(), false).unwrap();
    assert_eq!(report.status, RunStatus::Success);
    assert_eq!(report.change, ChangeState::New);
    assert_eq!(report.load.unwrap().loaded, 2);

    let run = load_run(wh.conn(), &report.run_id).unwrap();
    assert_eq!(run.status, RunStatus::Success);
    assert_eq!(run.records_input, Some(2));
    assert_eq!(run.records_loaded, Some(2));

    let file = get_source_file(wh.conn(), "data/raw/fy2016.csv").unwrap().unwrap();
    assert_eq!(file.status, "processed");
    assert_eq!(file.processing_count, 1);
}

#[test]
fn unchanged_file_is_skipped() {
    let wh = Warehouse::open_memory().unwrap();
    let rows = vec![measurement("mmr", "2016/17", 336.0)];

    let first = run_load_stage(
        &wh,
        "health_etl",
        &batch("a.csv", b"same", rows.clone()),
        &permissive_ruleset(),
        false,
    )
    .unwrap();
    assert_eq!(first.status, RunStatus::Success);

    let second = run_load_stage(
        &wh,
        "health_etl",
        &batch("a.csv", b"same", rows),
        &permissive_ruleset(),
        false,
    )
    .unwrap();
    assert_eq!(second.status, RunStatus::Skipped);
    assert!(second.load.is_none());

    // Skip is its own audited run.
    let run = load_run(wh.conn(), &second.run_id).unwrap();
    assert_eq!(run.status, RunStatus::Skipped);

    // And the file was not processed a second time.
    let file = get_source_file(wh.conn(), "a.csv").unwrap().unwrap();
    assert_eq!(file.processing_count, 1);
}

#[test]
fn force_reload_runs_despite_unchanged_fingerprint() {
    let wh = Warehouse::open_memory().unwrap();
    let rows = vec![measurement("mmr", "2016/17", 336.0)];

    run_load_stage(
        &wh,
        "health_etl",
        &batch("a.csv", b"same", rows.clone()),
        &permissive_ruleset(),
        false,
    )
    .unwrap();
    let forced = run_load_stage(
        &wh,
        "health_etl",
        &batch("a.csv", b"same", rows),
        &permissive_ruleset(),
        true,
    )
    .unwrap();

    assert_eq!(forced.status, RunStatus::Success);
    // Idempotent: the rerun rewrote nothing.
    assert_eq!(forced.load.unwrap().skipped, 1);
    assert_eq!(wh.table_count("fact_measurement").unwrap(), 1);
}

#[test]
fn critical_quality_failure_fails_run_without_loading() {
    let wh = Warehouse::open_memory().unwrap();
    // Rows have no location; the strict ruleset demands 100% completeness.
    let b = batch("a.csv", b"v1", vec![measurement("mmr", "2016/17", 336.0)]);

    let report = run_load_stage(&wh, "health_etl", &b, &strict_ruleset(), false).unwrap();
    assert_eq!(report.status, RunStatus::Failed);
    assert!(report.load.is_none());
    assert!(!report.validation.unwrap().overall_passed);

    // Nothing reached the warehouse.
    assert_eq!(wh.table_count("fact_measurement").unwrap(), 0);

    let run = load_run(wh.conn(), &report.run_id).unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(
        run.error_message.as_deref(),
        Some("critical quality checks failed")
    );

    let file = get_source_file(wh.conn(), "a.csv").unwrap().unwrap();
    assert_eq!(file.status, "failed");
    assert_eq!(file.processing_count, 0);
}

#[test]
fn lineage_recorded_for_populated_columns() {
    let wh = Warehouse::open_memory().unwrap();
    let b = batch("a.csv", b"v1", vec![measurement("mmr", "2016/17", 336.0)]);

    let report = run_load_stage(&wh, "health_etl", &b, &permissive_ruleset(), false).unwrap();

    for (table, column) in [
        ("dim_indicator", "indicator_name"),
        ("dim_period", "period_label"),
        ("dim_period", "year"),
        ("fact_measurement", "value"),
    ] {
        let records = silo_meta::lineage::lineage_for(wh.conn(), table, column).unwrap();
        assert!(
            records.iter().any(|r| r.run_id == report.run_id),
            "no lineage for {table}.{column}"
        );
    }

    // No location column in the batch, so no location lineage.
    assert!(silo_meta::lineage::lineage_for(wh.conn(), "dim_location", "location_name")
        .unwrap()
        .is_empty());
}

#[test]
fn per_file_failures_are_isolated() {
    let wh = Warehouse::open_memory().unwrap();
    let batches = vec![
        batch("good1.csv", b"a", vec![measurement("mmr", "2016/17", 336.0)]),
        // All-null value column fails the critical completeness rule.
        batch(
            "bad.csv",
            b"b",
            vec![Row::new().with("indicator", FieldValue::Text("x".into()))],
        ),
        batch("good2.csv", b"c", vec![measurement("anc4", "2017/18", 62.1)]),
    ];

    let tally = run_load_stages(&wh, "health_etl", &batches, &permissive_ruleset(), false);

    // The bad file's run is failed, the good ones succeeded.
    assert_eq!(tally.succeeded(), 2);
    assert_eq!(tally.reports.len(), 3);
    assert!(tally.failures.is_empty());
    assert_eq!(
        tally
            .reports
            .iter()
            .filter(|r| r.status == RunStatus::Failed)
            .count(),
        1
    );

    // Both good files landed.
    assert_eq!(wh.table_count("fact_measurement").unwrap(), 2);
}

#[test]
fn schema_drift_recorded_as_warning_signal() {
    use silo_meta::source_files::SourceShape;

    let wh = Warehouse::open_memory().unwrap();
    let shape_v1 = SourceShape {
        sheet_count: None,
        row_count: None,
        column_count: Some(1),
        columns: vec![("indicator".to_string(), "text".to_string())],
    };
    let shape_v2 = SourceShape {
        sheet_count: None,
        row_count: None,
        column_count: Some(2),
        columns: vec![
            ("indicator".to_string(), "text".to_string()),
            ("district".to_string(), "text".to_string()),
        ],
    };

    let rows = vec![measurement("mmr", "2016/17", 336.0)];
    let mut first = batch("a.csv", b"v1", rows.clone());
    first.shape = Some(shape_v1);
    run_load_stage(&wh, "health_etl", &first, &permissive_ruleset(), false).unwrap();

    let mut second = batch("a.csv", b"v2", rows);
    second.shape = Some(shape_v2);
    let report = run_load_stage(&wh, "health_etl", &second, &permissive_ruleset(), false).unwrap();

    // Drift is recorded but the run still succeeds.
    assert_eq!(report.status, RunStatus::Success);
    let drift_count: i64 = wh
        .conn()
        .query_row(
            "SELECT COUNT(*) FROM silo_meta.data_quality_metrics
             WHERE run_id = ? AND check_name = 'schema_drift' AND NOT passed",
            duckdb::params![report.run_id],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(drift_count, 1);
}
