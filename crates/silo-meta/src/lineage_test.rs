use super::*;
use crate::tracker::RunTracker;
use crate::MetaDb;

fn finished_run(meta: &MetaDb) -> String {
    let guard = RunTracker::start(meta, "health_etl", "load", None, None).unwrap();
    let run_id = guard.run_id().to_string();
    guard
        .complete(silo_core::RunStatus::Success, &Default::default())
        .unwrap();
    run_id
}

#[test]
fn record_and_query_round_trip() {
    let meta = MetaDb::open_memory().unwrap();
    let run_id = finished_run(&meta);

    let entry = LineageEntry {
        target_schema: None,
        target_table: "fact_measurement".to_string(),
        target_column: "value".to_string(),
        source_file: "data/raw/indicators.xlsx".to_string(),
        source_sheet: Some("2016-17".to_string()),
        source_column: Some("Annual Value".to_string()),
        transformation_logic: Some("unpivoted year columns into rows".to_string()),
        kind: TransformationKind::Unpivot,
    };
    record_lineage(meta.conn(), &run_id, &entry).unwrap();

    let records = lineage_for(meta.conn(), "fact_measurement", "value").unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].run_id, run_id);
    assert_eq!(records[0].target_schema, "warehouse");
    assert_eq!(records[0].transformation_type, "unpivot");
    assert_eq!(records[0].source_sheet.as_deref(), Some("2016-17"));
}

#[test]
fn multiple_sources_for_same_column_all_kept() {
    let meta = MetaDb::open_memory().unwrap();
    let run_id = finished_run(&meta);

    for file in ["fy2016.xlsx", "fy2017.xlsx", "fy2016.xlsx"] {
        record_lineage(
            meta.conn(),
            &run_id,
            &LineageEntry::direct("fact_measurement", "value", file, "value"),
        )
        .unwrap();
    }

    // Purely additive: no dedup even for identical entries.
    let records = lineage_for(meta.conn(), "fact_measurement", "value").unwrap();
    assert_eq!(records.len(), 3);
}

#[test]
fn most_recent_first_across_runs() {
    let meta = MetaDb::open_memory().unwrap();

    let first = finished_run(&meta);
    record_lineage(
        meta.conn(),
        &first,
        &LineageEntry::direct("dim_indicator", "indicator_name", "old.xlsx", "Indicator"),
    )
    .unwrap();

    let second = finished_run(&meta);
    record_lineage(
        meta.conn(),
        &second,
        &LineageEntry::direct("dim_indicator", "indicator_name", "new.xlsx", "Indicator"),
    )
    .unwrap();

    let records = lineage_for(meta.conn(), "dim_indicator", "indicator_name").unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].source_file, "new.xlsx");
    assert_eq!(records[1].source_file, "old.xlsx");
}

#[test]
fn empty_target_rejected() {
    let meta = MetaDb::open_memory().unwrap();
    let run_id = finished_run(&meta);

    let entry = LineageEntry::direct("", "value", "a.xlsx", "v");
    let err = record_lineage(meta.conn(), &run_id, &entry).unwrap_err();
    assert!(matches!(err, MetaError::InvalidRecord(_)));
}

#[test]
fn empty_source_file_rejected() {
    let meta = MetaDb::open_memory().unwrap();
    let run_id = finished_run(&meta);

    let entry = LineageEntry::direct("fact_measurement", "value", "  ", "v");
    let err = record_lineage(meta.conn(), &run_id, &entry).unwrap_err();
    assert!(matches!(err, MetaError::InvalidRecord(_)));
}

#[test]
fn fresh_query_sees_new_records() {
    let meta = MetaDb::open_memory().unwrap();
    let run_id = finished_run(&meta);

    assert!(lineage_for(meta.conn(), "fact_measurement", "unit")
        .unwrap()
        .is_empty());

    record_lineage(
        meta.conn(),
        &run_id,
        &LineageEntry::direct("fact_measurement", "unit", "a.xlsx", "Units"),
    )
    .unwrap();

    assert_eq!(
        lineage_for(meta.conn(), "fact_measurement", "unit")
            .unwrap()
            .len(),
        1
    );
}
