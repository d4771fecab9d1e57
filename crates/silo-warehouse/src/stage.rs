//! Load-stage orchestration: the canonical composition of tracker,
//! fingerprint registry, validator, loader, and lineage recorder.
//!
//! [`run_load_stage`] drives one source file through one tracked run.
//! [`run_load_stages`] isolates per-file failures: one bad file is tallied
//! and the rest of the batch still runs.

use crate::error::WarehouseResult;
use crate::loader::{load_facts, LoadResult};
use crate::schema::Warehouse;
use serde_json::json;
use silo_core::row::Row;
use silo_core::rules::{RuleCategory, Ruleset};
use silo_core::run::{RunStatus, StageOutcome};
use silo_meta::lineage::{record_lineage, LineageEntry, TransformationKind};
use silo_meta::quality::{record_quality_metric, QualityMetricRecord};
use silo_meta::source_files::{self, ChangeState, SourceShape};
use silo_meta::tracker::RunTracker;
use silo_quality::{ValidationSummary, Validator};
use std::path::{Path, PathBuf};

/// One source file ready to load: its identity, raw bytes for
/// fingerprinting, optional tabular shape, and the parsed rows.
#[derive(Debug)]
pub struct FileBatch {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
    pub shape: Option<SourceShape>,
    pub rows: Vec<Row>,
}

/// Outcome of one file's load stage.
#[derive(Debug)]
pub struct StageReport {
    pub run_id: String,
    pub status: RunStatus,
    pub change: ChangeState,
    pub validation: Option<ValidationSummary>,
    pub load: Option<LoadResult>,
}

/// Drive one file through a tracked load stage.
///
/// The scope always closes with exactly one terminal run status:
/// - `skipped` when the fingerprint is unchanged and `force` is off
/// - `failed` when critical quality checks fail or the load errors
/// - `success` otherwise, with final counters
pub fn run_load_stage(
    wh: &Warehouse,
    pipeline: &str,
    batch: &FileBatch,
    ruleset: &Ruleset,
    force: bool,
) -> WarehouseResult<StageReport> {
    let meta = wh.meta();
    let source = batch.path.display().to_string();

    let registration =
        source_files::register(meta, &batch.path, &batch.bytes, batch.shape.as_ref())?;
    let change = registration.change;

    let guard = RunTracker::start(meta, pipeline, "load", Some(&source), None)?;
    let run_id = guard.run_id().to_string();

    if change == ChangeState::Unchanged && !force {
        log::info!("Source unchanged, skipping load: {source}");
        guard.complete(RunStatus::Skipped, &StageOutcome::default())?;
        return Ok(StageReport {
            run_id,
            status: RunStatus::Skipped,
            change,
            validation: None,
            load: None,
        });
    }

    let worked = (|| -> WarehouseResult<(ValidationSummary, Option<LoadResult>)> {
        if registration.schema_drift {
            record_schema_drift(wh, &run_id, &source)?;
        }

        let validation = Validator::new(meta, wh).validate(&batch.rows, ruleset, &run_id)?;
        if !validation.overall_passed {
            return Ok((validation, None));
        }

        let load = load_facts(wh, &batch.rows, &run_id)?;
        record_standard_lineage(wh, &run_id, &source, &batch.rows)?;
        Ok((validation, Some(load)))
    })();

    match worked {
        Ok((validation, Some(load))) => {
            let input = batch.rows.len() as i64;
            guard.complete(
                RunStatus::Success,
                &StageOutcome::counts(input, load.loaded + load.skipped, load.loaded, load.rejected),
            )?;
            source_files::mark_processed(meta, &batch.path)?;
            Ok(StageReport {
                run_id,
                status: RunStatus::Success,
                change,
                validation: Some(validation),
                load: Some(load),
            })
        }
        Ok((validation, None)) => {
            // Critical quality failure: policy says this run must not read
            // as success, even though nothing threw.
            guard.fail(
                "critical quality checks failed",
                Some(&json!({
                    "critical_failures": validation.critical_failures,
                    "checks_failed": validation.checks_failed,
                })),
            )?;
            source_files::mark_failed(meta, &batch.path)?;
            Ok(StageReport {
                run_id,
                status: RunStatus::Failed,
                change,
                validation: Some(validation),
                load: None,
            })
        }
        Err(e) => {
            guard.fail(&e.to_string(), None)?;
            source_files::mark_failed(meta, &batch.path)?;
            Err(e)
        }
    }
}

/// Per-file success/failure tally for a multi-file batch.
#[derive(Debug, Default)]
pub struct StageTally {
    pub reports: Vec<StageReport>,
    pub failures: Vec<(PathBuf, String)>,
}

impl StageTally {
    pub fn succeeded(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.status == RunStatus::Success)
            .count()
    }
}

/// Run the load stage for each file, isolating failures.
///
/// A file whose stage errors is recorded in `failures` (its own run already
/// carries the terminal `failed` status) and the remaining files are still
/// attempted.
pub fn run_load_stages(
    wh: &Warehouse,
    pipeline: &str,
    batches: &[FileBatch],
    ruleset: &Ruleset,
    force: bool,
) -> StageTally {
    let mut tally = StageTally::default();
    for batch in batches {
        match run_load_stage(wh, pipeline, batch, ruleset, force) {
            Ok(report) => tally.reports.push(report),
            Err(e) => {
                log::error!("Load failed for {}: {e}", batch.path.display());
                tally.failures.push((batch.path.clone(), e.to_string()));
            }
        }
    }
    tally
}

/// Schema drift is a warning-grade signal: recorded as a failed
/// consistency check, never an error.
fn record_schema_drift(wh: &Warehouse, run_id: &str, source: &str) -> WarehouseResult<()> {
    log::warn!("Schema drift detected for {source}");
    record_quality_metric(
        wh.conn(),
        &QualityMetricRecord {
            run_id: run_id.to_string(),
            check_name: "schema_drift".to_string(),
            category: RuleCategory::Consistency,
            table_name: None,
            column_name: None,
            passed: false,
            metric_value: None,
            threshold_value: None,
            row_count: None,
            failure_count: None,
            details: Some(json!({"source_file": source})),
        },
    )?;
    Ok(())
}

/// Record provenance for every warehouse column this load populates.
fn record_standard_lineage(
    wh: &Warehouse,
    run_id: &str,
    source: &str,
    rows: &[Row],
) -> WarehouseResult<()> {
    let conn = wh.conn();

    record_lineage(
        conn,
        run_id,
        &LineageEntry::direct("dim_indicator", "indicator_name", source, "indicator"),
    )?;
    record_lineage(
        conn,
        run_id,
        &LineageEntry::direct("dim_period", "period_label", source, "year_label"),
    )?;
    record_lineage(
        conn,
        run_id,
        &LineageEntry {
            target_schema: None,
            target_table: "dim_period".to_string(),
            target_column: "year".to_string(),
            source_file: source.to_string(),
            source_sheet: None,
            source_column: Some("year_label".to_string()),
            transformation_logic: Some("fiscal year parsed from period label".to_string()),
            kind: TransformationKind::Derived,
        },
    )?;
    record_lineage(
        conn,
        run_id,
        &LineageEntry::direct("fact_measurement", "value", source, "value"),
    )?;

    if rows.iter().any(|r| !r.is_null("location")) {
        record_lineage(
            conn,
            run_id,
            &LineageEntry::direct("dim_location", "location_name", source, "location"),
        )?;
    }
    if rows.iter().any(|r| !r.is_null("unit")) {
        record_lineage(
            conn,
            run_id,
            &LineageEntry::direct("fact_measurement", "unit", source, "unit"),
        )?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "stage_test.rs"]
mod tests;
