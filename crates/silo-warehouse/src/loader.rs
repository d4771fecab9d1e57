//! Idempotent fact loading.
//!
//! One transaction per batch: per-row rejections reduce the loaded count
//! without aborting, an unrecoverable SQL failure rolls everything back.
//! Facts upsert on the (indicator, period, location) surrogate tuple, so a
//! second run over unchanged input produces the same fact set, not a
//! doubled one.

use crate::dimensions::{resolve_indicator, resolve_location, resolve_period};
use crate::error::{WarehouseError, WarehouseResult};
use crate::schema::Warehouse;
use duckdb::Connection;
use serde_json::json;
use silo_core::row::Row;
use silo_core::rules::RuleCategory;
use silo_meta::quality::{record_quality_metric, QualityMetricRecord};

/// A measurement extracted from a source row.
#[derive(Debug, Clone, Default)]
pub struct FactRow {
    pub indicator: Option<String>,
    pub period_label: Option<String>,
    pub location: Option<String>,
    pub value: Option<f64>,
    pub unit: Option<String>,
    pub notes: Option<String>,
}

impl FactRow {
    /// Extract the standard measurement fields from a named-field row.
    pub fn from_row(row: &Row) -> Self {
        let text = |name: &str| {
            row.get(name)
                .and_then(|v| v.as_text())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        Self {
            indicator: text("indicator"),
            period_label: text("year_label").or_else(|| text("period")),
            location: text("location"),
            value: row.get("value").and_then(|v| v.as_number()),
            unit: text("unit"),
            notes: text("notes"),
        }
    }
}

/// Counters for one batch load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadResult {
    /// Facts inserted or updated.
    pub loaded: i64,
    /// Rows rejected by referential or value-domain validation.
    pub rejected: i64,
    /// Rows whose fact already existed with identical values.
    pub skipped: i64,
}

/// Load a batch of rows into the star schema under `run_id`.
///
/// Rejections are recorded as failed quality metrics (consistency for
/// unresolvable dimensions, validity for value-domain violations) inside
/// the same transaction as the facts themselves.
pub fn load_facts(wh: &Warehouse, rows: &[Row], run_id: &str) -> WarehouseResult<LoadResult> {
    wh.transaction(|conn| load_batch(conn, rows, run_id))
}

fn load_batch(conn: &Connection, rows: &[Row], run_id: &str) -> WarehouseResult<LoadResult> {
    let mut result = LoadResult::default();
    let mut consistency_failures: i64 = 0;
    let mut validity_failures: i64 = 0;

    for row in rows {
        let fact = FactRow::from_row(row);

        // Referential integrity: a fact needs resolvable indicator and
        // period keys. Missing keys reject the row, not the batch.
        let (Some(indicator), Some(period_label)) = (&fact.indicator, &fact.period_label) else {
            consistency_failures += 1;
            result.rejected += 1;
            continue;
        };

        // Value domain: numeric, finite, non-negative. Zero is valid.
        let value = match fact.value {
            Some(v) if v.is_finite() && v >= 0.0 => v,
            _ => {
                validity_failures += 1;
                result.rejected += 1;
                continue;
            }
        };

        let indicator_id = resolve_indicator(conn, indicator)?;
        let period_id = resolve_period(conn, period_label)?;
        let location_id = match &fact.location {
            Some(location) => Some(resolve_location(conn, location)?),
            None => None,
        };

        match upsert_fact(
            conn,
            indicator_id,
            period_id,
            location_id,
            value,
            fact.unit.as_deref(),
            fact.notes.as_deref(),
            run_id,
        )? {
            UpsertOutcome::Written => result.loaded += 1,
            UpsertOutcome::Identical => result.skipped += 1,
        }
    }

    record_rejection_metrics(
        conn,
        run_id,
        rows.len() as i64,
        consistency_failures,
        validity_failures,
    )?;

    log::info!(
        "Batch load for run {run_id}: {} loaded, {} rejected, {} skipped",
        result.loaded,
        result.rejected,
        result.skipped
    );
    Ok(result)
}

enum UpsertOutcome {
    Written,
    Identical,
}

/// Upsert one fact keyed by its surrogate tuple.
///
/// `IS NOT DISTINCT FROM` makes the nullable location part of the key.
/// Existing facts with different values are updated (last-write-wins);
/// identical ones are left untouched.
#[allow(clippy::too_many_arguments)]
fn upsert_fact(
    conn: &Connection,
    indicator_id: i64,
    period_id: i64,
    location_id: Option<i64>,
    value: f64,
    unit: Option<&str>,
    notes: Option<&str>,
    run_id: &str,
) -> WarehouseResult<UpsertOutcome> {
    let existing: Option<(i64, f64, Option<String>, Option<String>)> = match conn.query_row(
        "SELECT fact_id, value, unit, notes
         FROM warehouse.fact_measurement
         WHERE indicator_id = ? AND period_id = ? AND location_id IS NOT DISTINCT FROM ?",
        duckdb::params![indicator_id, period_id, location_id],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
    ) {
        Ok(found) => Some(found),
        Err(duckdb::Error::QueryReturnedNoRows) => None,
        Err(e) => return Err(WarehouseError::LoadError(format!("select fact: {e}"))),
    };

    match existing {
        Some((_, old_value, ref old_unit, ref old_notes))
            if old_value == value
                && old_unit.as_deref() == unit
                && old_notes.as_deref() == notes =>
        {
            Ok(UpsertOutcome::Identical)
        }
        Some((fact_id, _, _, _)) => {
            conn.execute(
                "UPDATE warehouse.fact_measurement
                 SET value = ?, unit = ?, notes = ?, loaded_by_run = ?
                 WHERE fact_id = ?",
                duckdb::params![value, unit, notes, run_id, fact_id],
            )
            .map_err(|e| WarehouseError::LoadError(format!("update fact: {e}")))?;
            Ok(UpsertOutcome::Written)
        }
        None => {
            conn.execute(
                "INSERT INTO warehouse.fact_measurement
                 (indicator_id, period_id, location_id, value, unit, notes, loaded_by_run)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                duckdb::params![indicator_id, period_id, location_id, value, unit, notes, run_id],
            )
            .map_err(|e| WarehouseError::LoadError(format!("insert fact: {e}")))?;
            Ok(UpsertOutcome::Written)
        }
    }
}

/// One aggregate metric per rejection category per batch.
fn record_rejection_metrics(
    conn: &Connection,
    run_id: &str,
    row_count: i64,
    consistency_failures: i64,
    validity_failures: i64,
) -> WarehouseResult<()> {
    record_quality_metric(
        conn,
        &QualityMetricRecord {
            run_id: run_id.to_string(),
            check_name: "load_referential_integrity".to_string(),
            category: RuleCategory::Consistency,
            table_name: Some("fact_measurement".to_string()),
            column_name: None,
            passed: consistency_failures == 0,
            metric_value: Some(consistency_failures as f64),
            threshold_value: Some(0.0),
            row_count: Some(row_count),
            failure_count: Some(consistency_failures),
            details: Some(json!({"reason": "unresolvable indicator or period key"})),
        },
    )?;
    record_quality_metric(
        conn,
        &QualityMetricRecord {
            run_id: run_id.to_string(),
            check_name: "load_value_domain".to_string(),
            category: RuleCategory::Validity,
            table_name: Some("fact_measurement".to_string()),
            column_name: Some("value".to_string()),
            passed: validity_failures == 0,
            metric_value: Some(validity_failures as f64),
            threshold_value: Some(0.0),
            row_count: Some(row_count),
            failure_count: Some(validity_failures),
            details: Some(json!({"reason": "missing, negative, or non-finite value"})),
        },
    )?;
    Ok(())
}

#[cfg(test)]
#[path = "loader_test.rs"]
mod tests;
