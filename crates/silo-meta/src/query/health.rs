//! Monitoring reads: recent runs and per-pipeline health.
//!
//! These back the dashboard CLI; the heavy lifting lives in the
//! `v_recent_runs` and `v_pipeline_health` views created by the initial
//! migration.

use crate::error::{MetaResult, MetaResultExt};
use duckdb::Connection;

/// One row of the recent-runs listing.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: String,
    pub pipeline_name: String,
    pub pipeline_stage: String,
    pub status: String,
    pub started_at: String,
    pub duration_seconds: f64,
    pub records_processed: Option<i64>,
    pub records_loaded: Option<i64>,
    pub records_rejected: Option<i64>,
    pub error_message: Option<String>,
}

/// Most recent runs, newest first.
pub fn recent_runs(conn: &Connection, limit: usize) -> MetaResult<Vec<RunSummary>> {
    let mut stmt = conn
        .prepare(
            "SELECT run_id, pipeline_name, pipeline_stage, status,
                    CAST(started_at AS VARCHAR), duration_seconds,
                    records_processed, records_loaded, records_rejected, error_message
             FROM silo_meta.v_recent_runs
             LIMIT ?",
        )
        .query_context("prepare recent_runs")?;
    let rows = stmt
        .query_map(duckdb::params![limit as i64], |row| {
            Ok(RunSummary {
                run_id: row.get(0)?,
                pipeline_name: row.get(1)?,
                pipeline_stage: row.get(2)?,
                status: row.get(3)?,
                started_at: row.get(4)?,
                duration_seconds: row.get(5)?,
                records_processed: row.get(6)?,
                records_loaded: row.get(7)?,
                records_rejected: row.get(8)?,
                error_message: row.get(9)?,
            })
        })
        .query_context("query recent_runs")?
        .collect::<Result<Vec<_>, _>>()
        .query_context("collect recent_runs")?;
    Ok(rows)
}

/// Per-pipeline success rate and average duration over the trailing
/// 30-day window.
#[derive(Debug, Clone)]
pub struct PipelineHealth {
    pub pipeline_name: String,
    pub total_runs: i64,
    pub successful_runs: i64,
    pub failed_runs: i64,
    /// Percentage of successful runs, one decimal place.
    pub success_rate: f64,
    pub avg_duration_seconds: Option<f64>,
    pub last_run_at: String,
}

/// Health summary per pipeline, most recently active first.
pub fn pipeline_health(conn: &Connection) -> MetaResult<Vec<PipelineHealth>> {
    let mut stmt = conn
        .prepare(
            "SELECT pipeline_name, total_runs, successful_runs, failed_runs,
                    success_rate, avg_duration_seconds, CAST(last_run_at AS VARCHAR)
             FROM silo_meta.v_pipeline_health
             ORDER BY last_run_at DESC",
        )
        .query_context("prepare pipeline_health")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(PipelineHealth {
                pipeline_name: row.get(0)?,
                total_runs: row.get(1)?,
                successful_runs: row.get(2)?,
                failed_runs: row.get(3)?,
                success_rate: row.get(4)?,
                avg_duration_seconds: row.get(5)?,
                last_run_at: row.get(6)?,
            })
        })
        .query_context("query pipeline_health")?
        .collect::<Result<Vec<_>, _>>()
        .query_context("collect pipeline_health")?;
    Ok(rows)
}

#[cfg(test)]
#[path = "health_test.rs"]
mod tests;
