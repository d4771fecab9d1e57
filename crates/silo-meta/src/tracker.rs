//! Run tracking: one record per stage execution, with scoped lifecycle.
//!
//! [`RunTracker::start`] inserts a `running` row and returns a [`RunGuard`].
//! The guard guarantees exactly one terminal transition: `complete` or
//! `fail` consume it, and dropping it without either (panic, early `?`)
//! marks the run `failed` so no run is ever left `running`.

use crate::connection::MetaDb;
use crate::error::{MetaError, MetaResult, MetaResultExt};
use duckdb::Connection;
use silo_core::run::{RunStatus, StageOutcome};
use uuid::Uuid;

/// Entry point for run tracking.
pub struct RunTracker;

impl RunTracker {
    /// Create a run in `running` state and return its scope guard.
    ///
    /// Concurrent runs of the same pipeline/stage each get a distinct id;
    /// runs are independent audit rows, so no locking is involved.
    pub fn start<'a>(
        meta: &'a MetaDb,
        pipeline: &str,
        stage: &str,
        source_file: Option<&str>,
        metadata: Option<&serde_json::Value>,
    ) -> MetaResult<RunGuard<'a>> {
        let run_id = Uuid::new_v4().to_string();
        let metadata_json = metadata.map(|m| m.to_string());

        meta.conn()
            .execute(
                "INSERT INTO silo_meta.pipeline_runs
                 (run_id, pipeline_name, pipeline_stage, source_file, status, metadata)
                 VALUES (?, ?, ?, ?, 'running', ?)",
                duckdb::params![run_id, pipeline, stage, source_file, metadata_json],
            )
            .populate_context("insert pipeline_runs")?;

        log::info!("Started run {run_id} - {pipeline}/{stage}");
        Ok(RunGuard {
            meta,
            run_id,
            armed: true,
        })
    }
}

/// Scope guard for one tracked run.
///
/// Exactly one terminal transition fires per guard, on every exit path.
pub struct RunGuard<'a> {
    meta: &'a MetaDb,
    run_id: String,
    armed: bool,
}

impl RunGuard<'_> {
    /// The run identifier, for correlating metrics and lineage.
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Close the run with a terminal status and final counters.
    pub fn complete(mut self, status: RunStatus, outcome: &StageOutcome) -> MetaResult<()> {
        if !status.is_terminal() {
            return Err(MetaError::RunStateError(format!(
                "run {} cannot transition back to '{status}'",
                self.run_id
            )));
        }
        self.armed = false;
        terminal_update(
            self.meta.conn(),
            &self.run_id,
            status,
            outcome,
            None,
            None,
        )?;
        log::info!("Run {} completed: {status}", self.run_id);
        Ok(())
    }

    /// Close the run as `failed` with an error message and optional detail.
    pub fn fail(mut self, error: &str, details: Option<&serde_json::Value>) -> MetaResult<()> {
        self.armed = false;
        terminal_update(
            self.meta.conn(),
            &self.run_id,
            RunStatus::Failed,
            &StageOutcome::default(),
            Some(error),
            details.map(|d| d.to_string()).as_deref(),
        )?;
        log::warn!("Run {} failed: {error}", self.run_id);
        Ok(())
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        // Abandoned scope (panic or early return without a terminal call).
        // Drop cannot propagate errors, so log and move on.
        let result = terminal_update(
            self.meta.conn(),
            &self.run_id,
            RunStatus::Failed,
            &StageOutcome::default(),
            Some("run scope dropped without a terminal status"),
            None,
        );
        if let Err(e) = result {
            log::error!("Failed to mark abandoned run {} as failed: {e}", self.run_id);
        } else {
            log::warn!("Run {} abandoned; marked failed", self.run_id);
        }
    }
}

/// Apply the single allowed transition `running -> terminal`.
///
/// Duration is computed in SQL as `completed_at - started_at`, and the
/// `WHERE status = 'running'` guard makes a second terminal write an error
/// instead of an overwrite.
fn terminal_update(
    conn: &Connection,
    run_id: &str,
    status: RunStatus,
    outcome: &StageOutcome,
    error_message: Option<&str>,
    error_details: Option<&str>,
) -> MetaResult<()> {
    let updated = conn
        .execute(
            "UPDATE silo_meta.pipeline_runs
             SET status = ?,
                 completed_at = now(),
                 execution_duration_seconds = date_diff('millisecond', started_at, now()) / 1000.0,
                 records_input = ?,
                 records_processed = ?,
                 records_loaded = ?,
                 records_rejected = ?,
                 error_message = ?,
                 error_details = ?
             WHERE run_id = ? AND status = 'running'",
            duckdb::params![
                status.as_str(),
                outcome.records_input,
                outcome.records_processed,
                outcome.records_loaded,
                outcome.records_rejected,
                error_message,
                error_details,
                run_id,
            ],
        )
        .populate_context("update pipeline_runs")?;

    if updated != 1 {
        return Err(MetaError::RunStateError(format!(
            "run {run_id} is not in 'running' state (already terminal or unknown)"
        )));
    }
    Ok(())
}

/// A pipeline run row, as read back for queries and tests.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub run_id: String,
    pub pipeline_name: String,
    pub pipeline_stage: String,
    pub source_file: Option<String>,
    pub status: RunStatus,
    pub records_input: Option<i64>,
    pub records_processed: Option<i64>,
    pub records_loaded: Option<i64>,
    pub records_rejected: Option<i64>,
    pub execution_duration_seconds: Option<f64>,
    pub error_message: Option<String>,
    pub completed_at: Option<String>,
}

/// Load a run by id.
pub fn load_run(conn: &Connection, run_id: &str) -> MetaResult<RunRecord> {
    conn.query_row(
        "SELECT run_id, pipeline_name, pipeline_stage, source_file, status,
                records_input, records_processed, records_loaded, records_rejected,
                execution_duration_seconds, error_message, CAST(completed_at AS VARCHAR)
         FROM silo_meta.pipeline_runs WHERE run_id = ?",
        duckdb::params![run_id],
        |row| {
            Ok(RunRecord {
                run_id: row.get(0)?,
                pipeline_name: row.get(1)?,
                pipeline_stage: row.get(2)?,
                source_file: row.get(3)?,
                status: RunStatus::parse(&row.get::<_, String>(4)?)
                    .unwrap_or(RunStatus::Failed),
                records_input: row.get(5)?,
                records_processed: row.get(6)?,
                records_loaded: row.get(7)?,
                records_rejected: row.get(8)?,
                execution_duration_seconds: row.get(9)?,
                error_message: row.get(10)?,
                completed_at: row.get(11)?,
            })
        },
    )
    .query_context("select pipeline_runs")
}

#[cfg(test)]
#[path = "tracker_test.rs"]
mod tests;
