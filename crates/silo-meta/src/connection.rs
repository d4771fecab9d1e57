//! Metadata database connection wrapper.
//!
//! [`MetaDb`] owns a DuckDB [`Connection`] and provides helpers for opening,
//! migrating, and transacting against the metadata database.

use crate::error::{MetaError, MetaResult};
use crate::migration::run_migrations;
use duckdb::Connection;
use std::path::Path;

/// Wrapper around a DuckDB connection holding the `silo_meta` schema.
///
/// Single-threaded — no `Mutex` needed because the engine is single-writer:
/// one pipeline execution drives stages sequentially.
pub struct MetaDb {
    conn: Connection,
}

impl MetaDb {
    /// Open (or create) the metadata database at `path` and run pending
    /// migrations.
    pub fn open(path: &Path) -> MetaResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| MetaError::ConnectionError(format!("{e}: {}", path.display())))?;
        run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Create an in-memory metadata database with all migrations applied.
    ///
    /// Useful for unit tests that don't need persistence.
    pub fn open_memory() -> MetaResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| MetaError::ConnectionError(e.to_string()))?;
        run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Wrap an already-open connection, running pending migrations.
    ///
    /// Lets the warehouse share one database file with the metadata store
    /// so a batch load and its run record commit in the same transaction.
    pub fn from_connection(conn: Connection) -> MetaResult<Self> {
        run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Borrow the underlying DuckDB connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Execute `body` within a `BEGIN` / `COMMIT` transaction, rolling back
    /// on error.
    pub fn transaction<F, T>(&self, body: F) -> MetaResult<T>
    where
        F: FnOnce(&Connection) -> MetaResult<T>,
    {
        self.conn
            .execute_batch("BEGIN TRANSACTION")
            .map_err(|e| MetaError::TransactionError(format!("BEGIN failed: {e}")))?;

        let result = body(&self.conn);

        match &result {
            Ok(_) => {
                if let Err(commit_err) = self.conn.execute_batch("COMMIT") {
                    let _ = self.conn.execute_batch("ROLLBACK");
                    return Err(MetaError::TransactionError(format!(
                        "COMMIT failed: {commit_err}"
                    )));
                }
            }
            Err(_) => {
                let _ = self.conn.execute_batch("ROLLBACK");
            }
        }
        result
    }

    /// Delete a run and the quality metrics and lineage records it owns.
    ///
    /// Children first, so a failure partway through never orphans metrics
    /// or lineage against a missing run.
    pub fn purge_run(&self, run_id: &str) -> MetaResult<()> {
        let stmts = [
            "DELETE FROM silo_meta.data_quality_metrics WHERE run_id = ?",
            "DELETE FROM silo_meta.field_lineage WHERE run_id = ?",
            "DELETE FROM silo_meta.pipeline_runs WHERE run_id = ?",
        ];
        for stmt in &stmts {
            self.conn
                .execute(stmt, duckdb::params![run_id])
                .map_err(|e| MetaError::QueryError(format!("purge_run failed: {e}")))?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "connection_test.rs"]
mod tests;
