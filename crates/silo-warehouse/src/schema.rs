//! Warehouse connection wrapper and schema migrations.
//!
//! [`Warehouse`] shares one DuckDB file with the metadata store: opening it
//! runs both the `silo_meta` and `warehouse` migrations, so stage drivers
//! work against a single connection.

use crate::ddl::MIGRATIONS;
use crate::error::{WarehouseError, WarehouseResult};
use duckdb::Connection;
use silo_meta::MetaDb;
use silo_quality::{QualityError, QualityResult, ReferenceResolver};
use std::collections::HashSet;
use std::path::Path;

/// The warehouse plus its co-located metadata store.
pub struct Warehouse {
    meta: MetaDb,
}

impl Warehouse {
    /// Open (or create) the database at `path`, applying metadata and
    /// warehouse migrations.
    pub fn open(path: &Path) -> WarehouseResult<Self> {
        let meta = MetaDb::open(path)?;
        run_migrations(meta.conn())?;
        Ok(Self { meta })
    }

    /// In-memory warehouse with all migrations applied, for tests.
    pub fn open_memory() -> WarehouseResult<Self> {
        let meta = MetaDb::open_memory()?;
        run_migrations(meta.conn())?;
        Ok(Self { meta })
    }

    /// The co-located metadata store.
    pub fn meta(&self) -> &MetaDb {
        &self.meta
    }

    /// Borrow the shared DuckDB connection.
    pub fn conn(&self) -> &Connection {
        self.meta.conn()
    }

    /// Execute `body` within a `BEGIN` / `COMMIT` transaction, rolling back
    /// on error. Spans both schemas since they share the connection.
    pub fn transaction<F, T>(&self, body: F) -> WarehouseResult<T>
    where
        F: FnOnce(&Connection) -> WarehouseResult<T>,
    {
        self.conn()
            .execute_batch("BEGIN TRANSACTION")
            .map_err(|e| WarehouseError::QueryError(format!("BEGIN failed: {e}")))?;

        let result = body(self.conn());

        match &result {
            Ok(_) => {
                if let Err(commit_err) = self.conn().execute_batch("COMMIT") {
                    let _ = self.conn().execute_batch("ROLLBACK");
                    return Err(WarehouseError::QueryError(format!(
                        "COMMIT failed: {commit_err}"
                    )));
                }
            }
            Err(_) => {
                let _ = self.conn().execute_batch("ROLLBACK");
            }
        }
        result
    }

    /// Row count of a warehouse table.
    pub fn table_count(&self, table: &str) -> WarehouseResult<i64> {
        validate_identifier(table)?;
        let count: i64 = self
            .conn()
            .query_row(&format!("SELECT COUNT(*) FROM warehouse.{table}"), [], |r| {
                r.get(0)
            })
            .map_err(|e| WarehouseError::QueryError(format!("count {table}: {e}")))?;
        Ok(count)
    }
}

/// Dimension tables double as reference sets for custom quality rules:
/// `resolve_keys("dim_indicator", "indicator_name")` returns every known
/// indicator name.
impl ReferenceResolver for Warehouse {
    fn resolve_keys(&self, table: &str, column: &str) -> QualityResult<HashSet<String>> {
        let reference_error = |reason: String| QualityError::Reference {
            table: table.to_string(),
            column: column.to_string(),
            reason,
        };

        validate_identifier(table).map_err(|e| reference_error(e.to_string()))?;
        validate_identifier(column).map_err(|e| reference_error(e.to_string()))?;

        let mut stmt = self
            .conn()
            .prepare(&format!(
                "SELECT DISTINCT CAST({column} AS VARCHAR) FROM warehouse.{table} WHERE {column} IS NOT NULL"
            ))
            .map_err(|e| reference_error(e.to_string()))?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| reference_error(e.to_string()))?
            .collect::<Result<HashSet<_>, _>>()
            .map_err(|e| reference_error(e.to_string()))?;
        Ok(keys)
    }
}

fn validate_identifier(name: &str) -> WarehouseResult<()> {
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(WarehouseError::QueryError(format!(
            "invalid identifier '{name}': must contain only alphanumeric characters and underscores"
        )));
    }
    Ok(())
}

/// Ensure the `warehouse` schema and `schema_version` table exist.
fn ensure_version_table(conn: &Connection) -> WarehouseResult<()> {
    conn.execute_batch(
        "CREATE SCHEMA IF NOT EXISTS warehouse;
         CREATE TABLE IF NOT EXISTS warehouse.schema_version (
             version    INTEGER NOT NULL,
             applied_at TIMESTAMP NOT NULL DEFAULT now()
         );",
    )
    .map_err(|e| {
        WarehouseError::MigrationError(format!("failed to create schema_version table: {e}"))
    })?;
    Ok(())
}

/// Run all unapplied warehouse migrations against `conn`.
pub fn run_migrations(conn: &Connection) -> WarehouseResult<()> {
    ensure_version_table(conn)?;
    let current: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM warehouse.schema_version",
            [],
            |row| row.get(0),
        )
        .map_err(|e| WarehouseError::MigrationError(format!("failed to read schema version: {e}")))?;

    for migration in MIGRATIONS {
        if migration.version <= current {
            continue;
        }
        log::debug!("Applying warehouse migration v{:03}", migration.version);

        conn.execute_batch(migration.sql).map_err(|e| {
            WarehouseError::MigrationError(format!(
                "migration v{:03} failed: {e}",
                migration.version
            ))
        })?;

        conn.execute(
            "INSERT INTO warehouse.schema_version (version) VALUES (?)",
            duckdb::params![migration.version],
        )
        .map_err(|e| {
            WarehouseError::MigrationError(format!(
                "failed to record migration v{:03}: {e}",
                migration.version
            ))
        })?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "schema_test.rs"]
mod tests;
