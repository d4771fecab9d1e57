//! Source-file fingerprint registry.
//!
//! Tracks every input artifact by content hash so a stage driver can tell
//! whether a file is new, unchanged, or modified since last processing.
//! `processing_count` is bumped only by [`mark_processed`], i.e. after the
//! run that consumed the file succeeded.

use crate::connection::MetaDb;
use crate::error::{MetaError, MetaResult, MetaResultExt};
use duckdb::Connection;
use silo_core::checksum::{compute_checksum, structural_fingerprint};
use std::path::Path;

/// Whether a registered file changed since last processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeState {
    /// Never seen before.
    New,
    /// Content hash matches the stored one.
    Unchanged,
    /// Content hash differs from the stored one.
    Changed,
}

impl std::fmt::Display for ChangeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeState::New => write!(f, "new"),
            ChangeState::Unchanged => write!(f, "unchanged"),
            ChangeState::Changed => write!(f, "changed"),
        }
    }
}

/// Tabular shape of a source file, supplied by the parsing stage.
#[derive(Debug, Clone, Default)]
pub struct SourceShape {
    pub sheet_count: Option<i32>,
    pub row_count: Option<i64>,
    pub column_count: Option<i32>,
    /// Ordered `(name, type)` pairs; hashed into the structural fingerprint.
    pub columns: Vec<(String, String)>,
}

impl SourceShape {
    fn fingerprint(&self) -> Option<String> {
        if self.columns.is_empty() {
            None
        } else {
            Some(structural_fingerprint(&self.columns))
        }
    }
}

/// One tracked source file, as stored.
#[derive(Debug, Clone)]
pub struct SourceFileRecord {
    pub file_id: i64,
    pub file_path: String,
    pub file_name: String,
    pub file_hash: String,
    pub file_size_bytes: Option<i64>,
    pub sheet_count: Option<i32>,
    pub row_count: Option<i64>,
    pub column_count: Option<i32>,
    pub processing_count: i32,
    pub schema_fingerprint: Option<String>,
    pub status: String,
}

/// Outcome of [`register`].
#[derive(Debug)]
pub struct Registration {
    pub record: SourceFileRecord,
    pub change: ChangeState,
    /// Set when the content changed and the structural fingerprint did too:
    /// a schema-drift signal the caller should record as a warning-grade
    /// quality check, never an error.
    pub schema_drift: bool,
}

/// Register a source file's current content, returning its record and
/// change state.
///
/// One row per distinct path, upserted:
/// - absent -> insert with status `new`, `processing_count` 0
/// - present, same hash -> untouched
/// - present, different hash -> hash/shape updated, status reset to `new`
pub fn register(
    meta: &MetaDb,
    path: &Path,
    bytes: &[u8],
    shape: Option<&SourceShape>,
) -> MetaResult<Registration> {
    let conn = meta.conn();
    let file_path = path.display().to_string();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| file_path.clone());
    let hash = compute_checksum(bytes);
    let size = bytes.len() as i64;
    let new_fingerprint = shape.and_then(SourceShape::fingerprint);

    let existing: Option<(i64, String, Option<String>)> = match conn.query_row(
        "SELECT file_id, file_hash, schema_fingerprint
         FROM silo_meta.source_files WHERE file_path = ?",
        duckdb::params![file_path],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    ) {
        Ok(found) => Some(found),
        Err(duckdb::Error::QueryReturnedNoRows) => None,
        Err(e) => return Err(MetaError::QueryError(format!("select source_files: {e}"))),
    };

    let (change, schema_drift) = match existing {
        None => {
            conn.execute(
                "INSERT INTO silo_meta.source_files
                 (file_path, file_name, file_hash, file_size_bytes,
                  sheet_count, row_count, column_count, schema_fingerprint, status)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'new')",
                duckdb::params![
                    file_path,
                    file_name,
                    hash,
                    size,
                    shape.and_then(|s| s.sheet_count),
                    shape.and_then(|s| s.row_count),
                    shape.and_then(|s| s.column_count),
                    new_fingerprint,
                ],
            )
            .populate_context("insert source_files")?;
            log::info!("Registered new source file: {file_name}");
            (ChangeState::New, false)
        }
        Some((_, ref stored_hash, _)) if *stored_hash == hash => {
            log::debug!("Source file unchanged: {file_name}");
            (ChangeState::Unchanged, false)
        }
        Some((file_id, _, ref stored_fingerprint)) => {
            let drift = match (stored_fingerprint, &new_fingerprint) {
                (Some(old), Some(new)) => old != new,
                _ => false,
            };
            conn.execute(
                "UPDATE silo_meta.source_files
                 SET file_hash = ?,
                     file_size_bytes = ?,
                     sheet_count = COALESCE(?, sheet_count),
                     row_count = COALESCE(?, row_count),
                     column_count = COALESCE(?, column_count),
                     schema_fingerprint = COALESCE(?, schema_fingerprint),
                     status = 'new'
                 WHERE file_id = ?",
                duckdb::params![
                    hash,
                    size,
                    shape.and_then(|s| s.sheet_count),
                    shape.and_then(|s| s.row_count),
                    shape.and_then(|s| s.column_count),
                    new_fingerprint,
                    file_id,
                ],
            )
            .populate_context("update source_files")?;
            log::info!("Source file changed: {file_name}");
            (ChangeState::Changed, drift)
        }
    };

    let record = get_source_file(conn, &file_path)?.ok_or_else(|| {
        MetaError::QueryError(format!("source file disappeared after upsert: {file_path}"))
    })?;

    Ok(Registration {
        record,
        change,
        schema_drift,
    })
}

/// Mark a file as successfully processed: bump `processing_count`, stamp
/// `last_processed`, and set status `processed`.
pub fn mark_processed(meta: &MetaDb, path: &Path) -> MetaResult<()> {
    let updated = meta
        .conn()
        .execute(
            "UPDATE silo_meta.source_files
             SET last_processed = now(),
                 processing_count = processing_count + 1,
                 status = 'processed'
             WHERE file_path = ?",
            duckdb::params![path.display().to_string()],
        )
        .populate_context("update source_files (processed)")?;
    if updated != 1 {
        return Err(MetaError::InvalidRecord(format!(
            "cannot mark unregistered file as processed: {}",
            path.display()
        )));
    }
    Ok(())
}

/// Mark a file's most recent processing attempt as failed.
pub fn mark_failed(meta: &MetaDb, path: &Path) -> MetaResult<()> {
    let updated = meta
        .conn()
        .execute(
            "UPDATE silo_meta.source_files SET status = 'failed' WHERE file_path = ?",
            duckdb::params![path.display().to_string()],
        )
        .populate_context("update source_files (failed)")?;
    if updated != 1 {
        return Err(MetaError::InvalidRecord(format!(
            "cannot mark unregistered file as failed: {}",
            path.display()
        )));
    }
    Ok(())
}

/// Look up a source file by path.
pub fn get_source_file(conn: &Connection, file_path: &str) -> MetaResult<Option<SourceFileRecord>> {
    match conn.query_row(
        "SELECT file_id, file_path, file_name, file_hash, file_size_bytes,
                sheet_count, row_count, column_count, processing_count,
                schema_fingerprint, status
         FROM silo_meta.source_files WHERE file_path = ?",
        duckdb::params![file_path],
        map_source_file,
    ) {
        Ok(record) => Ok(Some(record)),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(MetaError::QueryError(format!("select source_files: {e}"))),
    }
}

/// All registered source files, most recently processed first.
pub fn list_source_files(conn: &Connection) -> MetaResult<Vec<SourceFileRecord>> {
    let mut stmt = conn
        .prepare(
            "SELECT file_id, file_path, file_name, file_hash, file_size_bytes,
                    sheet_count, row_count, column_count, processing_count,
                    schema_fingerprint, status
             FROM silo_meta.source_files
             ORDER BY last_processed DESC NULLS LAST, file_id",
        )
        .query_context("prepare list source_files")?;
    let records = stmt
        .query_map([], map_source_file)
        .query_context("query source_files")?
        .collect::<Result<Vec<_>, _>>()
        .query_context("collect source_files")?;
    Ok(records)
}

fn map_source_file(row: &duckdb::Row<'_>) -> Result<SourceFileRecord, duckdb::Error> {
    Ok(SourceFileRecord {
        file_id: row.get(0)?,
        file_path: row.get(1)?,
        file_name: row.get(2)?,
        file_hash: row.get(3)?,
        file_size_bytes: row.get(4)?,
        sheet_count: row.get(5)?,
        row_count: row.get(6)?,
        column_count: row.get(7)?,
        processing_count: row.get(8)?,
        schema_fingerprint: row.get(9)?,
        status: row.get(10)?,
    })
}

#[cfg(test)]
#[path = "source_files_test.rs"]
mod tests;
