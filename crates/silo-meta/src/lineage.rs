//! Field-level lineage: which source artifact produced which warehouse
//! column, via what transformation.
//!
//! Records are purely additive — no dedup, no update. Multiple records may
//! describe the same target column when several sources or years contribute.

use crate::error::{MetaError, MetaResult, MetaResultExt};
use duckdb::Connection;

/// How a target column was produced from its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformationKind {
    DirectCopy,
    Unpivot,
    Aggregate,
    Derived,
}

impl TransformationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformationKind::DirectCopy => "direct_copy",
            TransformationKind::Unpivot => "unpivot",
            TransformationKind::Aggregate => "aggregate",
            TransformationKind::Derived => "derived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "direct_copy" => Some(TransformationKind::DirectCopy),
            "unpivot" => Some(TransformationKind::Unpivot),
            "aggregate" => Some(TransformationKind::Aggregate),
            "derived" => Some(TransformationKind::Derived),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransformationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One lineage fact to record.
#[derive(Debug, Clone)]
pub struct LineageEntry {
    /// Target schema; defaults to `warehouse` when `None`.
    pub target_schema: Option<String>,
    pub target_table: String,
    pub target_column: String,
    pub source_file: String,
    pub source_sheet: Option<String>,
    pub source_column: Option<String>,
    /// Free-text description of the transformation; audit aid only.
    pub transformation_logic: Option<String>,
    pub kind: TransformationKind,
}

impl LineageEntry {
    /// A direct column-to-column copy from a source file.
    pub fn direct(
        target_table: &str,
        target_column: &str,
        source_file: &str,
        source_column: &str,
    ) -> Self {
        Self {
            target_schema: None,
            target_table: target_table.to_string(),
            target_column: target_column.to_string(),
            source_file: source_file.to_string(),
            source_sheet: None,
            source_column: Some(source_column.to_string()),
            transformation_logic: None,
            kind: TransformationKind::DirectCopy,
        }
    }
}

/// Append one lineage record for a run.
///
/// Missing target or source references are caller-visible errors, never
/// silently recorded.
pub fn record_lineage(conn: &Connection, run_id: &str, entry: &LineageEntry) -> MetaResult<()> {
    if entry.target_table.trim().is_empty() || entry.target_column.trim().is_empty() {
        return Err(MetaError::InvalidRecord(format!(
            "lineage entry needs a target table and column (got '{}'.'{}')",
            entry.target_table, entry.target_column
        )));
    }
    if entry.source_file.trim().is_empty() {
        return Err(MetaError::InvalidRecord(format!(
            "lineage entry for {}.{} needs a source file",
            entry.target_table, entry.target_column
        )));
    }

    conn.execute(
        "INSERT INTO silo_meta.field_lineage
         (run_id, target_schema, target_table, target_column, source_file,
          source_sheet, source_column, transformation_logic, transformation_type)
         VALUES (?, COALESCE(?, 'warehouse'), ?, ?, ?, ?, ?, ?, ?)",
        duckdb::params![
            run_id,
            entry.target_schema,
            entry.target_table,
            entry.target_column,
            entry.source_file,
            entry.source_sheet,
            entry.source_column,
            entry.transformation_logic,
            entry.kind.as_str(),
        ],
    )
    .populate_context("insert field_lineage")?;
    Ok(())
}

/// A lineage record as stored.
#[derive(Debug, Clone)]
pub struct LineageRecord {
    pub run_id: String,
    pub target_schema: String,
    pub target_table: String,
    pub target_column: String,
    pub source_file: String,
    pub source_sheet: Option<String>,
    pub source_column: Option<String>,
    pub transformation_logic: Option<String>,
    pub transformation_type: String,
    pub recorded_at: String,
}

/// Provenance of one warehouse column across all historical runs, most
/// recent first.
pub fn lineage_for(
    conn: &Connection,
    target_table: &str,
    target_column: &str,
) -> MetaResult<Vec<LineageRecord>> {
    let mut stmt = conn
        .prepare(
            "SELECT run_id, target_schema, target_table, target_column, source_file,
                    source_sheet, source_column, transformation_logic,
                    transformation_type, CAST(recorded_at AS VARCHAR)
             FROM silo_meta.field_lineage
             WHERE target_table = ? AND target_column = ?
             ORDER BY recorded_at DESC, lineage_id DESC",
        )
        .query_context("prepare lineage_for")?;
    let records = stmt
        .query_map(duckdb::params![target_table, target_column], |row| {
            Ok(LineageRecord {
                run_id: row.get(0)?,
                target_schema: row.get(1)?,
                target_table: row.get(2)?,
                target_column: row.get(3)?,
                source_file: row.get(4)?,
                source_sheet: row.get(5)?,
                source_column: row.get(6)?,
                transformation_logic: row.get(7)?,
                transformation_type: row.get(8)?,
                recorded_at: row.get(9)?,
            })
        })
        .query_context("query lineage_for")?
        .collect::<Result<Vec<_>, _>>()
        .query_context("collect lineage_for")?;
    Ok(records)
}

/// All lineage rows for a table (any column), grouped by target column.
pub fn lineage_for_table(conn: &Connection, target_table: &str) -> MetaResult<Vec<LineageRecord>> {
    let mut stmt = conn
        .prepare(
            "SELECT run_id, target_schema, target_table, target_column, source_file,
                    source_sheet, source_column, transformation_logic,
                    transformation_type, CAST(recorded_at AS VARCHAR)
             FROM silo_meta.field_lineage
             WHERE target_table = ?
             ORDER BY target_column, recorded_at DESC, lineage_id DESC",
        )
        .query_context("prepare lineage_for_table")?;
    let records = stmt
        .query_map(duckdb::params![target_table], |row| {
            Ok(LineageRecord {
                run_id: row.get(0)?,
                target_schema: row.get(1)?,
                target_table: row.get(2)?,
                target_column: row.get(3)?,
                source_file: row.get(4)?,
                source_sheet: row.get(5)?,
                source_column: row.get(6)?,
                transformation_logic: row.get(7)?,
                transformation_type: row.get(8)?,
                recorded_at: row.get(9)?,
            })
        })
        .query_context("query lineage_for_table")?
        .collect::<Result<Vec<_>, _>>()
        .query_context("collect lineage_for_table")?;
    Ok(records)
}

#[cfg(test)]
#[path = "lineage_test.rs"]
mod tests;
