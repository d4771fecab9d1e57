//! CSV ingestion: read a cleaned source file into rows via DuckDB.
//!
//! Spreadsheet parsing and unpivoting happen upstream; this reads the
//! already-tabular output (`read_csv_auto`) and captures the file's shape
//! for structural fingerprinting.

use crate::error::{WarehouseError, WarehouseResult};
use crate::schema::Warehouse;
use silo_core::row::{FieldValue, Row};
use silo_meta::source_files::SourceShape;
use std::path::Path;

/// Read a CSV file into named-field rows plus its tabular shape.
pub fn read_csv_rows(wh: &Warehouse, path: &Path) -> WarehouseResult<(Vec<Row>, SourceShape)> {
    let escaped = path.display().to_string().replace('\'', "''");

    // Column names and types first, for the structural fingerprint.
    let columns = describe_csv(wh, &escaped)?;

    let sql = format!("SELECT * FROM read_csv_auto('{escaped}')");
    let mut stmt = wh
        .conn()
        .prepare(&sql)
        .map_err(|e| WarehouseError::QueryError(format!("read {}: {e}", path.display())))?;

    let names: Vec<String> = columns.iter().map(|(n, _)| n.clone()).collect();
    let rows: Vec<Row> = stmt
        .query_map([], |db_row| {
            let mut row = Row::new();
            for (i, name) in names.iter().enumerate() {
                row.push(name.clone(), read_field(db_row, i));
            }
            Ok(row)
        })
        .map_err(|e| WarehouseError::QueryError(format!("read {}: {e}", path.display())))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| WarehouseError::QueryError(format!("read {}: {e}", path.display())))?;

    let shape = SourceShape {
        sheet_count: None,
        row_count: Some(rows.len() as i64),
        column_count: Some(columns.len() as i32),
        columns,
    };
    Ok((rows, shape))
}

/// `DESCRIBE` the CSV to get ordered `(name, type)` pairs.
fn describe_csv(wh: &Warehouse, escaped_path: &str) -> WarehouseResult<Vec<(String, String)>> {
    let sql = format!("DESCRIBE SELECT * FROM read_csv_auto('{escaped_path}')");
    let mut stmt = wh
        .conn()
        .prepare(&sql)
        .map_err(|e| WarehouseError::QueryError(format!("describe csv: {e}")))?;
    let columns = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })
        .map_err(|e| WarehouseError::QueryError(format!("describe csv: {e}")))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| WarehouseError::QueryError(format!("describe csv: {e}")))?;
    Ok(columns)
}

/// Read one cell, trying String -> i64 -> f64 -> bool before giving up.
fn read_field(row: &duckdb::Row<'_>, idx: usize) -> FieldValue {
    if let Ok(Some(s)) = row.get::<_, Option<String>>(idx) {
        return FieldValue::Text(s);
    }
    if let Ok(Some(n)) = row.get::<_, Option<i64>>(idx) {
        return FieldValue::Number(n as f64);
    }
    if let Ok(Some(f)) = row.get::<_, Option<f64>>(idx) {
        return FieldValue::Number(f);
    }
    if let Ok(Some(b)) = row.get::<_, Option<bool>>(idx) {
        return FieldValue::Bool(b);
    }
    FieldValue::Null
}

#[cfg(test)]
#[path = "ingest_test.rs"]
mod tests;
