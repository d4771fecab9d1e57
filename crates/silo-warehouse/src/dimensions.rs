//! Dimension upserts: natural key to surrogate key resolution.
//!
//! Lookup-or-insert per natural key. On a hit the surrogate key is reused
//! and descriptive attributes refreshed; on a miss a new row is inserted.
//! Surrogate keys are therefore stable across reruns. Race-safety relies
//! on the engine's single-writer model.

use crate::error::{WarehouseError, WarehouseResult};
use duckdb::Connection;

/// Normalize a natural key: lowercase, whitespace to `_`, capped at 255.
pub fn normalize_key(raw: &str) -> String {
    let mut key: String = raw
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    key.truncate(255);
    key
}

/// Parsed period label, e.g. `2016/17` or `2018`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodParts {
    pub year: Option<i32>,
    /// ISO date for the period start; fiscal labels anchor to July 1.
    pub period_start: Option<String>,
}

/// Parse a period label into a year and canonical start date.
///
/// `2016/17` parses as fiscal year 2016 starting 2016-07-01; a plain year
/// like `2018` starts 2018-01-01. Unparseable labels keep both fields
/// `None`; the label itself remains the natural key.
pub fn parse_period_label(label: &str) -> PeriodParts {
    let trimmed = label.trim();
    if let Some((first, _)) = trimmed.split_once('/') {
        if let Ok(year) = first.trim().parse::<i32>() {
            return PeriodParts {
                year: Some(year),
                period_start: Some(format!("{year}-07-01")),
            };
        }
    } else if let Ok(year) = trimmed.parse::<i32>() {
        return PeriodParts {
            year: Some(year),
            period_start: Some(format!("{year}-01-01")),
        };
    }
    PeriodParts {
        year: None,
        period_start: None,
    }
}

/// Resolve an indicator name to its surrogate key, inserting on first use
/// and refreshing the display name on later ones.
pub fn resolve_indicator(conn: &Connection, indicator_name: &str) -> WarehouseResult<i64> {
    let name = indicator_name.trim();
    if name.is_empty() {
        return Err(WarehouseError::DimensionError(
            "indicator name is empty".to_string(),
        ));
    }
    let key = normalize_key(name);

    if let Some(id) = lookup(
        conn,
        "SELECT indicator_id FROM warehouse.dim_indicator WHERE indicator_key = ?",
        &key,
    )? {
        conn.execute(
            "UPDATE warehouse.dim_indicator SET indicator_name = ? WHERE indicator_id = ?",
            duckdb::params![name, id],
        )
        .map_err(|e| WarehouseError::DimensionError(format!("refresh dim_indicator: {e}")))?;
        return Ok(id);
    }

    conn.execute(
        "INSERT INTO warehouse.dim_indicator (indicator_key, indicator_name) VALUES (?, ?)",
        duckdb::params![key, name],
    )
    .map_err(|e| WarehouseError::DimensionError(format!("insert dim_indicator: {e}")))?;

    lookup(
        conn,
        "SELECT indicator_id FROM warehouse.dim_indicator WHERE indicator_key = ?",
        &key,
    )?
    .ok_or_else(|| {
        WarehouseError::DimensionError(format!("dim_indicator row vanished for key '{key}'"))
    })
}

/// Resolve a period label to its surrogate key.
pub fn resolve_period(conn: &Connection, period_label: &str) -> WarehouseResult<i64> {
    let label = period_label.trim();
    if label.is_empty() {
        return Err(WarehouseError::DimensionError(
            "period label is empty".to_string(),
        ));
    }

    if let Some(id) = lookup(
        conn,
        "SELECT period_id FROM warehouse.dim_period WHERE period_label = ?",
        label,
    )? {
        return Ok(id);
    }

    let parts = parse_period_label(label);
    conn.execute(
        "INSERT INTO warehouse.dim_period (period_label, year, period_start) VALUES (?, ?, CAST(? AS DATE))",
        duckdb::params![label, parts.year, parts.period_start],
    )
    .map_err(|e| WarehouseError::DimensionError(format!("insert dim_period: {e}")))?;

    lookup(
        conn,
        "SELECT period_id FROM warehouse.dim_period WHERE period_label = ?",
        label,
    )?
    .ok_or_else(|| {
        WarehouseError::DimensionError(format!("dim_period row vanished for label '{label}'"))
    })
}

/// Resolve a location name to its surrogate key.
pub fn resolve_location(conn: &Connection, location_name: &str) -> WarehouseResult<i64> {
    let name = location_name.trim();
    if name.is_empty() {
        return Err(WarehouseError::DimensionError(
            "location name is empty".to_string(),
        ));
    }
    let key = normalize_key(name);

    if let Some(id) = lookup(
        conn,
        "SELECT location_id FROM warehouse.dim_location WHERE location_key = ?",
        &key,
    )? {
        conn.execute(
            "UPDATE warehouse.dim_location SET location_name = ? WHERE location_id = ?",
            duckdb::params![name, id],
        )
        .map_err(|e| WarehouseError::DimensionError(format!("refresh dim_location: {e}")))?;
        return Ok(id);
    }

    conn.execute(
        "INSERT INTO warehouse.dim_location (location_key, location_name) VALUES (?, ?)",
        duckdb::params![key, name],
    )
    .map_err(|e| WarehouseError::DimensionError(format!("insert dim_location: {e}")))?;

    lookup(
        conn,
        "SELECT location_id FROM warehouse.dim_location WHERE location_key = ?",
        &key,
    )?
    .ok_or_else(|| {
        WarehouseError::DimensionError(format!("dim_location row vanished for key '{key}'"))
    })
}

fn lookup(conn: &Connection, sql: &str, key: &str) -> WarehouseResult<Option<i64>> {
    match conn.query_row(sql, duckdb::params![key], |row| row.get(0)) {
        Ok(id) => Ok(Some(id)),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(WarehouseError::DimensionError(format!(
            "dimension lookup failed: {e}"
        ))),
    }
}

#[cfg(test)]
#[path = "dimensions_test.rs"]
mod tests;
