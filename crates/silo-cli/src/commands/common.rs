//! Shared helpers for CLI commands.

use crate::cli::GlobalArgs;
use anyhow::{Context, Result};
use silo_warehouse::Warehouse;
use std::path::Path;

/// Open the Silo database named by the global `--db` argument.
pub(crate) fn open_warehouse(global: &GlobalArgs) -> Result<Warehouse> {
    Warehouse::open(Path::new(&global.db))
        .with_context(|| format!("Failed to open Silo database at {}", global.db))
}

/// Calculate the display width of each column from headers and rows.
fn calculate_column_widths(headers: &[&str], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() && cell.len() > widths[i] {
                widths[i] = cell.len();
            }
        }
    }
    widths
}

/// Print a formatted table to stdout.
///
/// Left-aligned header row, a separator line of dashes, then each data
/// row; columns separated by two spaces.
pub(crate) fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let widths = calculate_column_widths(headers, rows);

    let header_parts: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(h, &w)| format!("{:<width$}", h, width = w))
        .collect();
    println!("{}", header_parts.join("  "));

    let sep_parts: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep_parts.join("  "));

    for row in rows {
        let row_parts: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{:<width$}", cell, width = w))
            .collect();
        println!("{}", row_parts.join("  "));
    }
}

/// Format an optional count for table display.
pub(crate) fn fmt_count(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}
