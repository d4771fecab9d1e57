//! Registered source files listing.

use crate::cli::GlobalArgs;
use crate::commands::common;
use anyhow::{Context, Result};

pub fn execute(global: &GlobalArgs) -> Result<()> {
    let wh = common::open_warehouse(global)?;
    let files = silo_meta::source_files::list_source_files(wh.conn())
        .context("Failed to list source files")?;

    if files.is_empty() {
        println!("No source files registered.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = files
        .iter()
        .map(|f| {
            vec![
                f.file_name.clone(),
                f.status.clone(),
                f.processing_count.to_string(),
                f.file_size_bytes
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                common::fmt_count(f.row_count),
                f.file_hash.chars().take(12).collect(),
            ]
        })
        .collect();

    common::print_table(
        &["FILE", "STATUS", "PROCESSED", "BYTES", "ROWS", "FINGERPRINT"],
        &rows,
    );
    println!("\n({} files)", files.len());
    Ok(())
}
