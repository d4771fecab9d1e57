//! Field lineage lookup for a warehouse table or column.

use crate::cli::{GlobalArgs, LineageArgs};
use crate::commands::common;
use anyhow::{Context, Result};
use silo_meta::lineage::LineageRecord;

pub fn execute(args: &LineageArgs, global: &GlobalArgs) -> Result<()> {
    let wh = common::open_warehouse(global)?;

    let records = match &args.column {
        Some(column) => silo_meta::lineage::lineage_for(wh.conn(), &args.table, column)
            .context("Failed to read lineage")?,
        None => silo_meta::lineage::lineage_for_table(wh.conn(), &args.table)
            .context("Failed to read lineage")?,
    };

    if records.is_empty() {
        println!("No lineage information found.");
        return Ok(());
    }

    match &args.column {
        Some(column) => println!("Lineage: {}.{column}\n", args.table),
        None => println!("Lineage: {} (all columns)\n", args.table),
    }

    let mut current_column: Option<&str> = None;
    for record in &records {
        if args.column.is_none() && current_column != Some(record.target_column.as_str()) {
            current_column = Some(record.target_column.as_str());
            println!("Column: {}", record.target_column);
        }
        print_record(record);
    }
    Ok(())
}

fn print_record(record: &LineageRecord) {
    match &record.source_column {
        Some(source_column) => {
            println!("  Source: {} -> {}", record.source_file, source_column)
        }
        None => println!("  Source: {}", record.source_file),
    }
    if let Some(ref sheet) = record.source_sheet {
        println!("  Sheet: {sheet}");
    }
    println!("  Type: {}", record.transformation_type);
    if let Some(ref logic) = record.transformation_logic {
        println!("  Logic: {logic}");
    }
    println!("  Run: {} at {}", record.run_id, record.recorded_at);
    println!();
}
