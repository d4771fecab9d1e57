//! Create or migrate the metadata and warehouse schemas.

use crate::cli::{GlobalArgs, InitArgs};
use crate::commands::common;
use anyhow::{Context, Result};

pub fn execute(args: &InitArgs, global: &GlobalArgs) -> Result<()> {
    let wh = common::open_warehouse(global)?;
    println!("Database ready at {}", global.db);

    if args.show_tables {
        let tables = silo_meta::query::list_tables(wh.conn())
            .context("Failed to list metadata tables")?;
        println!("\nMetadata tables ({}):", tables.len());
        for table in &tables {
            let count = silo_meta::query::table_row_count(wh.conn(), table).unwrap_or(0);
            println!("  {:<30} {:>6} rows", table, count);
        }

        println!("\nWarehouse tables:");
        for table in ["dim_indicator", "dim_period", "dim_location", "fact_measurement"] {
            let count = wh.table_count(table).unwrap_or(0);
            println!("  {:<30} {:>6} rows", table, count);
        }
    }

    Ok(())
}
