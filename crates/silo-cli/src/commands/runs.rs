//! Recent pipeline runs listing.

use crate::cli::{GlobalArgs, RunsArgs};
use crate::commands::common;
use anyhow::{Context, Result};

pub fn execute(args: &RunsArgs, global: &GlobalArgs) -> Result<()> {
    let wh = common::open_warehouse(global)?;
    let runs = silo_meta::query::recent_runs(wh.conn(), args.limit)
        .context("Failed to read recent runs")?;

    if runs.is_empty() {
        println!("No pipeline runs found.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = runs
        .iter()
        .map(|r| {
            vec![
                r.run_id.chars().take(8).collect(),
                format!("{}/{}", r.pipeline_name, r.pipeline_stage),
                r.status.clone(),
                r.started_at.clone(),
                format!("{:.1}s", r.duration_seconds),
                common::fmt_count(r.records_processed),
                common::fmt_count(r.records_loaded),
                common::fmt_count(r.records_rejected),
            ]
        })
        .collect();

    common::print_table(
        &["RUN", "PIPELINE", "STATUS", "STARTED", "DURATION", "PROCESSED", "LOADED", "REJECTED"],
        &rows,
    );
    println!("\n({} runs)", runs.len());

    for run in runs.iter().filter(|r| r.status == "failed") {
        if let Some(ref message) = run.error_message {
            println!("  {}: {}", run.run_id.chars().take(8).collect::<String>(), message);
        }
    }
    Ok(())
}
