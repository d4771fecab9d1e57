//! Quality check reporting: per-run score or recent failures.

use crate::cli::{GlobalArgs, QualityArgs};
use crate::commands::common;
use anyhow::{Context, Result};

pub fn execute(args: &QualityArgs, global: &GlobalArgs) -> Result<()> {
    let wh = common::open_warehouse(global)?;

    if let Some(ref run_id) = args.run_id {
        return show_run_quality(&wh, run_id);
    }
    show_failed_checks(&wh, args.limit)
}

fn show_run_quality(wh: &silo_warehouse::Warehouse, run_id: &str) -> Result<()> {
    let score = silo_meta::quality::quality_score(wh.conn(), run_id)
        .context("Failed to compute quality score")?;
    let categories = silo_meta::quality::quality_by_category(wh.conn(), run_id)
        .context("Failed to read category summary")?;

    if categories.is_empty() {
        println!("No quality checks recorded for run {run_id}.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = categories
        .iter()
        .map(|c| {
            let pct = if c.total_checks > 0 {
                100.0 * c.passed_checks as f64 / c.total_checks as f64
            } else {
                0.0
            };
            vec![
                c.category.clone(),
                c.total_checks.to_string(),
                c.passed_checks.to_string(),
                format!("{pct:.1}%"),
            ]
        })
        .collect();

    common::print_table(&["CATEGORY", "CHECKS", "PASSED", "PASS RATE"], &rows);
    println!("\nOverall quality score: {score:.2}/100");
    Ok(())
}

fn show_failed_checks(wh: &silo_warehouse::Warehouse, limit: usize) -> Result<()> {
    let failed = silo_meta::quality::failed_checks(wh.conn(), limit)
        .context("Failed to read failed checks")?;

    if failed.is_empty() {
        println!("No failed quality checks.");
        return Ok(());
    }

    for check in &failed {
        println!("[FAIL] {} ({})", check.check_name, check.check_category);
        if let Some(ref table) = check.table_name {
            match &check.column_name {
                Some(column) => println!("   Target: {table}.{column}"),
                None => println!("   Target: {table}"),
            }
        }
        if let (Some(metric), Some(threshold)) = (check.metric_value, check.threshold_value) {
            println!("   Metric: {metric} (threshold: {threshold})");
        }
        if let Some(failures) = check.failure_count {
            println!("   Failing rows: {failures}");
        }
        if let Some(ref source) = check.source_file {
            println!("   Source: {source}");
        }
        println!("   Pipeline: {}", check.pipeline_name);
        println!("   Time: {}", check.checked_at);
        println!();
    }
    Ok(())
}
