//! Per-pipeline health: success rates and average durations.

use crate::cli::GlobalArgs;
use crate::commands::common;
use anyhow::{Context, Result};

pub fn execute(global: &GlobalArgs) -> Result<()> {
    let wh = common::open_warehouse(global)?;
    let health = silo_meta::query::pipeline_health(wh.conn())
        .context("Failed to read pipeline health")?;

    if health.is_empty() {
        println!("No pipeline runs in the last 30 days.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = health
        .iter()
        .map(|h| {
            let indicator = if h.success_rate >= 95.0 {
                "[OK]"
            } else if h.success_rate >= 80.0 {
                "[WARN]"
            } else {
                "[FAIL]"
            };
            vec![
                h.pipeline_name.clone(),
                h.total_runs.to_string(),
                h.successful_runs.to_string(),
                h.failed_runs.to_string(),
                format!("{} {:.1}%", indicator, h.success_rate),
                h.avg_duration_seconds
                    .map(|d| format!("{d:.1}s"))
                    .unwrap_or_else(|| "-".to_string()),
                h.last_run_at.clone(),
            ]
        })
        .collect();

    common::print_table(
        &["PIPELINE", "RUNS", "SUCCESS", "FAILED", "SUCCESS RATE", "AVG DURATION", "LAST RUN"],
        &rows,
    );
    Ok(())
}
