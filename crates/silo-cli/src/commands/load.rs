//! Load cleaned CSV files into the warehouse as tracked runs.

use crate::cli::{GlobalArgs, LoadArgs};
use crate::commands::common;
use anyhow::{Context, Result};
use silo_core::{Config, Ruleset, RunStatus};
use silo_warehouse::{read_csv_rows, run_load_stages, FileBatch, Warehouse};
use std::path::{Path, PathBuf};

pub fn execute(args: &LoadArgs, global: &GlobalArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => {
            let path = Path::new(path);
            let config = Config::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            let root = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
            Some((config, root))
        }
        None => None,
    };

    let pipeline = args
        .pipeline
        .clone()
        .or_else(|| config.as_ref().map(|(c, _)| c.pipeline.clone()))
        .unwrap_or_else(|| "silo_etl".to_string());
    let force = args.force || config.as_ref().is_some_and(|(c, _)| c.force_reload);

    let db_path = config
        .as_ref()
        .map(|(c, root)| c.database_path(root))
        .unwrap_or_else(|| PathBuf::from(&global.db));
    let wh = Warehouse::open(&db_path)
        .with_context(|| format!("Failed to open Silo database at {}", db_path.display()))?;

    let ruleset = resolve_ruleset(args, &config)?;

    // One file's read or parse failure never blocks the rest of the batch.
    let mut batches = Vec::with_capacity(args.files.len());
    let mut unreadable: Vec<(PathBuf, String)> = Vec::new();
    for file in &args.files {
        let path = PathBuf::from(file);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                unreadable.push((path, format!("read failed: {e}")));
                continue;
            }
        };
        let (rows, shape) = match read_csv_rows(&wh, &path) {
            Ok(parsed) => parsed,
            Err(e) => {
                unreadable.push((path, format!("parse failed: {e}")));
                continue;
            }
        };
        println!("{}: {} rows, {} columns", path.display(), rows.len(), shape.columns.len());
        batches.push(FileBatch {
            path,
            bytes,
            shape: Some(shape),
            rows,
        });
    }

    let mut tally = run_load_stages(&wh, &pipeline, &batches, &ruleset, force);
    tally.failures.extend(unreadable);

    println!();
    let rows: Vec<Vec<String>> = tally
        .reports
        .iter()
        .map(|r| {
            let (loaded, rejected, skipped) = r
                .load
                .map(|l| (l.loaded, l.rejected, l.skipped))
                .unwrap_or((0, 0, 0));
            vec![
                r.run_id.chars().take(8).collect(),
                r.status.to_string(),
                r.change.to_string(),
                loaded.to_string(),
                rejected.to_string(),
                skipped.to_string(),
            ]
        })
        .collect();
    common::print_table(
        &["RUN", "STATUS", "SOURCE", "LOADED", "REJECTED", "SKIPPED"],
        &rows,
    );

    for (path, error) in &tally.failures {
        println!("[FAIL] {}: {error}", path.display());
    }

    let skipped = tally
        .reports
        .iter()
        .filter(|r| r.status == RunStatus::Skipped)
        .count();
    let failed = tally
        .reports
        .iter()
        .filter(|r| r.status == RunStatus::Failed)
        .count()
        + tally.failures.len();
    println!(
        "\n{} succeeded, {} skipped, {} failed of {} files",
        tally.succeeded(),
        skipped,
        failed,
        args.files.len()
    );

    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn resolve_ruleset(args: &LoadArgs, config: &Option<(Config, PathBuf)>) -> Result<Ruleset> {
    if let Some(ref rules_path) = args.rules {
        return Ruleset::load(Path::new(rules_path))
            .with_context(|| format!("Failed to load ruleset from {rules_path}"));
    }
    if let Some((c, root)) = config {
        let path = c.ruleset_path(root);
        if path.exists() {
            return Ruleset::load(&path)
                .with_context(|| format!("Failed to load ruleset from {}", path.display()));
        }
    }
    log::warn!("No ruleset configured; loading without quality validation");
    Ok(Ruleset::default())
}
