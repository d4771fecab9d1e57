//! Load a YAML ruleset into the quality_rules table.

use crate::cli::{GlobalArgs, RulesArgs};
use crate::commands::common;
use anyhow::{Context, Result};
use silo_core::rules::Ruleset;
use std::path::Path;

pub fn execute(args: &RulesArgs, global: &GlobalArgs) -> Result<()> {
    let ruleset = Ruleset::load(Path::new(&args.file))
        .with_context(|| format!("Failed to load ruleset from {}", args.file))?;

    let wh = common::open_warehouse(global)?;
    let written = silo_meta::quality::store_rules(wh.conn(), &ruleset)
        .context("Failed to store rules")?;

    println!("Stored {written} rules from {}", args.file);
    for rule in &ruleset.rules {
        let state = if rule.is_active { "" } else { " (inactive)" };
        println!(
            "  {} [{} / {}]{state}",
            rule.name, rule.category, rule.severity
        );
    }
    Ok(())
}
