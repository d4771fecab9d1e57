//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand};

/// Silo - pipeline observability dashboard and warehouse administration
#[derive(Parser, Debug)]
#[command(name = "silo")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the Silo database file
    #[arg(short, long, global = true, env = "SILO_DB", default_value = "silo.duckdb")]
    pub db: String,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create or migrate the metadata and warehouse schemas
    Init(InitArgs),

    /// Load cleaned CSV files into the warehouse as tracked runs
    Load(LoadArgs),

    /// Show recent pipeline runs
    Runs(RunsArgs),

    /// Show per-pipeline success rates and durations
    Health,

    /// Show quality checks: per-run score or recent failures
    Quality(QualityArgs),

    /// Show field lineage for a warehouse table
    Lineage(LineageArgs),

    /// Show registered source files
    Sources,

    /// Load a YAML ruleset into the quality_rules table
    Rules(RulesArgs),
}

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// List created tables after migration
    #[arg(long)]
    pub show_tables: bool,
}

/// Arguments for the load command
#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Cleaned CSV files to load
    #[arg(required = true)]
    pub files: Vec<String>,

    /// Project config file supplying pipeline/database/ruleset defaults
    #[arg(short, long)]
    pub config: Option<String>,

    /// Pipeline name recorded on each run (overrides config)
    #[arg(short, long)]
    pub pipeline: Option<String>,

    /// Ruleset YAML to validate each batch against (overrides config)
    #[arg(short, long)]
    pub rules: Option<String>,

    /// Reload files even when their content fingerprint is unchanged
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the runs command
#[derive(Args, Debug)]
pub struct RunsArgs {
    /// Maximum number of runs to show
    #[arg(short, long, default_value = "10")]
    pub limit: usize,
}

/// Arguments for the quality command
#[derive(Args, Debug)]
pub struct QualityArgs {
    /// Show the score and per-category summary for one run
    #[arg(short, long)]
    pub run_id: Option<String>,

    /// Maximum number of failed checks to show
    #[arg(short, long, default_value = "10")]
    pub limit: usize,
}

/// Arguments for the lineage command
#[derive(Args, Debug)]
pub struct LineageArgs {
    /// Target warehouse table
    pub table: String,

    /// Restrict to one target column
    #[arg(short, long)]
    pub column: Option<String>,
}

/// Arguments for the rules command
#[derive(Args, Debug)]
pub struct RulesArgs {
    /// Path to the ruleset YAML file
    #[arg(short, long)]
    pub file: String,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
