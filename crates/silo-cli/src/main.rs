//! Silo CLI - pipeline observability dashboard and warehouse administration

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use cli::Cli;
use commands::{health, init, lineage, load, quality, rules, runs, sources};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if cli.global.verbose {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    match &cli.command {
        cli::Commands::Init(args) => init::execute(args, &cli.global),
        cli::Commands::Load(args) => load::execute(args, &cli.global),
        cli::Commands::Runs(args) => runs::execute(args, &cli.global),
        cli::Commands::Health => health::execute(&cli.global),
        cli::Commands::Quality(args) => quality::execute(args, &cli.global),
        cli::Commands::Lineage(args) => lineage::execute(args, &cli.global),
        cli::Commands::Sources => sources::execute(&cli.global),
        cli::Commands::Rules(args) => rules::execute(args, &cli.global),
    }
}
