//! Conduit CLI
//!
//! Manage synchronizations, run them and inspect their contracts and job
//! logs against a local data directory.

mod cli;
mod commands;
mod context;
mod error;

use clap::Parser;
use colored::Colorize;
use std::path::Path;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use context::Context;
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("conduit=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("conduit=warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(cli.verbose)
        .init();
    tracing::debug!("Verbose mode enabled");

    match cli.command {
        Some(cmd) => execute_command(&cli.data_dir, cmd),
        None => {
            println!("{} synchronization engine", "conduit".green().bold());
            println!();
            println!("Run {} for available commands.", "conduit --help".cyan());
            Ok(())
        }
    }
}

fn execute_command(data_dir: &Path, cmd: Commands) -> Result<()> {
    // `map` is the only command that needs no data directory.
    let ctx = || Context::open(data_dir);
    match cmd {
        Commands::Create { file, kind, json } => commands::run_create(&ctx()?, &file, kind, json),
        Commands::List {
            search,
            mappings,
            json,
        } => commands::run_list(&ctx()?, search.as_deref(), mappings, json),
        Commands::Run { id, contract, json } => {
            commands::run_synchronization(&ctx()?, &id, contract.as_deref(), json)
        }
        Commands::Test { id, contract, json } => {
            commands::run_test(&ctx()?, &id, contract.as_deref(), json)
        }
        Commands::Logs { id, json } => commands::run_logs(&ctx()?, id, json),
        Commands::Contracts { id, json } => commands::run_contracts(&ctx()?, id, json),
        Commands::Map { mapping, input } => commands::run_map(&mapping, &input),
        Commands::PurgeLogs => commands::run_purge_logs(&ctx()?),
    }
}
