//! CLI argument parsing using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Conduit - synchronize objects from sources into targets
#[derive(Parser, Debug)]
#[command(name = "conduit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory holding records and configuration
    #[arg(long, global = true, env = "CONDUIT_DATA_DIR", default_value = ".conduit")]
    pub data_dir: PathBuf,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// What a `create` file describes
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecordKind {
    #[default]
    Synchronization,
    Mapping,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Create a synchronization or mapping from a TOML, JSON or YAML file
    ///
    /// Examples:
    ///   conduit create people.toml
    ///   conduit create person.json --kind mapping
    Create {
        /// Definition file
        file: PathBuf,

        /// Kind of record the file describes
        #[arg(short, long, value_enum, default_value_t = RecordKind::Synchronization)]
        kind: RecordKind,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// List synchronizations
    List {
        /// Only show records containing this text
        #[arg(short, long)]
        search: Option<String>,

        /// List stored mappings instead
        #[arg(long)]
        mappings: bool,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Run a synchronization and record its job log
    ///
    /// Exits with status 1 when the run ends at ERROR level.
    Run {
        /// Synchronization id
        id: String,

        /// Only synchronize the source object of this contract
        #[arg(long)]
        contract: Option<String>,

        /// Output the trace as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show job logs of a synchronization, newest first
    Logs {
        /// Synchronization id
        id: i64,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Show contracts of a synchronization
    Contracts {
        /// Synchronization id
        id: i64,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Map a synchronization's source objects without writing them
    ///
    /// Prints what a run would write; targets and contracts are untouched.
    Test {
        /// Synchronization id
        id: String,

        /// Only test the source object of this contract
        #[arg(long)]
        contract: Option<String>,

        /// Output the trace and objects as JSON
        #[arg(long)]
        json: bool,
    },

    /// Evaluate a mapping file against an input object file
    Map {
        /// Mapping file (rules object or full mapping definition)
        #[arg(short, long)]
        mapping: PathBuf,

        /// Input object file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Delete job logs past their retention
    PurgeLogs,
}
