//! Conduit HTTP server
//!
//! # Usage
//!
//! ```bash
//! conduit-server [--data-dir <path>] [--host <host>] [--port <port>]
//! ```
//!
//! # Environment Variables
//!
//! - `CONDUIT_DATA_DIR`: data directory (default `.conduit`)
//! - `RUST_LOG`: log verbosity (default: `conduit=info`)
//!
//! Logs go to stderr.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use conduit_core::{AdapterRegistry, ConfigResolver, Store};
use conduit_server::{AppState, Error, Result};
use tracing_subscriber::EnvFilter;

/// HTTP server for Conduit synchronizations
#[derive(Parser)]
#[command(name = "conduit-server")]
#[command(about = "HTTP server for Conduit synchronizations")]
#[command(version)]
struct Args {
    /// Directory holding records and configuration
    #[arg(long, env = "CONDUIT_DATA_DIR", default_value = ".conduit")]
    data_dir: PathBuf,

    /// Listen host, overrides `server.host`
    #[arg(long)]
    host: Option<String>,

    /// Listen port, overrides `server.port`
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("conduit=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let settings = ConfigResolver::new(args.data_dir.as_path()).resolve()?;

    let host = args.host.unwrap_or_else(|| settings.server.host.clone());
    let port = args.port.unwrap_or(settings.server.port);
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .map_err(|_| Error::InvalidAddress(format!("{host}:{port}")))?;

    tracing::info!(data_dir = ?args.data_dir, "Opening store");
    let store = Arc::new(Store::open(args.data_dir.as_path())?);
    let state = AppState::new(store, AdapterRegistry::with_defaults(), settings);

    conduit_server::serve(state, addr).await
}
