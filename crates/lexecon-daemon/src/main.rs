//! # lexecon-daemon
//!
//! Serves the Lexecon decision API over HTTP.
//!
//! ## Usage
//!
//! ```text
//! lexecon-daemon --project-root /srv/agent
//! ```
//!
//! Settings are read from `<project-root>/.lexecon/daemon.toml` when present.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Lexecon decision daemon.
#[derive(Parser)]
#[command(name = "lexecon-daemon", about = "Lexecon policy decision daemon")]
struct Cli {
    /// Project root directory (defaults to current directory).
    #[arg(long, default_value = ".")]
    project_root: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("lexecon_daemon=info".parse()?)
                .add_directive("lexecon_ledger=info".parse()?)
                .add_directive("lexecon_policy=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let project_root = cli.project_root.canonicalize()?;

    tracing::info!("Starting Lexecon daemon");
    lexecon_daemon::serve(&project_root).await
}
