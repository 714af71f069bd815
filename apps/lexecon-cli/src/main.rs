//! # lexecon-cli
//!
//! Command-line interface for Lexecon.
//!
//! - `lexecon policy hash/decide` — inspect the policy and evaluate requests
//! - `lexecon ledger verify/tail/report` — inspect the hash-chained ledger
//! - `lexecon serve` — start the HTTP daemon

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lexecon_daemon::{DaemonConfig, ProjectConfig};

/// Lexecon CLI — evaluate policy and audit decisions.
#[derive(Parser)]
#[command(name = "lexecon", version, about)]
struct Cli {
    /// Project root directory (defaults to current directory).
    #[arg(long, default_value = ".")]
    project_root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect the policy and evaluate requests against it.
    Policy {
        #[command(subcommand)]
        command: commands::policy::PolicyCommands,
    },
    /// Inspect the decision ledger.
    Ledger {
        #[command(subcommand)]
        command: commands::ledger::LedgerCommands,
    },
    /// Start the HTTP daemon.
    Serve,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let project_root = cli.project_root.canonicalize().unwrap_or(cli.project_root);
    let base = ProjectConfig::for_project(&project_root);
    let daemon = DaemonConfig::load(&base.daemon_config)?;
    let config = base.with_overrides(&daemon);

    match &cli.command {
        Commands::Policy { command } => commands::policy::execute(command, &config, &daemon),
        Commands::Ledger { command } => commands::ledger::execute(command, &config),
        Commands::Serve => commands::serve::execute(&project_root),
    }
}
