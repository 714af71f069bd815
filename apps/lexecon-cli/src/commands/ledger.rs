// ledger.rs — Ledger subcommands: verify, tail, report.
//
// All three read the ledger file without writing to it. Entries are
// loaded into an in-memory chain so an empty or missing file is never
// seeded with a genesis entry from here.

use clap::Subcommand;
use lexecon_daemon::ProjectConfig;
use lexecon_ledger::{JsonlStorage, LedgerChain, LedgerError, MemoryStorage};

#[derive(Subcommand)]
pub enum LedgerCommands {
    /// Verify the hash chain. Exits non-zero if it is broken.
    Verify,
    /// Show recent ledger entries.
    Tail {
        /// Number of entries to show.
        #[arg(short, default_value = "10")]
        n: usize,
        /// Only show entries of this event type.
        #[arg(long)]
        event_type: Option<String>,
    },
    /// Print the audit report as JSON.
    Report,
}

pub fn execute(cmd: &LedgerCommands, config: &ProjectConfig) -> anyhow::Result<()> {
    let path = &config.ledger_path;
    if !path.exists() {
        println!("No ledger found at {}", path.display());
        return Ok(());
    }

    match cmd {
        LedgerCommands::Verify => {
            let chain = match load(config) {
                Ok(chain) => chain,
                Err(LedgerError::HashMismatch {
                    entry_id,
                    expected,
                    actual,
                }) => {
                    println!("INTEGRITY VIOLATION in entry {}:", entry_id);
                    println!("  Stored hash:     {}", expected);
                    println!("  Recomputed hash: {}", actual);
                    println!();
                    println!("The ledger may have been tampered with.");
                    anyhow::bail!("Ledger integrity check failed");
                }
                Err(e) => return Err(e.into()),
            };

            let report = chain.verify_integrity();
            if report.valid {
                println!(
                    "Ledger verified: {} entry(ies), hash chain intact.",
                    report.entries_checked
                );
                if let Some(head) = &report.chain_head_hash {
                    println!("Head: {}", head);
                }
            } else {
                println!(
                    "INTEGRITY VIOLATION at index {}:",
                    report.failed_index.unwrap_or_default()
                );
                println!("  Entry: {}", report.entry_id.as_deref().unwrap_or("-"));
                println!("  {}", report.error.as_deref().unwrap_or("unknown failure"));
                println!();
                println!("The ledger may have been tampered with.");
                anyhow::bail!("Ledger integrity check failed");
            }
        }

        LedgerCommands::Tail { n, event_type } => {
            let chain = load(config)?;
            let recent = chain.recent(event_type.as_deref(), Some(*n));
            if recent.is_empty() {
                println!("No ledger entries.");
                return Ok(());
            }

            println!("{:<32} {:<12} {:<16} SUMMARY", "TIMESTAMP", "ENTRY", "EVENT");
            println!("{}", "-".repeat(80));
            for entry in recent {
                let summary = match (entry.data.get("actor"), entry.data.get("decision")) {
                    (Some(actor), Some(decision)) => format!(
                        "{} {} {}",
                        actor.as_str().unwrap_or("-"),
                        entry.data.get("action").and_then(|a| a.as_str()).unwrap_or("-"),
                        decision.as_str().unwrap_or("-"),
                    ),
                    _ => serde_json::to_string(&entry.data)?,
                };
                println!(
                    "{:<32} {:<12} {:<16} {}",
                    entry.timestamp, entry.entry_id, entry.event_type, summary
                );
            }
        }

        LedgerCommands::Report => {
            let chain = load(config)?;
            let report = chain.generate_audit_report();
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn load(config: &ProjectConfig) -> Result<LedgerChain, LedgerError> {
    let entries = JsonlStorage::read_all(&config.ledger_path)?;
    LedgerChain::open(MemoryStorage::with_entries(entries))
}
