// policy.rs — Policy subcommands: hash, decide.

use std::path::PathBuf;

use anyhow::Context;
use clap::Subcommand;
use lexecon_daemon::{AppContext, DaemonConfig, ProjectConfig};
use lexecon_policy::{DecisionRequest, PolicyDecision, PolicyGraph};

#[derive(Subcommand)]
pub enum PolicyCommands {
    /// Load the policy document and print its version hash.
    Hash {
        /// Policy file (defaults to .lexecon/policy.json).
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Evaluate a request against the project policy.
    Decide {
        /// Who is acting.
        #[arg(long)]
        actor: String,
        /// What they want to do.
        #[arg(long)]
        action: String,
        /// Data class touched by the action. Repeatable.
        #[arg(long = "data-class")]
        data_classes: Vec<String>,
        /// Resource the action targets.
        #[arg(long)]
        resource: Option<String>,
        /// Risk level, 1 (low) to 5 (critical).
        #[arg(long, default_value = "1", allow_negative_numbers = true)]
        risk: i64,
        /// Append the decision to the project ledger.
        #[arg(long)]
        record: bool,
    },
}

pub fn execute(
    cmd: &PolicyCommands,
    config: &ProjectConfig,
    daemon: &DaemonConfig,
) -> anyhow::Result<()> {
    match cmd {
        PolicyCommands::Hash { file } => {
            let path = file.clone().unwrap_or_else(|| config.policy_path.clone());
            if !path.exists() {
                anyhow::bail!("No policy document found at {}", path.display());
            }
            let graph = PolicyGraph::load_file(&path)
                .with_context(|| format!("loading policy from {}", path.display()))?;
            println!("Policy:    {}", path.display());
            println!("Mode:      {}", graph.mode());
            println!("Terms:     {}", graph.terms().len());
            println!("Relations: {}", graph.relations().len());
            println!("Hash:      {}", graph.policy_hash());
        }

        PolicyCommands::Decide {
            actor,
            action,
            data_classes,
            resource,
            risk,
            record,
        } => {
            let mut request = DecisionRequest::new(actor.as_str(), action.as_str())
                .with_data_classes(data_classes.iter().cloned())
                .with_risk_level(*risk);
            if let Some(resource) = resource {
                request = request.with_resource(resource.as_str());
            }

            // Only touch the ledger file when asked to record.
            let settings = DaemonConfig {
                persist: *record,
                ..daemon.clone()
            };
            let ctx = AppContext::from_project(config, &settings)
                .context("loading project policy and ledger")?;

            if *record {
                let recorded = ctx.decide(&request)?;
                print_decision(&recorded.decision);
                println!("Recorded:  {} ({})", recorded.ledger_entry_id, recorded.decision_id);
            } else {
                print_decision(&ctx.evaluate(&request)?);
            }
        }
    }

    Ok(())
}

fn print_decision(decision: &PolicyDecision) {
    println!("Decision:  {}", decision.verdict().to_uppercase());
    println!("Reason:    {}", decision.reason);
    println!("Mode:      {}", decision.mode);
    println!(
        "Matched:   {} permit(s), {} forbid(s)",
        decision.permits_count, decision.forbids_count
    );
    println!("Policy:    {}", decision.policy_version_hash);
    if decision.requires_confirmation {
        println!("Confirmation required before proceeding (high risk, paranoid mode).");
    }
}
