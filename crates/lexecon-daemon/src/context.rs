// context.rs — Application context shared by every request handler.
//
// Built once, eagerly, at process start and handed to axum as router
// state. Handlers never initialize anything themselves.
//
// The evaluator and the ledger stay decoupled: `decide()` is the only
// place that composes them, by evaluating first and then recording the
// outcome as an ordinary ledger entry.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use lexecon_ledger::{JsonlStorage, LedgerChain, SharedLedger};
use lexecon_policy::{DecisionRequest, PolicyDecision, PolicyEngine, PolicyGraph};

use crate::config::{DaemonConfig, ProjectConfig};
use crate::error::DaemonError;

/// Ledger `event_type` used for recorded decisions.
pub const DECISION_EVENT: &str = "decision";

/// A decision plus where it was recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub decision_id: String,
    pub decision: PolicyDecision,
    pub ledger_entry_id: String,
    pub timestamp: String,
}

/// Everything a request handler needs.
#[derive(Debug)]
pub struct AppContext {
    engine: RwLock<PolicyEngine>,
    ledger: SharedLedger,
    node_id: Uuid,
    started_at: DateTime<Utc>,
}

impl AppContext {
    pub fn new(engine: PolicyEngine, ledger: LedgerChain) -> Self {
        Self {
            engine: RwLock::new(engine),
            ledger: SharedLedger::new(ledger),
            node_id: Uuid::new_v4(),
            started_at: Utc::now(),
        }
    }

    /// Build the context for a project: load the policy document if one
    /// exists, and open the ledger (on disk unless persistence is off).
    pub fn from_project(
        project: &ProjectConfig,
        daemon: &DaemonConfig,
    ) -> Result<Arc<Self>, DaemonError> {
        let engine = if project.policy_path.exists() {
            let graph = PolicyGraph::load_file(&project.policy_path)?;
            tracing::info!(
                path = %project.policy_path.display(),
                mode = %graph.mode(),
                hash = %graph.policy_hash(),
                "policy loaded"
            );
            PolicyEngine::from_graph(graph)
        } else {
            tracing::warn!(
                path = %project.policy_path.display(),
                mode = %daemon.mode,
                "no policy document found, starting with an empty policy"
            );
            PolicyEngine::new(daemon.mode)
        };

        let ledger = if daemon.persist {
            let storage = JsonlStorage::open(&project.ledger_path)?;
            LedgerChain::open(storage)?
        } else {
            LedgerChain::new()
        };

        Ok(Arc::new(Self::new(engine, ledger)))
    }

    pub fn ledger(&self) -> &SharedLedger {
        &self.ledger
    }

    pub fn node_id(&self) -> Uuid {
        self.node_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Evaluate without recording.
    pub fn evaluate(&self, request: &DecisionRequest) -> Result<PolicyDecision, DaemonError> {
        let engine = self
            .engine
            .read()
            .map_err(|e| DaemonError::LockPoisoned(e.to_string()))?;
        Ok(engine.evaluate(request))
    }

    /// Current policy hash.
    pub fn policy_hash(&self) -> Result<String, DaemonError> {
        let engine = self
            .engine
            .read()
            .map_err(|e| DaemonError::LockPoisoned(e.to_string()))?;
        Ok(engine.policy_hash().to_string())
    }

    /// Evaluate a request and append the outcome to the ledger.
    pub fn decide(&self, request: &DecisionRequest) -> Result<DecisionRecord, DaemonError> {
        let decision = self.evaluate(request)?;
        let decision_id = format!("dec_{}", Uuid::new_v4().simple());

        let entry = self
            .ledger
            .append(DECISION_EVENT, decision_payload(&decision_id, request, &decision))?;

        tracing::info!(
            decision_id = %decision_id,
            actor = %request.actor,
            action = %request.action,
            verdict = decision.verdict(),
            entry_id = %entry.entry_id,
            "decision recorded"
        );

        Ok(DecisionRecord {
            decision_id,
            decision,
            ledger_entry_id: entry.entry_id,
            timestamp: entry.timestamp,
        })
    }
}

fn decision_payload(
    decision_id: &str,
    request: &DecisionRequest,
    decision: &PolicyDecision,
) -> Map<String, Value> {
    let payload = json!({
        "decision_id": decision_id,
        "actor": request.actor,
        "action": request.action,
        "resource": request.resource,
        "data_classes": request.data_classes,
        "risk_level": request.risk_level,
        "context": request.context,
        "decision": decision.verdict(),
        "reason": decision.reason,
        "mode": decision.mode,
        "permits_count": decision.permits_count,
        "forbids_count": decision.forbids_count,
        "policy_version_hash": decision.policy_version_hash,
        "requires_confirmation": decision.requires_confirmation,
    });
    match payload {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexecon_policy::{PolicyMode, PolicyRelation};
    use std::fs;
    use tempfile::tempdir;

    fn context() -> AppContext {
        let mut engine = PolicyEngine::new(PolicyMode::Strict);
        engine.add_relation(PolicyRelation::permits("actor:model", "action:read"));
        AppContext::new(engine, LedgerChain::new())
    }

    #[test]
    fn decide_records_the_decision() {
        let ctx = context();
        let record = ctx.decide(&DecisionRequest::new("model", "read")).unwrap();
        assert!(record.decision.allowed);
        assert_eq!(record.ledger_entry_id, "entry_1");
        assert!(record.decision_id.starts_with("dec_"));

        let stored = ctx
            .ledger()
            .read(|chain| chain.get_entry("entry_1").cloned())
            .unwrap()
            .unwrap();
        assert_eq!(stored.event_type, DECISION_EVENT);
        assert_eq!(stored.data["decision"], json!("allow"));
        assert_eq!(stored.data["decision_id"], json!(record.decision_id));
        assert_eq!(
            stored.data["policy_version_hash"],
            json!(ctx.policy_hash().unwrap())
        );
    }

    #[test]
    fn evaluate_does_not_touch_the_ledger() {
        let ctx = context();
        ctx.evaluate(&DecisionRequest::new("model", "read")).unwrap();
        assert_eq!(ctx.ledger().len().unwrap(), 1);
    }

    #[test]
    fn from_project_loads_policy_and_ledger() {
        let dir = tempdir().unwrap();
        let project = ProjectConfig::for_project(dir.path());
        fs::create_dir_all(project.policy_path.parent().unwrap()).unwrap();
        fs::write(
            &project.policy_path,
            r#"{"mode": "permissive", "relations": [{"type": "forbids", "subject": "intern", "action": "delete"}]}"#,
        )
        .unwrap();

        let ctx = AppContext::from_project(&project, &DaemonConfig::default()).unwrap();
        assert!(!ctx.evaluate(&DecisionRequest::new("intern", "delete")).unwrap().allowed);
        assert!(ctx.evaluate(&DecisionRequest::new("intern", "read")).unwrap().allowed);

        ctx.decide(&DecisionRequest::new("intern", "read")).unwrap();
        let stored = JsonlStorage::read_all(&project.ledger_path).unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[test]
    fn missing_policy_uses_configured_mode() {
        let dir = tempdir().unwrap();
        let project = ProjectConfig::for_project(dir.path());
        let daemon = DaemonConfig {
            mode: PolicyMode::Permissive,
            persist: false,
            ..DaemonConfig::default()
        };

        let ctx = AppContext::from_project(&project, &daemon).unwrap();
        assert!(ctx.evaluate(&DecisionRequest::new("x", "y")).unwrap().allowed);
        assert!(!project.ledger_path.exists());
    }
}
