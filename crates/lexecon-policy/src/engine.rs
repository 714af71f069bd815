// engine.rs — Decision evaluation.
//
// Every request flows through `evaluate()`:
//
// 1. Find matching `permits` relations.
// 2. Find matching `forbids` relations.
// 3. Apply the mode's rule:
//    - Strict / Paranoid: allowed iff some permit matched and no forbid did.
//    - Permissive: allowed iff no forbid matched.
// 4. Explain the outcome from the first few matching relations.
//
// A relation matches when its source matches the actor, its target matches
// the action, and (if it carries an `object` constraint) one of the
// request's data classes matches that object. Evaluation is a pure
// function of the graph and the request; unknown actors or actions are
// never an error, they simply match nothing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PolicyError;
use crate::graph::{PolicyGraph, PolicyMode};
use crate::matcher::{MatchStrategy, TermMatcher};
use crate::relation::{PolicyRelation, RelationType};
use crate::term::PolicyTerm;

/// How many matching relations contribute justifications to a reason.
const MAX_REASONS: usize = 3;

/// In Paranoid mode, allowed requests at or above this risk level are
/// flagged for human confirmation.
pub const CONFIRMATION_RISK_LEVEL: i64 = 4;

fn default_risk_level() -> i64 {
    1
}

/// A request to perform an action, submitted to the engine for evaluation.
///
/// `resource`, `risk_level` and `context` do not affect matching today;
/// they are carried so callers can record them alongside the decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionRequest {
    pub actor: String,
    pub action: String,
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub data_classes: Vec<String>,
    #[serde(default = "default_risk_level")]
    pub risk_level: i64,
    #[serde(default)]
    pub context: Map<String, Value>,
}

impl DecisionRequest {
    pub fn new(actor: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            action: action.into(),
            resource: None,
            data_classes: Vec::new(),
            risk_level: default_risk_level(),
            context: Map::new(),
        }
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn with_data_classes<I, S>(mut self, data_classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.data_classes = data_classes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_risk_level(mut self, risk_level: i64) -> Self {
        self.risk_level = risk_level;
        self
    }

    pub fn with_context(mut self, context: Map<String, Value>) -> Self {
        self.context = context;
        self
    }
}

/// The result of evaluating one request.
///
/// `policy_version_hash` binds the decision to the exact graph state that
/// produced it, so a recorded decision can be replayed later.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyDecision {
    pub allowed: bool,
    pub reason: String,
    pub mode: PolicyMode,
    pub permits_count: usize,
    pub forbids_count: usize,
    pub policy_version_hash: String,
    /// Paranoid mode only: an allowed, high-risk request should be
    /// confirmed by a human before it runs. Never changes `allowed`.
    #[serde(default)]
    pub requires_confirmation: bool,
}

impl PolicyDecision {
    /// "allow" or "deny".
    pub fn verdict(&self) -> &'static str {
        if self.allowed {
            "allow"
        } else {
            "deny"
        }
    }
}

/// A relation that matched a request, and how each side matched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelationMatch {
    pub relation_id: String,
    pub actor_match: MatchStrategy,
    pub action_match: MatchStrategy,
}

/// The decision plus every relation that contributed to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationTrace {
    pub decision: PolicyDecision,
    pub permits: Vec<RelationMatch>,
    pub forbids: Vec<RelationMatch>,
}

/// The policy engine — a policy graph plus the matcher used against it.
#[derive(Debug, Clone, Default)]
pub struct PolicyEngine {
    graph: PolicyGraph,
    matcher: TermMatcher,
}

impl PolicyEngine {
    /// Create an empty engine with the loose matcher.
    pub fn new(mode: PolicyMode) -> Self {
        Self::from_graph(PolicyGraph::new(mode))
    }

    pub fn from_graph(graph: PolicyGraph) -> Self {
        Self {
            graph,
            matcher: TermMatcher::default(),
        }
    }

    /// Build an engine from a full policy document.
    pub fn from_document(document: &Value) -> Result<Self, PolicyError> {
        PolicyGraph::from_document(document).map(Self::from_graph)
    }

    /// Swap the matcher and return self.
    pub fn with_matcher(mut self, matcher: TermMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn graph(&self) -> &PolicyGraph {
        &self.graph
    }

    pub fn mode(&self) -> PolicyMode {
        self.graph.mode()
    }

    pub fn set_mode(&mut self, mode: PolicyMode) {
        self.graph.set_mode(mode);
    }

    pub fn add_term(&mut self, term: PolicyTerm) {
        self.graph.add_term(term);
    }

    pub fn add_relation(&mut self, relation: PolicyRelation) {
        self.graph.add_relation(relation);
    }

    /// Full replace of terms and relations; see [`PolicyGraph::load_policy`].
    pub fn load_policy(&mut self, document: &Value) -> Result<(), PolicyError> {
        self.graph.load_policy(document)
    }

    pub fn policy_hash(&self) -> &str {
        self.graph.policy_hash()
    }

    /// Evaluate a request and return a decision.
    pub fn evaluate(&self, request: &DecisionRequest) -> PolicyDecision {
        self.evaluate_with_trace(request).decision
    }

    /// Evaluate a request and return the decision with the matched relations.
    pub fn evaluate_with_trace(&self, request: &DecisionRequest) -> EvaluationTrace {
        let permits = self.find_relations(RelationType::Permits, request);
        let forbids = self.find_relations(RelationType::Forbids, request);

        let mode = self.graph.mode();
        let allowed = match mode {
            PolicyMode::Strict | PolicyMode::Paranoid => !permits.is_empty() && forbids.is_empty(),
            PolicyMode::Permissive => forbids.is_empty(),
        };
        let requires_confirmation =
            mode == PolicyMode::Paranoid && allowed && request.risk_level >= CONFIRMATION_RISK_LEVEL;

        let decision = PolicyDecision {
            allowed,
            reason: reasoning(allowed, &permits, &forbids),
            mode,
            permits_count: permits.len(),
            forbids_count: forbids.len(),
            policy_version_hash: self.graph.policy_hash().to_string(),
            requires_confirmation,
        };

        tracing::debug!(
            actor = %request.actor,
            action = %request.action,
            allowed,
            permits = decision.permits_count,
            forbids = decision.forbids_count,
            "evaluated request"
        );

        EvaluationTrace {
            decision,
            permits: permits.iter().map(|(_, m)| m.clone()).collect(),
            forbids: forbids.iter().map(|(_, m)| m.clone()).collect(),
        }
    }

    /// All relations of `relation_type` that match the request, in graph order.
    pub fn find_relations(
        &self,
        relation_type: RelationType,
        request: &DecisionRequest,
    ) -> Vec<(&PolicyRelation, RelationMatch)> {
        let terms = self.graph.terms();
        self.graph
            .relations()
            .iter()
            .filter(|relation| relation.relation_type == relation_type)
            .filter_map(|relation| {
                let actor_match = self.matcher.matches(&request.actor, &relation.source, terms)?;
                let action_match =
                    self.matcher.matches(&request.action, &relation.target, terms)?;
                if !self.object_matches(relation, &request.data_classes) {
                    return None;
                }
                Some((
                    relation,
                    RelationMatch {
                        relation_id: relation.relation_id.clone(),
                        actor_match,
                        action_match,
                    },
                ))
            })
            .collect()
    }

    /// A relation without an `object` constraint matches any data classes.
    /// With one, at least one requested data class must match it; an empty
    /// list never does. Non-string objects never match.
    fn object_matches(&self, relation: &PolicyRelation, data_classes: &[String]) -> bool {
        match relation.object() {
            None => true,
            Some(Value::String(object)) => data_classes.iter().any(|dc| {
                self.matcher
                    .matches(dc, object, self.graph.terms())
                    .is_some()
            }),
            Some(_) => false,
        }
    }
}

fn reasoning(
    allowed: bool,
    permits: &[(&PolicyRelation, RelationMatch)],
    forbids: &[(&PolicyRelation, RelationMatch)],
) -> String {
    if allowed {
        match justifications(permits) {
            Some(reasons) => format!("Permitted: {}", reasons),
            None => format!("Permitted by {} rule(s), no conflicts", permits.len()),
        }
    } else if !forbids.is_empty() {
        match justifications(forbids) {
            Some(reasons) => format!("Denied: {}", reasons),
            None => format!("Denied by {} prohibition(s)", forbids.len()),
        }
    } else {
        "Action not explicitly permitted".to_string()
    }
}

/// Justifications of the first few matches, joined with "; ".
fn justifications(matches: &[(&PolicyRelation, RelationMatch)]) -> Option<String> {
    let reasons: Vec<&str> = matches
        .iter()
        .take(MAX_REASONS)
        .filter_map(|(relation, _)| relation.justification())
        .collect();
    (!reasons.is_empty()).then(|| reasons.join("; "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn strict_with_permit() -> PolicyEngine {
        let mut engine = PolicyEngine::new(PolicyMode::Strict);
        engine.add_relation(PolicyRelation::permits("a", "read"));
        engine
    }

    #[test]
    fn strict_allows_explicit_permit() {
        let engine = strict_with_permit();
        let decision = engine.evaluate(&DecisionRequest::new("a", "read"));
        assert!(decision.allowed);
        assert_eq!(decision.permits_count, 1);
        assert_eq!(decision.forbids_count, 0);
        assert_eq!(decision.reason, "Permitted by 1 rule(s), no conflicts");
        assert_eq!(decision.verdict(), "allow");
    }

    #[test]
    fn strict_forbid_overrides_permit() {
        let mut engine = strict_with_permit();
        engine.add_relation(PolicyRelation::forbids("a", "read"));
        let decision = engine.evaluate(&DecisionRequest::new("a", "read"));
        assert!(!decision.allowed);
        assert_eq!(decision.forbids_count, 1);
        assert!(decision.reason.contains("prohibition"));
    }

    #[test]
    fn strict_denies_without_permit() {
        let engine = PolicyEngine::new(PolicyMode::Strict);
        let decision = engine.evaluate(&DecisionRequest::new("x", "y"));
        assert!(!decision.allowed);
        assert_eq!(decision.reason, "Action not explicitly permitted");
    }

    #[test]
    fn permissive_allows_when_nothing_forbids() {
        let engine = PolicyEngine::new(PolicyMode::Permissive);
        let decision = engine.evaluate(&DecisionRequest::new("x", "y"));
        assert!(decision.allowed);
        assert_eq!(decision.mode, PolicyMode::Permissive);
        assert_eq!(decision.reason, "Permitted by 0 rule(s), no conflicts");
    }

    #[test]
    fn permissive_denies_on_forbid() {
        let mut engine = PolicyEngine::new(PolicyMode::Permissive);
        engine.add_relation(
            PolicyRelation::forbids("actor:intern", "action:delete")
                .with_justification("Interns cannot delete"),
        );
        let decision = engine.evaluate(&DecisionRequest::new("intern", "delete"));
        assert!(!decision.allowed);
        assert_eq!(decision.reason, "Denied: Interns cannot delete");
    }

    #[test]
    fn object_constraint_needs_data_classes() {
        let mut engine = PolicyEngine::new(PolicyMode::Strict);
        engine.add_relation(PolicyRelation::permits("a", "read").with_object("pii"));

        let bare = engine.evaluate(&DecisionRequest::new("a", "read"));
        assert!(!bare.allowed);
        assert_eq!(bare.permits_count, 0);

        let with_class =
            engine.evaluate(&DecisionRequest::new("a", "read").with_data_classes(["pii"]));
        assert!(with_class.allowed);

        let other_class =
            engine.evaluate(&DecisionRequest::new("a", "read").with_data_classes(["phi"]));
        assert!(!other_class.allowed);
    }

    #[test]
    fn non_string_object_never_matches() {
        let mut engine = PolicyEngine::new(PolicyMode::Strict);
        engine.add_relation(
            PolicyRelation::permits("a", "read").with_metadata("object", json!(["pii"])),
        );
        let decision =
            engine.evaluate(&DecisionRequest::new("a", "read").with_data_classes(["pii"]));
        assert!(!decision.allowed);
    }

    #[test]
    fn label_and_substring_matching() {
        let mut engine = PolicyEngine::new(PolicyMode::Strict);
        engine.add_term(PolicyTerm::actor("model", "Assistant"));
        engine.add_relation(PolicyRelation::permits("actor:model", "action:read"));

        assert!(engine.evaluate(&DecisionRequest::new("Assistant", "read")).allowed);
        assert!(engine.evaluate(&DecisionRequest::new("model", "read")).allowed);
        assert!(!engine.evaluate(&DecisionRequest::new("robot", "read")).allowed);
    }

    #[test]
    fn exact_matcher_disables_aliases() {
        let mut engine =
            PolicyEngine::new(PolicyMode::Strict).with_matcher(TermMatcher::exact());
        engine.add_relation(PolicyRelation::permits("actor:model", "action:read"));
        assert!(!engine.evaluate(&DecisionRequest::new("model", "read")).allowed);
        assert!(
            engine
                .evaluate(&DecisionRequest::new("actor:model", "action:read"))
                .allowed
        );
    }

    #[test]
    fn duplicate_relations_are_both_counted() {
        let mut engine = strict_with_permit();
        engine.add_relation(PolicyRelation::permits("a", "read"));
        let decision = engine.evaluate(&DecisionRequest::new("a", "read"));
        assert_eq!(decision.permits_count, 2);
    }

    #[test]
    fn reason_uses_first_three_justifications() {
        let mut engine = PolicyEngine::new(PolicyMode::Strict);
        engine.add_relation(PolicyRelation::permits("a", "read").with_justification("one"));
        engine.add_relation(PolicyRelation::permits("a", "read"));
        engine.add_relation(PolicyRelation::permits("a", "read").with_justification("three"));
        engine.add_relation(PolicyRelation::permits("a", "read").with_justification("four"));

        let decision = engine.evaluate(&DecisionRequest::new("a", "read"));
        assert_eq!(decision.reason, "Permitted: one; three");
        assert_eq!(decision.permits_count, 4);
    }

    #[test]
    fn paranoid_flags_high_risk_allows() {
        let mut engine = strict_with_permit();
        engine.set_mode(PolicyMode::Paranoid);

        let low = engine.evaluate(&DecisionRequest::new("a", "read"));
        assert!(low.allowed);
        assert!(!low.requires_confirmation);

        let high = engine.evaluate(
            &DecisionRequest::new("a", "read").with_risk_level(CONFIRMATION_RISK_LEVEL),
        );
        assert!(high.allowed);
        assert!(high.requires_confirmation);

        let denied = engine.evaluate(&DecisionRequest::new("b", "write").with_risk_level(5));
        assert!(!denied.allowed);
        assert!(!denied.requires_confirmation);
    }

    #[test]
    fn strict_never_requires_confirmation() {
        let engine = strict_with_permit();
        let decision = engine.evaluate(&DecisionRequest::new("a", "read").with_risk_level(5));
        assert!(decision.allowed);
        assert!(!decision.requires_confirmation);
    }

    #[test]
    fn evaluation_is_deterministic() {
        let engine = strict_with_permit();
        let request = DecisionRequest::new("a", "read").with_resource("db://customers");
        assert_eq!(engine.evaluate(&request), engine.evaluate(&request));
    }

    #[test]
    fn decision_carries_policy_hash() {
        let engine = strict_with_permit();
        let decision = engine.evaluate(&DecisionRequest::new("a", "read"));
        assert_eq!(decision.policy_version_hash, engine.policy_hash());
    }

    #[test]
    fn trace_reports_match_strategies() {
        let mut engine = PolicyEngine::new(PolicyMode::Strict);
        engine.add_relation(PolicyRelation::permits("actor:model", "read"));
        let trace = engine.evaluate_with_trace(&DecisionRequest::new("model", "read"));
        assert_eq!(trace.permits.len(), 1);
        assert_eq!(trace.permits[0].actor_match, MatchStrategy::Substring);
        assert_eq!(trace.permits[0].action_match, MatchStrategy::ExactId);
        assert!(trace.forbids.is_empty());
    }

    #[test]
    fn request_defaults_when_deserialized() {
        let request: DecisionRequest =
            serde_json::from_value(json!({"actor": "a", "action": "read"})).unwrap();
        assert_eq!(request.risk_level, 1);
        assert!(request.data_classes.is_empty());
        assert!(request.resource.is_none());
    }

    #[test]
    fn negative_risk_level_is_accepted() {
        let request: DecisionRequest =
            serde_json::from_value(json!({"actor": "a", "action": "read", "risk_level": -1}))
                .unwrap();
        assert_eq!(request.risk_level, -1);

        let mut engine = strict_with_permit();
        engine.set_mode(PolicyMode::Paranoid);
        let decision = engine.evaluate(&request);
        assert!(decision.allowed);
        assert!(!decision.requires_confirmation);
    }
}
