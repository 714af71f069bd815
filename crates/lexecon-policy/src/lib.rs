//! # lexecon-policy
//!
//! Policy graph and decision evaluator for Lexecon.
//!
//! A [`PolicyGraph`] holds typed [`PolicyTerm`] nodes and ordered
//! [`PolicyRelation`] edges. The [`PolicyEngine`] evaluates a
//! [`DecisionRequest`] against the graph and returns a [`PolicyDecision`]:
//! allowed or denied, a human-readable reason, match counts, and the hash
//! of the policy version that produced it.
//!
//! ## Quick Example
//!
//! ```rust
//! use lexecon_policy::{DecisionRequest, PolicyEngine, PolicyMode, PolicyRelation};
//!
//! let mut engine = PolicyEngine::new(PolicyMode::Strict);
//! engine.add_relation(PolicyRelation::permits("actor:support", "action:read_ticket"));
//!
//! let decision = engine.evaluate(&DecisionRequest::new("support", "read_ticket"));
//! assert!(decision.allowed);
//! ```
//!
//! ## Key invariants
//!
//! - **Pure evaluation**: the same graph and request always give the same decision.
//! - **Content-addressed policy**: the policy hash ignores term insertion order
//!   but not relation order.
//! - **No partial loads**: a failed `load_policy` leaves the graph empty.

pub mod engine;
pub mod error;
mod fields;
pub mod graph;
pub mod matcher;
pub mod relation;
pub mod term;

pub use engine::{
    DecisionRequest, EvaluationTrace, PolicyDecision, PolicyEngine, RelationMatch,
    CONFIRMATION_RISK_LEVEL,
};
pub use error::PolicyError;
pub use graph::{PolicyGraph, PolicyMode};
pub use matcher::{MatchStrategy, TermMatcher};
pub use relation::{PolicyRelation, RelationType};
pub use term::{PolicyTerm, TermType};
