// matcher.rs — How request values are matched against relation endpoints.
//
// A request names actors and actions loosely ("model", "Model",
// "actor:model"). A relation endpoint is a term id or a raw string. The
// matcher tries an ordered list of strategies and reports the first one
// that succeeds, so each strategy can be tested and tightened on its own.
//
// The default (`loose`) list includes substring containment: "model"
// matches "actor:model", but also "actor:supermodel". This is deliberate
// aliasing and is a source of false-positive matches. Use `exact()` to
// drop it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::term::PolicyTerm;

/// One way a request value can match a relation endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// The value equals the endpoint string.
    ExactId,
    /// The endpoint names a registered term whose label equals the value.
    Label,
    /// The value is a non-empty substring of the endpoint string.
    Substring,
}

impl MatchStrategy {
    pub fn matches(
        self,
        value: &str,
        endpoint: &str,
        terms: &BTreeMap<String, PolicyTerm>,
    ) -> bool {
        match self {
            MatchStrategy::ExactId => value == endpoint,
            MatchStrategy::Label => terms.get(endpoint).is_some_and(|term| term.label == value),
            MatchStrategy::Substring => !value.is_empty() && endpoint.contains(value),
        }
    }
}

/// An ordered list of match strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermMatcher {
    strategies: Vec<MatchStrategy>,
}

impl TermMatcher {
    /// Exact id, then label, then substring containment.
    pub fn loose() -> Self {
        Self::with_strategies(vec![
            MatchStrategy::ExactId,
            MatchStrategy::Label,
            MatchStrategy::Substring,
        ])
    }

    /// Exact id, then label. No substring aliasing.
    pub fn exact() -> Self {
        Self::with_strategies(vec![MatchStrategy::ExactId, MatchStrategy::Label])
    }

    pub fn with_strategies(strategies: Vec<MatchStrategy>) -> Self {
        Self { strategies }
    }

    pub fn strategies(&self) -> &[MatchStrategy] {
        &self.strategies
    }

    /// Return the first strategy under which `value` matches `endpoint`.
    pub fn matches(
        &self,
        value: &str,
        endpoint: &str,
        terms: &BTreeMap<String, PolicyTerm>,
    ) -> Option<MatchStrategy> {
        self.strategies
            .iter()
            .copied()
            .find(|strategy| strategy.matches(value, endpoint, terms))
    }
}

impl Default for TermMatcher {
    fn default() -> Self {
        Self::loose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> BTreeMap<String, PolicyTerm> {
        let term = PolicyTerm::actor("model", "Assistant");
        BTreeMap::from([(term.term_id.clone(), term)])
    }

    #[test]
    fn exact_id_wins_first() {
        let terms = registry();
        let matcher = TermMatcher::loose();
        assert_eq!(
            matcher.matches("actor:model", "actor:model", &terms),
            Some(MatchStrategy::ExactId)
        );
    }

    #[test]
    fn label_matches_registered_term() {
        let terms = registry();
        let matcher = TermMatcher::loose();
        assert_eq!(
            matcher.matches("Assistant", "actor:model", &terms),
            Some(MatchStrategy::Label)
        );
    }

    #[test]
    fn label_needs_a_registered_term() {
        let terms = BTreeMap::new();
        assert!(!MatchStrategy::Label.matches("Assistant", "actor:model", &terms));
    }

    #[test]
    fn substring_aliases_short_names() {
        let terms = registry();
        let matcher = TermMatcher::loose();
        assert_eq!(
            matcher.matches("model", "actor:model", &terms),
            Some(MatchStrategy::Substring)
        );
        // Containment is not word-bounded.
        assert_eq!(
            matcher.matches("model", "actor:supermodel", &terms),
            Some(MatchStrategy::Substring)
        );
    }

    #[test]
    fn empty_value_never_substring_matches() {
        let terms = registry();
        assert!(!MatchStrategy::Substring.matches("", "actor:model", &terms));
        assert_eq!(TermMatcher::loose().matches("", "actor:model", &terms), None);
    }

    #[test]
    fn exact_matcher_rejects_aliases() {
        let terms = registry();
        let matcher = TermMatcher::exact();
        assert_eq!(matcher.matches("model", "actor:model", &terms), None);
        assert_eq!(
            matcher.matches("Assistant", "actor:model", &terms),
            Some(MatchStrategy::Label)
        );
    }
}
