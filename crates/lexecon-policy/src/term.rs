// term.rs — Policy terms: the nodes of the policy graph.
//
// A term names something policy can talk about: an actor, an action, a
// class of data, a resource, or a context. Term ids are namespaced as
// "<kind>:<name>" by the factory constructors, e.g. "actor:model".
//
// Terms are immutable once built. Identity is the `term_id`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PolicyError;
use crate::fields::{first_str, object_or_empty};

/// What kind of node a term is.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TermType {
    Action,
    Actor,
    DataClass,
    Resource,
    Context,
}

impl TermType {
    /// The wire value used in policy documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            TermType::Action => "action",
            TermType::Actor => "actor",
            TermType::DataClass => "data_class",
            TermType::Resource => "resource",
            TermType::Context => "context",
        }
    }

    /// Namespace prefix the factory constructors put in front of ids.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            TermType::DataClass => "data",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for TermType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TermType {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "action" => Ok(TermType::Action),
            "actor" => Ok(TermType::Actor),
            "data_class" => Ok(TermType::DataClass),
            "resource" => Ok(TermType::Resource),
            "context" => Ok(TermType::Context),
            other => Err(PolicyError::invalid_enum("term_type", other)),
        }
    }
}

/// A node in the policy graph.
///
/// Deserialization goes through [`PolicyTerm::from_value`], so both the
/// canonical (`term_id`, `term_type`, `label`) and abbreviated
/// (`id`, `type`, `name`) field names are accepted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "Value")]
pub struct PolicyTerm {
    pub term_id: String,
    pub term_type: TermType,
    pub label: String,
    pub description: String,
    pub metadata: Map<String, Value>,
}

impl PolicyTerm {
    /// Build a term with an explicit, already-namespaced id.
    pub fn new(term_id: impl Into<String>, term_type: TermType, label: impl Into<String>) -> Self {
        Self {
            term_id: term_id.into(),
            term_type,
            label: label.into(),
            description: String::new(),
            metadata: Map::new(),
        }
    }

    /// Build a term whose id is `<prefix>:<name>` for the given kind.
    pub fn namespaced(term_type: TermType, name: &str, label: impl Into<String>) -> Self {
        Self::new(
            format!("{}:{}", term_type.id_prefix(), name),
            term_type,
            label,
        )
    }

    pub fn action(name: &str, label: impl Into<String>) -> Self {
        Self::namespaced(TermType::Action, name, label)
    }

    pub fn actor(name: &str, label: impl Into<String>) -> Self {
        Self::namespaced(TermType::Actor, name, label)
    }

    /// Data-class ids use the short `data:` prefix.
    pub fn data_class(name: &str, label: impl Into<String>) -> Self {
        Self::namespaced(TermType::DataClass, name, label)
    }

    pub fn resource(name: &str, label: impl Into<String>) -> Self {
        Self::namespaced(TermType::Resource, name, label)
    }

    pub fn context(name: &str, label: impl Into<String>) -> Self {
        Self::namespaced(TermType::Context, name, label)
    }

    /// Set the description and return self (builder pattern).
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add one metadata key and return self.
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Parse a term from a policy-document value.
    ///
    /// Fails with `MissingField` when no id or no type is present and with
    /// `InvalidEnum` when the type is not one of the five kinds.
    pub fn from_value(value: &Value) -> Result<Self, PolicyError> {
        let obj = value
            .as_object()
            .ok_or_else(|| PolicyError::InvalidDocument("term must be an object".to_string()))?;

        let term_id = first_str(obj, &["term_id", "id"])
            .ok_or_else(|| PolicyError::missing("term", "term_id or id"))?;
        let term_type = first_str(obj, &["term_type", "type"])
            .ok_or_else(|| PolicyError::missing("term", "term_type or type"))?
            .parse::<TermType>()?;
        let label = first_str(obj, &["label", "name"]).unwrap_or_default();
        let description = obj
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default();

        Ok(Self {
            term_id: term_id.to_string(),
            term_type,
            label: label.to_string(),
            description: description.to_string(),
            metadata: object_or_empty(obj, "metadata"),
        })
    }
}

impl TryFrom<Value> for PolicyTerm {
    type Error = PolicyError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn factories_namespace_ids() {
        assert_eq!(PolicyTerm::actor("model", "Model").term_id, "actor:model");
        assert_eq!(PolicyTerm::action("read", "Read").term_id, "action:read");
        assert_eq!(PolicyTerm::data_class("pii", "PII").term_id, "data:pii");
        assert_eq!(PolicyTerm::resource("db", "DB").term_id, "resource:db");
        assert_eq!(PolicyTerm::context("prod", "Prod").term_id, "context:prod");
        assert_eq!(
            PolicyTerm::data_class("pii", "PII").term_type,
            TermType::DataClass
        );
    }

    #[test]
    fn parses_canonical_fields() {
        let term = PolicyTerm::from_value(&json!({
            "term_id": "actor:model",
            "term_type": "actor",
            "label": "Model",
            "description": "The assistant",
            "metadata": {"tier": 2}
        }))
        .unwrap();
        assert_eq!(term.term_id, "actor:model");
        assert_eq!(term.term_type, TermType::Actor);
        assert_eq!(term.label, "Model");
        assert_eq!(term.description, "The assistant");
        assert_eq!(term.metadata["tier"], json!(2));
    }

    #[test]
    fn parses_abbreviated_fields() {
        let term = PolicyTerm::from_value(&json!({
            "id": "data:pii",
            "type": "data_class",
            "name": "Personal data"
        }))
        .unwrap();
        assert_eq!(term.term_id, "data:pii");
        assert_eq!(term.term_type, TermType::DataClass);
        assert_eq!(term.label, "Personal data");
        assert!(term.description.is_empty());
        assert!(term.metadata.is_empty());
    }

    #[test]
    fn missing_id_is_rejected() {
        let err = PolicyTerm::from_value(&json!({"type": "actor"})).unwrap_err();
        assert!(matches!(err, PolicyError::MissingField { .. }));
    }

    #[test]
    fn missing_type_is_rejected() {
        let err = PolicyTerm::from_value(&json!({"id": "actor:a"})).unwrap_err();
        match err {
            PolicyError::MissingField { field, .. } => assert!(field.contains("term_type")),
            other => panic!("expected MissingField, got {:?}", other),
        }
    }

    #[test]
    fn unknown_type_is_rejected() {
        let err = PolicyTerm::from_value(&json!({"id": "x:a", "type": "robot"})).unwrap_err();
        match err {
            PolicyError::InvalidEnum { value, .. } => assert_eq!(value, "robot"),
            other => panic!("expected InvalidEnum, got {:?}", other),
        }
    }

    #[test]
    fn serde_round_trip() {
        let term = PolicyTerm::actor("model", "Model")
            .with_description("The assistant")
            .with_metadata("owner", json!("platform"));
        let json = serde_json::to_string(&term).unwrap();
        let restored: PolicyTerm = serde_json::from_str(&json).unwrap();
        assert_eq!(term, restored);
    }

    #[test]
    fn term_type_serializes_as_snake_case() {
        let json = serde_json::to_string(&TermType::DataClass).unwrap();
        assert_eq!(json, "\"data_class\"");
    }
}
