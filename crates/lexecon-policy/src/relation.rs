// relation.rs — Policy relations: the directed edges of the policy graph.
//
// A relation connects a source (usually an actor) to a target (usually an
// action) with one of five meanings. Only `permits` and `forbids` feed the
// decision; the other kinds are carried and hashed but not evaluated.
//
// Relations are stored as an ordered list, not a set. Two relations with the
// same (type, source, target) share an id but are both kept and both counted.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PolicyError;
use crate::fields::{first_str, object_or_empty};

/// Metadata key holding a data-class constraint on the relation.
pub const OBJECT_KEY: &str = "object";

/// Metadata key holding the human-readable reason surfaced in decisions.
pub const JUSTIFICATION_KEY: &str = "justification";

/// Document fields folded into `metadata` rather than kept as attributes.
const FOLDED_FIELDS: &[&str] = &[OBJECT_KEY, JUSTIFICATION_KEY, "condition"];

/// The meaning of a relation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    Permits,
    Forbids,
    Requires,
    Implies,
    Conflicts,
}

impl RelationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::Permits => "permits",
            RelationType::Forbids => "forbids",
            RelationType::Requires => "requires",
            RelationType::Implies => "implies",
            RelationType::Conflicts => "conflicts",
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationType {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "permits" => Ok(RelationType::Permits),
            "forbids" => Ok(RelationType::Forbids),
            "requires" => Ok(RelationType::Requires),
            "implies" => Ok(RelationType::Implies),
            "conflicts" => Ok(RelationType::Conflicts),
            other => Err(PolicyError::invalid_enum("relation_type", other)),
        }
    }
}

/// A typed, directed edge between two term ids.
///
/// `source` and `target` may name terms that are not registered in the
/// graph; matching then falls back to raw string comparison.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "Value")]
pub struct PolicyRelation {
    pub relation_id: String,
    pub relation_type: RelationType,
    pub source: String,
    pub target: String,
    pub conditions: Vec<String>,
    pub metadata: Map<String, Value>,
}

impl PolicyRelation {
    /// Build a relation with a derived `"<type>:<source>:<target>"` id.
    ///
    /// If exactly one of `source`/`target` is empty it takes the other's
    /// value, so single-party rules become self-loops.
    pub fn new(
        relation_type: RelationType,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        let (source, target) = collapse_endpoints(source.into(), target.into());
        Self {
            relation_id: derive_id(relation_type.as_str(), &source, &target),
            relation_type,
            source,
            target,
            conditions: Vec::new(),
            metadata: Map::new(),
        }
    }

    pub fn permits(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(RelationType::Permits, source, target)
    }

    pub fn forbids(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(RelationType::Forbids, source, target)
    }

    pub fn requires(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(RelationType::Requires, source, target)
    }

    pub fn implies(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(RelationType::Implies, source, target)
    }

    pub fn conflicts(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(RelationType::Conflicts, source, target)
    }

    /// Replace the condition list and return self.
    pub fn with_conditions<I, S>(mut self, conditions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.conditions = conditions.into_iter().map(Into::into).collect();
        self
    }

    /// Constrain the relation to requests carrying a matching data class.
    pub fn with_object(self, object: impl Into<String>) -> Self {
        self.with_metadata(OBJECT_KEY, Value::String(object.into()))
    }

    /// Attach the reason reported when this relation decides a request.
    pub fn with_justification(self, justification: impl Into<String>) -> Self {
        self.with_metadata(JUSTIFICATION_KEY, Value::String(justification.into()))
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// The data-class constraint, if one is set.
    pub fn object(&self) -> Option<&Value> {
        self.metadata.get(OBJECT_KEY)
    }

    /// The justification string, if one is set and is a string.
    pub fn justification(&self) -> Option<&str> {
        self.metadata.get(JUSTIFICATION_KEY).and_then(Value::as_str)
    }

    /// Parse a relation from a policy-document value.
    ///
    /// Accepts `relation_type`/`type`, `source`/`subject` and
    /// `target`/`action`. Top-level `object`, `justification` and `condition`
    /// fields are folded into `metadata`, overriding keys of the same name.
    pub fn from_value(value: &Value) -> Result<Self, PolicyError> {
        let obj = value.as_object().ok_or_else(|| {
            PolicyError::InvalidDocument("relation must be an object".to_string())
        })?;

        let type_value = first_str(obj, &["relation_type", "type"])
            .ok_or_else(|| PolicyError::missing("relation", "relation_type or type"))?;
        let relation_type = type_value.parse::<RelationType>()?;

        let source = first_str(obj, &["source", "subject"]).unwrap_or_default();
        let target = first_str(obj, &["target", "action"]).unwrap_or_default();
        if source.is_empty() && target.is_empty() {
            return Err(PolicyError::missing(
                "relation",
                "source/target or subject/action",
            ));
        }
        let (source, target) = collapse_endpoints(source.to_string(), target.to_string());

        let mut metadata = object_or_empty(obj, "metadata");
        for field in FOLDED_FIELDS {
            if let Some(v) = obj.get(*field) {
                metadata.insert((*field).to_string(), v.clone());
            }
        }

        let relation_id = match first_str(obj, &["relation_id"]) {
            Some(id) => id.to_string(),
            None => derive_id(type_value, &source, &target),
        };

        let conditions = obj
            .get("conditions")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            relation_id,
            relation_type,
            source,
            target,
            conditions,
            metadata,
        })
    }
}

impl TryFrom<Value> for PolicyRelation {
    type Error = PolicyError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(&value)
    }
}

fn derive_id(relation_type: &str, source: &str, target: &str) -> String {
    format!("{}:{}:{}", relation_type, source, target)
}

fn collapse_endpoints(source: String, target: String) -> (String, String) {
    match (source.is_empty(), target.is_empty()) {
        (true, false) => (target.clone(), target),
        (false, true) => (source.clone(), source),
        _ => (source, target),
    }
}
