// graph.rs — The policy graph: terms, relations, and an evaluation mode.
//
// The graph is content-addressed. Its hash is SHA-256 over canonical JSON
// (sorted keys, compact separators, ASCII escapes) of {mode, terms,
// relations}, using the same encoder as the ledger. Terms are
// emitted sorted by id, so the order of `add_term` calls does not change
// the hash. Relations are emitted in insertion order, so it does.
//
// The hash is memoized and the memo is dropped by every mutating call.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};

use lexecon_ledger::hasher;

use crate::error::PolicyError;
use crate::relation::PolicyRelation;
use crate::term::PolicyTerm;

/// How the evaluator turns matched relations into a decision.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PolicyMode {
    /// Allow unless explicitly forbidden.
    Permissive,
    /// Deny unless explicitly permitted and not forbidden.
    #[default]
    Strict,
    /// Same decision rule as Strict; high-risk allows are flagged for
    /// human confirmation.
    Paranoid,
}

impl PolicyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyMode::Permissive => "permissive",
            PolicyMode::Strict => "strict",
            PolicyMode::Paranoid => "paranoid",
        }
    }
}

impl fmt::Display for PolicyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyMode {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "permissive" => Ok(PolicyMode::Permissive),
            "strict" => Ok(PolicyMode::Strict),
            "paranoid" => Ok(PolicyMode::Paranoid),
            other => Err(PolicyError::invalid_enum("mode", other)),
        }
    }
}

/// Terms keyed by id plus an ordered relation list.
#[derive(Debug, Clone, Default)]
pub struct PolicyGraph {
    mode: PolicyMode,
    terms: BTreeMap<String, PolicyTerm>,
    relations: Vec<PolicyRelation>,
    cached_hash: OnceLock<String>,
}

impl PolicyGraph {
    /// Create an empty graph.
    pub fn new(mode: PolicyMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> PolicyMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: PolicyMode) {
        self.mode = mode;
        self.invalidate();
    }

    pub fn terms(&self) -> &BTreeMap<String, PolicyTerm> {
        &self.terms
    }

    pub fn term(&self, term_id: &str) -> Option<&PolicyTerm> {
        self.terms.get(term_id)
    }

    pub fn relations(&self) -> &[PolicyRelation] {
        &self.relations
    }

    /// Insert a term, replacing any term with the same id.
    pub fn add_term(&mut self, term: PolicyTerm) {
        tracing::debug!(term_id = %term.term_id, term_type = %term.term_type, "adding term");
        self.terms.insert(term.term_id.clone(), term);
        self.invalidate();
    }

    /// Append a relation. No dedup and no check that its endpoints exist.
    pub fn add_relation(&mut self, relation: PolicyRelation) {
        tracing::debug!(relation_id = %relation.relation_id, "adding relation");
        self.relations.push(relation);
        self.invalidate();
    }

    /// Replace all terms and relations with those in `document`.
    ///
    /// This is a full replace, not a merge. The document's `mode` is not
    /// applied here (see [`PolicyGraph::from_document`]). Every entry is
    /// parsed before anything is installed; on the first bad entry the
    /// graph is left cleared and the error names the failing entry.
    pub fn load_policy(&mut self, document: &Value) -> Result<(), PolicyError> {
        self.terms.clear();
        self.relations.clear();
        self.invalidate();

        let obj = document.as_object().ok_or_else(|| {
            PolicyError::InvalidDocument("policy document must be an object".to_string())
        })?;

        let terms = section(obj, "terms")?
            .iter()
            .enumerate()
            .map(|(index, value)| {
                PolicyTerm::from_value(value).map_err(|e| malformed("terms", index, e))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let relations = section(obj, "relations")?
            .iter()
            .enumerate()
            .map(|(index, value)| {
                PolicyRelation::from_value(value).map_err(|e| malformed("relations", index, e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        for term in terms {
            self.terms.insert(term.term_id.clone(), term);
        }
        self.relations = relations;

        tracing::info!(
            terms = self.terms.len(),
            relations = self.relations.len(),
            "policy loaded"
        );
        Ok(())
    }

    /// Build a graph from a full document, taking `mode` from it
    /// (defaulting to strict).
    pub fn from_document(document: &Value) -> Result<Self, PolicyError> {
        let mode = match document.get("mode").and_then(Value::as_str) {
            Some(mode) => mode.parse()?,
            None => PolicyMode::default(),
        };
        let mut graph = Self::new(mode);
        graph.load_policy(document)?;
        Ok(graph)
    }

    /// Read a policy document from a `.json`, `.yaml` or `.yml` file.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document: Value = match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            _ => serde_json::from_str(&content)?,
        };
        Self::from_document(&document)
    }

    /// The document form: mode, terms sorted by id, relations in order.
    pub fn to_document(&self) -> Value {
        json!({
            "mode": self.mode,
            "terms": self.terms.values().collect::<Vec<_>>(),
            "relations": self.relations,
        })
    }

    /// SHA-256 of the canonical document, hex encoded. Memoized.
    pub fn policy_hash(&self) -> &str {
        self.cached_hash
            .get_or_init(|| hasher::hash_canonical(&self.to_document()))
    }

    fn invalidate(&mut self) {
        self.cached_hash = OnceLock::new();
    }
}

impl PartialEq for PolicyGraph {
    fn eq(&self, other: &Self) -> bool {
        self.mode == other.mode && self.terms == other.terms && self.relations == other.relations
    }
}

impl Serialize for PolicyGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_document().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PolicyGraph {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let document = Value::deserialize(deserializer)?;
        Self::from_document(&document).map_err(D::Error::custom)
    }
}

fn section<'a>(
    obj: &'a serde_json::Map<String, Value>,
    key: &str,
) -> Result<&'a [Value], PolicyError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(PolicyError::InvalidDocument(format!(
            "'{}' must be an array",
            key
        ))),
    }
}

fn malformed(section: &'static str, index: usize, source: PolicyError) -> PolicyError {
    PolicyError::MalformedPolicy {
        section,
        index,
        source: Box::new(source),
    }
}
