// error.rs — Error types for the policy subsystem.
//
// Deserialization failures are local to one term or relation. A full
// document load wraps the first failure in `MalformedPolicy` so callers
// can tell which entry broke the load.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while building or loading a policy graph.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// A required key was absent (under every accepted alias).
    #[error("{kind} is missing required field '{field}'")]
    MissingField { kind: &'static str, field: String },

    /// A mode, term type, or relation type string is not recognized.
    #[error("unrecognized {kind} '{value}'")]
    InvalidEnum { kind: &'static str, value: String },

    /// A term or relation inside a policy document failed to parse.
    /// The graph is left cleared when this is returned from a load.
    #[error("malformed policy: {section}[{index}]: {source}")]
    MalformedPolicy {
        section: &'static str,
        index: usize,
        source: Box<PolicyError>,
    },

    /// The document does not have the expected shape.
    #[error("invalid policy document: {0}")]
    InvalidDocument(String),

    /// Failed to read a policy file.
    #[error("failed to read policy file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The policy file is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The policy file is not valid YAML.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl PolicyError {
    pub(crate) fn missing(kind: &'static str, field: impl Into<String>) -> Self {
        PolicyError::MissingField {
            kind,
            field: field.into(),
        }
    }

    pub(crate) fn invalid_enum(kind: &'static str, value: impl Into<String>) -> Self {
        PolicyError::InvalidEnum {
            kind,
            value: value.into(),
        }
    }
}
