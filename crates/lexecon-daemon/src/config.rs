// config.rs — Project layout and daemon settings.
//
// `ProjectConfig::for_project()` lays out state under `.lexecon/` in the
// project root: the policy document, the ledger file, and daemon.toml.
// `DaemonConfig` is read from daemon.toml; a missing file means defaults.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use lexecon_policy::PolicyMode;
use serde::{Deserialize, Serialize};

use crate::error::DaemonError;

/// Where Lexecon keeps its state for one project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectConfig {
    /// Root directory of the project.
    pub project_root: PathBuf,

    /// Policy document (`.json`, `.yaml` or `.yml`).
    pub policy_path: PathBuf,

    /// Append-only JSONL ledger.
    pub ledger_path: PathBuf,

    /// Daemon settings file.
    pub daemon_config: PathBuf,
}

impl ProjectConfig {
    /// Create a config with the standard `.lexecon/` layout for a project.
    pub fn for_project(project_root: impl AsRef<Path>) -> Self {
        let root = project_root.as_ref().to_path_buf();
        let dir = root.join(".lexecon");
        Self {
            project_root: root,
            policy_path: dir.join("policy.json"),
            ledger_path: dir.join("ledger.jsonl"),
            daemon_config: dir.join("daemon.toml"),
        }
    }

    /// Apply path overrides from daemon settings. Relative overrides are
    /// resolved against the project root.
    pub fn with_overrides(mut self, daemon: &DaemonConfig) -> Self {
        if let Some(path) = &daemon.policy_path {
            self.policy_path = self.project_root.join(path);
        }
        if let Some(path) = &daemon.ledger_path {
            self.ledger_path = self.project_root.join(path);
        }
        self
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8420))
}

fn default_persist() -> bool {
    true
}

/// Settings read from `.lexecon/daemon.toml`.
///
/// ```toml
/// bind = "0.0.0.0:8420"
/// mode = "paranoid"
/// policy_path = "policies/prod.yaml"
/// persist = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DaemonConfig {
    /// Address the HTTP API listens on.
    pub bind: SocketAddr,

    /// Evaluation mode used when no policy document exists.
    pub mode: PolicyMode,

    /// Override for the policy document path.
    pub policy_path: Option<PathBuf>,

    /// Override for the ledger path.
    pub ledger_path: Option<PathBuf>,

    /// Write ledger entries to disk. When false the ledger lives in memory.
    #[serde(default = "default_persist")]
    pub persist: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            mode: PolicyMode::default(),
            policy_path: None,
            ledger_path: None,
            persist: default_persist(),
        }
    }
}

impl DaemonConfig {
    /// Load settings from a TOML file. A missing file yields defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DaemonError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|source| DaemonError::Config {
            path: path.to_path_buf(),
            reason: source.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| DaemonError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}
