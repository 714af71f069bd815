// error.rs — Error types for the daemon.

use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Errors that can occur while starting or serving the daemon.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// daemon.toml could not be read or parsed.
    #[error("invalid daemon config at {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    /// The policy document failed to load.
    #[error("policy error: {0}")]
    Policy(#[from] lexecon_policy::PolicyError),

    /// The ledger could not be opened or written.
    #[error("ledger error: {0}")]
    Ledger(#[from] lexecon_ledger::LedgerError),

    /// The policy engine's lock was poisoned by a panicking writer.
    #[error("policy lock poisoned: {0}")]
    LockPoisoned(String),
}

impl IntoResponse for DaemonError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "request failed");
        let body = serde_json::json!({ "error": self.to_string() });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
