//! # lexecon-daemon
//!
//! HTTP adapter over the Lexecon policy evaluator and audit ledger.
//!
//! [`AppContext`] is built once at startup from the project's `.lexecon/`
//! directory and shared with every handler as axum state. `POST /decide`
//! evaluates a request and records the outcome in the ledger; the
//! `/ledger/*` endpoints expose entries, integrity and audit reports.

pub mod api;
pub mod config;
pub mod context;
pub mod error;

use std::future::Future;
use std::path::Path;

use anyhow::Context as _;

pub use api::build_router;
pub use config::{DaemonConfig, ProjectConfig};
pub use context::{AppContext, DecisionRecord, DECISION_EVENT};
pub use error::DaemonError;

/// Load config for a project, build the context, and serve until the
/// process receives Ctrl-C.
pub async fn serve(project_root: &Path) -> anyhow::Result<()> {
    let base = ProjectConfig::for_project(project_root);
    let daemon = DaemonConfig::load(&base.daemon_config)?;
    let project = base.with_overrides(&daemon);

    tracing::info!("Project root: {}", project.project_root.display());
    let ctx = AppContext::from_project(&project, &daemon)?;
    let app = build_router(ctx);

    let listener = tokio::net::TcpListener::bind(daemon.bind)
        .await
        .with_context(|| format!("binding {}", daemon.bind))?;
    tracing::info!(bind = %daemon.bind, "Lexecon daemon listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown(tokio::signal::ctrl_c()))
        .await?;

    tracing::info!("Lexecon daemon shutting down");
    Ok(())
}

/// Resolves once `signal` fires. If the signal handler could not be
/// installed the error is logged and this never resolves, so the server
/// keeps running until the process is killed.
async fn wait_for_shutdown<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        tracing::error!(error = %e, "failed to install shutdown signal handler");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::time::Duration;

    #[tokio::test]
    async fn shutdown_waits_for_signal() {
        let fired = tokio::time::timeout(
            Duration::from_millis(100),
            wait_for_shutdown(async { Ok(()) }),
        )
        .await;
        assert!(fired.is_ok());
    }

    #[tokio::test]
    async fn failed_signal_handler_does_not_stop_the_server() {
        let signal = async { Err(io::Error::new(io::ErrorKind::Other, "no handler")) };
        let fired = tokio::time::timeout(Duration::from_millis(100), wait_for_shutdown(signal)).await;
        assert!(fired.is_err());
    }
}
