//! Axum HTTP handlers for the Lexecon daemon.
//!
//! A thin adapter: every handler delegates to [`AppContext`] and the
//! ledger. No policy or chain logic lives here.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;

use lexecon_ledger::LedgerEntry;
use lexecon_policy::DecisionRequest;

use crate::context::AppContext;
use crate::error::DaemonError;

/// Build the router with all endpoints.
pub fn build_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/decide", post(handle_decide))
        .route("/ledger/entries", get(handle_entries))
        .route("/ledger/verify", get(handle_verify))
        .route("/ledger/report", get(handle_report))
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

/// GET / -- service info
async fn handle_root() -> impl IntoResponse {
    Json(json!({
        "name": "lexecon",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "GET /health",
            "POST /decide",
            "GET /ledger/entries",
            "GET /ledger/verify",
            "GET /ledger/report",
        ],
    }))
}

/// GET /health
async fn handle_health(State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    let now = Utc::now();
    let uptime = (now - ctx.started_at()).num_seconds().max(0);
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "node_id": ctx.node_id().to_string(),
        "timestamp": now.to_rfc3339(),
        "uptime_seconds": uptime,
    }))
}

/// Response body for POST /decide.
#[derive(Debug, Serialize, Deserialize)]
pub struct DecideResponse {
    pub decision_id: String,
    pub decision: String,
    pub allowed: bool,
    pub reason: String,
    pub timestamp: String,
    pub ledger_entry_id: String,
    pub policy_version_hash: String,
    pub requires_confirmation: bool,
}

/// POST /decide -- evaluate and record
async fn handle_decide(
    State(ctx): State<Arc<AppContext>>,
    Json(request): Json<DecisionRequest>,
) -> Result<Json<DecideResponse>, DaemonError> {
    let record = ctx.decide(&request)?;
    Ok(Json(DecideResponse {
        decision: record.decision.verdict().to_string(),
        allowed: record.decision.allowed,
        reason: record.decision.reason,
        policy_version_hash: record.decision.policy_version_hash,
        requires_confirmation: record.decision.requires_confirmation,
        decision_id: record.decision_id,
        timestamp: record.timestamp,
        ledger_entry_id: record.ledger_entry_id,
    }))
}

#[derive(Debug, Deserialize)]
struct EntriesQuery {
    event_type: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct EntriesResponse {
    entries: Vec<LedgerEntry>,
    /// Length of the whole chain, not of `entries`.
    total: usize,
}

/// GET /ledger/entries?event_type=&limit=
async fn handle_entries(
    State(ctx): State<Arc<AppContext>>,
    Query(query): Query<EntriesQuery>,
) -> Result<Json<EntriesResponse>, DaemonError> {
    let (entries, total) = ctx.ledger().read(|chain| {
        let entries: Vec<LedgerEntry> = chain
            .recent(query.event_type.as_deref(), query.limit)
            .into_iter()
            .cloned()
            .collect();
        (entries, chain.len())
    })?;
    Ok(Json(EntriesResponse { entries, total }))
}

/// GET /ledger/verify
async fn handle_verify(
    State(ctx): State<Arc<AppContext>>,
) -> Result<impl IntoResponse, DaemonError> {
    Ok(Json(ctx.ledger().verify_integrity()?))
}

/// GET /ledger/report
async fn handle_report(
    State(ctx): State<Arc<AppContext>>,
) -> Result<impl IntoResponse, DaemonError> {
    Ok(Json(ctx.ledger().generate_audit_report()?))
}
