//! Router assembly
//!
//! `/ws` is the telemetry endpoint. The two small JSON routes are
//! process introspection, not a query API. Entity queries live in a
//! separate service behind the same store.
use axum::{extract::State, response::Json, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::webserver::state::AppState;

pub mod ws;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(ws::routes())
        .route("/api/health", get(health))
        .route("/api/status", get(status))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Liveness probe
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Hub introspection: connection count, counters, uptime
async fn status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let metrics = state.hub.metrics().snapshot();
    Json(serde_json::json!({
        "activeConnections": state.hub.active_connections().await,
        "uptimeSeconds": state.uptime_seconds(),
        "metrics": metrics,
    }))
}
