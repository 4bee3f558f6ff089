//! Route table for the WebSocket endpoint and operational surface.

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::routing::get;
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::connection;
use crate::state::AppState;

/// Build the router with all routes registered.
pub fn build(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(connection::upgrade))
        .route("/health", get(health))
        .route("/stats", get(stats))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

/// Observability counters for the local instance.
#[derive(Debug, Serialize)]
struct Stats {
    users: usize,
    connections: usize,
}

async fn stats(State(state): State<AppState>) -> Json<Stats> {
    Json(Stats {
        users: state.registry.count_users(),
        connections: state.registry.count_connections(),
    })
}
