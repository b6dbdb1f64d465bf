//! Axum router construction for the WebSocket listener.
//!
//! Clients connect to the bare host and port, so the upgrade handler is
//! mounted on `/` and on every other path.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the listener.
///
/// The router includes:
/// - `GET /` -- `WebSocket` snapshot endpoint
/// - `GET /{*path}` -- the same endpoint under any path
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(ws::ws_events))
        .route("/{*path}", get(ws::ws_events))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
