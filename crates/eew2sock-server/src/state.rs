//! Shared application state for the WebSocket listener.
//!
//! [`AppState`] is wrapped in [`Arc`] and injected into every handler via
//! Axum's `State` extractor. It holds the event registry that handlers
//! snapshot and the live connection set.

use std::sync::Arc;

use eew2sock_core::registry::EventRegistry;

use crate::connections::ConnectionSet;

/// Shared state for the Axum application.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The shared EEW record registry (read-only from handlers).
    pub registry: Arc<EventRegistry>,
    /// Connections currently being served.
    pub connections: Arc<ConnectionSet>,
}

impl AppState {
    /// Create application state serving `registry`.
    pub fn new(registry: Arc<EventRegistry>) -> Self {
        Self {
            registry,
            connections: Arc::new(ConnectionSet::new()),
        }
    }
}
