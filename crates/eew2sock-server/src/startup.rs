//! Listener startup helper for embedding in the bridge binary.
//!
//! Provides [`spawn_listener`] which binds the configured port eagerly and
//! then runs the accept loop on a background Tokio task.
//!
//! # Usage
//!
//! ```rust,ignore
//! use eew2sock_server::startup::spawn_listener;
//! use eew2sock_server::state::AppState;
//! use std::sync::Arc;
//!
//! let state = Arc::new(AppState::new(registry));
//! let listener = spawn_listener(&config.server, state).await?;
//! // Connections are now being accepted on listener.addr.
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use eew2sock_core::config::ListenerConfig;
use tokio::task::JoinHandle;

use crate::server::{self, ServerError};
use crate::state::AppState;

/// Errors that can occur when spawning the listener.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind or start.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// A listener running on a background task.
#[derive(Debug)]
pub struct RunningListener {
    /// The bound local address (useful when the configured port is 0).
    pub addr: SocketAddr,
    /// Handle to the accept loop task.
    pub handle: JoinHandle<()>,
}

/// Bind the listener and spawn its accept loop.
///
/// The accept loop runs until the Tokio runtime is shut down or the task is
/// aborted.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the port cannot be bound. The bind
/// happens before the task is spawned, so the caller sees the failure.
pub async fn spawn_listener(
    config: &ListenerConfig,
    state: Arc<AppState>,
) -> Result<RunningListener, StartupError> {
    let listener = server::bind(config).await?;
    let addr = listener
        .local_addr()
        .map_err(|e| ServerError::Bind(format!("listener address unavailable: {e}")))?;

    let handle = tokio::spawn(async move {
        if let Err(e) = server::serve(listener, state).await {
            tracing::error!(error = %e, "WebSocket listener exited with error");
        }
    });

    tracing::info!(%addr, "WebSocket listener spawned on background task");

    Ok(RunningListener { addr, handle })
}
