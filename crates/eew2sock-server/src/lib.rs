//! WebSocket listener for the EEW-to-WebSocket bridge.
//!
//! This crate provides an Axum server that accepts `WebSocket` connections
//! and runs one handler task per connection. Handlers answer each inbound
//! text frame with a binary snapshot of the shared
//! [`EventRegistry`](eew2sock_core::registry::EventRegistry); a frame
//! starting with `Hello` is a handshake and gets no reply.
//!
//! # Architecture
//!
//! The server is pull-only: it never sends a packet unless a client asked
//! for one, so client polling cadence is independent of how often events
//! arrive or expire. Live connections are tracked in a
//! [`ConnectionSet`](connections::ConnectionSet) and released by guard
//! when a handler exits.

pub mod connections;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::ServerError;
pub use startup::{spawn_listener, RunningListener, StartupError};
pub use state::AppState;
