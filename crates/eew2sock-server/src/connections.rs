//! Live connection tracking.
//!
//! Every accepted WebSocket registers itself in the [`ConnectionSet`] and
//! holds the returned [`ConnectionGuard`] for as long as its handler runs.
//! Dropping the guard removes the entry, so a handler that returns for any
//! reason (close frame, socket error, task abort) releases its slot.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

/// Identifier assigned to each accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Create a new random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The set of currently connected WebSocket peers.
#[derive(Debug, Default)]
pub struct ConnectionSet {
    live: Mutex<BTreeMap<ConnectionId, SocketAddr>>,
}

impl ConnectionSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection and return the guard that removes it on drop.
    pub fn register(self: &Arc<Self>, peer: SocketAddr) -> ConnectionGuard {
        let id = ConnectionId::new();
        self.lock().insert(id, peer);
        ConnectionGuard {
            id,
            set: Arc::clone(self),
        }
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no connections are live.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn remove(&self, id: ConnectionId) {
        self.lock().remove(&id);
    }

    // The map stays valid even if a holder panicked mid-operation.
    fn lock(&self) -> MutexGuard<'_, BTreeMap<ConnectionId, SocketAddr>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Scoped membership in a [`ConnectionSet`].
#[derive(Debug)]
pub struct ConnectionGuard {
    id: ConnectionId,
    set: Arc<ConnectionSet>,
}

impl ConnectionGuard {
    /// The identifier of this connection.
    pub const fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.set.remove(self.id);
    }
}
