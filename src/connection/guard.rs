// src/connection/guard.rs

//! Defines `ConnectionGuard`, an RAII guard for connection resource management.

use super::Connection;
use crate::core::metrics;
use crate::core::state::ServerState;
use std::sync::Arc;
use tracing::debug;

/// An RAII guard to ensure connection resources are always cleaned up when a
/// connection handler's scope is exited, including by panic.
pub struct ConnectionGuard {
    /// A shared reference to the server state.
    pub(crate) state: Arc<ServerState>,
    /// The connection whose read loop owns this guard.
    pub(crate) conn: Arc<Connection>,
}

impl ConnectionGuard {
    /// Creates a new `ConnectionGuard`.
    pub(crate) fn new(state: Arc<ServerState>, conn: Arc<Connection>) -> Self {
        Self { state, conn }
    }
}

impl Drop for ConnectionGuard {
    /// Removes the connection from the registry (only if the entry is still
    /// this connection) and marks it closed.
    fn drop(&mut self) {
        metrics::CONNECTED_CLIENTS.dec();
        debug!(
            "ConnectionGuard dropping, cleaning up resources for client {} ({})",
            self.conn.id(),
            self.conn.addr()
        );

        if !self.state.registry.remove_if_same(&self.conn) {
            debug!(
                "Client {} was not in the registry upon cleanup (already disconnected).",
                self.conn.id()
            );
        }
        self.conn.close_now();
    }
}
