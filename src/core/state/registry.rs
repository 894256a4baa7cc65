// src/core/state/registry.rs

//! The process-wide table of live connections.
//!
//! Insert and remove are atomic per key. Broadcasts work on a snapshot of the
//! current values so a slow or failing client never holds a map shard lock,
//! and one failed send never stops delivery to the others.

use crate::connection::Connection;
use crate::core::metrics;
use crate::core::protocol::Message;
use crate::core::session::ConnectionId;
use crate::core::store::Role;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, Arc<Connection>>,
    /// Per-user locks serializing the "kick the old session, bind the new one"
    /// sequence of a login.
    login_locks: DashMap<i64, Arc<AsyncMutex<()>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection. Returns `false` if the id is already present.
    pub fn add(&self, conn: Arc<Connection>) -> bool {
        match self.connections.entry(conn.id().clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(conn);
                true
            }
        }
    }

    pub fn remove(&self, id: &ConnectionId) -> Option<Arc<Connection>> {
        self.connections.remove(id).map(|(_, conn)| conn)
    }

    /// Removes the entry only if it still refers to this exact connection.
    pub fn remove_if_same(&self, conn: &Arc<Connection>) -> bool {
        self.connections
            .remove_if(conn.id(), |_, existing| Arc::ptr_eq(existing, conn))
            .is_some()
    }

    pub fn get(&self, id: &ConnectionId) -> Option<Arc<Connection>> {
        self.connections.get(id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn count(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// The current connections, detached from the map.
    pub fn snapshot(&self) -> Vec<Arc<Connection>> {
        self.connections
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Linear scan for the connection bound to `user_id`.
    pub fn find_by_principal_id(&self, user_id: i64) -> Option<Arc<Connection>> {
        self.connections
            .iter()
            .find(|entry| entry.value().principal_id() == Some(user_id))
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Holds the login lock for `user_id`. While held, no other login can
    /// bind a connection to that user.
    pub async fn lock_principal(&self, user_id: i64) -> OwnedMutexGuard<()> {
        let lock = self
            .login_locks
            .entry(user_id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Delivers `message` to every connection accepted by `filter`, evaluated
    /// once per connection at call time. Returns the number of successful sends.
    pub async fn broadcast_where<F>(&self, message: &Message, filter: F) -> usize
    where
        F: Fn(&Connection) -> bool,
    {
        let targets: Vec<Arc<Connection>> = self
            .snapshot()
            .into_iter()
            .filter(|conn| filter(conn))
            .collect();
        let results = join_all(targets.iter().map(|conn| conn.send_message(message))).await;
        let delivered = results.into_iter().filter(|ok| *ok).count();
        metrics::BROADCAST_DELIVERIES_TOTAL.inc_by(delivered as f64);
        debug!(
            "Broadcast '{}' delivered to {}/{} connections.",
            message.command(),
            delivered,
            targets.len()
        );
        delivered
    }

    pub async fn broadcast_all(&self, message: &Message) -> usize {
        self.broadcast_where(message, |_| true).await
    }

    /// Delivers to connections whose principal has exactly `role`.
    pub async fn broadcast_to_role(&self, role: Role, message: &Message) -> usize {
        self.broadcast_where(message, |conn| {
            conn.principal().is_some_and(|p| p.role() == Some(role))
        })
        .await
    }

    /// Delivers to connections whose principal has any of `roles`.
    pub async fn broadcast_to_roles(&self, roles: &[Role], message: &Message) -> usize {
        self.broadcast_where(message, |conn| {
            conn.principal().is_some_and(|p| p.has_any_role(roles))
        })
        .await
    }

    /// Delivers to every connection with a bound principal.
    pub async fn broadcast_authenticated(&self, message: &Message) -> usize {
        self.broadcast_where(message, Connection::is_authenticated)
            .await
    }

    /// Removes the connection from the table, then closes it.
    pub async fn disconnect(&self, id: &ConnectionId) -> bool {
        match self.remove(id) {
            Some(conn) => {
                conn.close().await;
                true
            }
            None => false,
        }
    }

    /// Disconnects everything, waiting at most `grace` for the sockets to
    /// close. Every connection is out of the table and killed on return
    /// either way. Used at shutdown.
    pub async fn disconnect_all(&self, grace: Duration) -> usize {
        let conns = self.snapshot();
        for conn in &conns {
            self.remove_if_same(conn);
        }
        if tokio::time::timeout(grace, join_all(conns.iter().map(|conn| conn.close())))
            .await
            .is_err()
        {
            warn!(
                "Timed out after {:?} closing {} client(s); their read loops finish the teardown.",
                grace,
                conns.len()
            );
        }
        info!("Disconnected {} client(s).", conns.len());
        conns.len()
    }
}
