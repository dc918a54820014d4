//! Session registry: the binding between live connections and users.
//!
//! Each WebSocket connection that passes the handshake gets a [`ConnId`] and
//! an entry mapping it to the authenticated [`UserId`] and the sender half
//! of its outbound message channel. The registry also maintains the reverse
//! addressing table (user id → set of connection ids) that the notification
//! router uses for addressed delivery, so business addressing never leans on
//! transport-level grouping.
//!
//! The registry is constructed per server instance and injected into
//! handlers; tests can run any number of independent instances.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::ws::Message;
use taskdeck_proto::task::UserId;
use tokio::sync::{RwLock, mpsc};

/// Identifies one live connection for the lifetime of its socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(u64);

impl std::fmt::Display for ConnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A registered connection: its owner and its outbound channel.
struct Connection {
    user: UserId,
    sender: mpsc::UnboundedSender<Message>,
}

#[derive(Default)]
struct Inner {
    connections: HashMap<ConnId, Connection>,
    by_user: HashMap<UserId, HashSet<ConnId>>,
}

/// Registry of live, authenticated connections.
pub struct SessionRegistry {
    next_id: AtomicU64,
    inner: RwLock<Inner>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Allocates a fresh connection identifier.
    pub fn next_conn_id(&self) -> ConnId {
        ConnId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Registers a connection under the user it authenticated as.
    ///
    /// The binding is immutable for the connection's lifetime; there is no
    /// re-registration path.
    pub async fn register(
        &self,
        conn: ConnId,
        user: UserId,
        sender: mpsc::UnboundedSender<Message>,
    ) {
        let mut inner = self.inner.write().await;
        inner.by_user.entry(user.clone()).or_default().insert(conn);
        inner.connections.insert(conn, Connection { user, sender });
    }

    /// Removes a connection, returning the user it was bound to.
    pub async fn unregister(&self, conn: ConnId) -> Option<UserId> {
        let mut inner = self.inner.write().await;
        let connection = inner.connections.remove(&conn)?;
        if let Some(conns) = inner.by_user.get_mut(&connection.user) {
            conns.remove(&conn);
            if conns.is_empty() {
                inner.by_user.remove(&connection.user);
            }
        }
        Some(connection.user)
    }

    /// Returns the outbound senders for every connection bound to a user.
    ///
    /// Empty when the user has no live connections.
    pub async fn senders_for_user(&self, user: &UserId) -> Vec<mpsc::UnboundedSender<Message>> {
        let inner = self.inner.read().await;
        let Some(conns) = inner.by_user.get(user) else {
            return Vec::new();
        };
        conns
            .iter()
            .filter_map(|c| inner.connections.get(c).map(|conn| conn.sender.clone()))
            .collect()
    }

    /// Returns the outbound senders for all connections.
    pub async fn all_senders(&self) -> Vec<mpsc::UnboundedSender<Message>> {
        let inner = self.inner.read().await;
        inner.connections.values().map(|c| c.sender.clone()).collect()
    }

    /// Returns the outbound senders for all connections except one.
    pub async fn senders_except(&self, skip: ConnId) -> Vec<mpsc::UnboundedSender<Message>> {
        let inner = self.inner.read().await;
        inner
            .connections
            .iter()
            .filter(|(id, _)| **id != skip)
            .map(|(_, c)| c.sender.clone())
            .collect()
    }

    /// Returns the number of live connections.
    pub async fn connection_count(&self) -> usize {
        let inner = self.inner.read().await;
        inner.connections.len()
    }

    /// Drops every registered connection. Part of the explicit lifecycle;
    /// used on shutdown and between test instances.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.connections.clear();
        inner.by_user.clear();
    }
}
