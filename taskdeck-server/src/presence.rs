//! Presence tracker: per-user live-connection counts.
//!
//! A user is online iff it has at least one live connection; the count entry
//! is removed outright when it reaches zero, and a separate last-seen table
//! records the disconnection timestamp carried by the offline broadcast.
//!
//! Transitions and the broadcasts they trigger run under one mutex, so the
//! online/offline event order for any single user matches the order its
//! connections came and went. Lock order is presence before sessions; sends
//! are non-blocking channel writes.

use std::collections::HashMap;

use taskdeck_proto::event::ServerEvent;
use taskdeck_proto::task::{Timestamp, UserId};
use tokio::sync::Mutex;

use crate::broadcast;
use crate::sessions::{ConnId, SessionRegistry};

#[derive(Default)]
struct PresenceInner {
    counts: HashMap<UserId, usize>,
    last_seen: HashMap<UserId, Timestamp>,
}

/// Tracks which users are online in this server process.
pub struct PresenceTracker {
    inner: Mutex<PresenceInner>,
}

impl Default for PresenceTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PresenceTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(PresenceInner::default()),
        }
    }

    /// Records a new live connection for a user.
    ///
    /// On the user's 0→1 transition, broadcasts [`ServerEvent::MemberConnected`]
    /// to every connection except the newly arrived one. Returns the online
    /// snapshot as it stood when the connection arrived, i.e. the members the new
    /// client could not have seen a broadcast for. A first client therefore
    /// receives an empty snapshot.
    pub async fn connect(
        &self,
        sessions: &SessionRegistry,
        conn: ConnId,
        user: &UserId,
    ) -> Vec<UserId> {
        let mut inner = self.inner.lock().await;
        let mut snapshot: Vec<UserId> = inner.counts.keys().cloned().collect();
        snapshot.sort();

        let count = inner.counts.entry(user.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            tracing::info!(user = %user, "user online");
            broadcast::broadcast_except(
                sessions,
                conn,
                &ServerEvent::MemberConnected { user: user.clone() },
            )
            .await;
        }
        snapshot
    }

    /// Records that one of a user's connections closed.
    ///
    /// On the 1→0 transition, removes the count entry, records the
    /// disconnection timestamp, and broadcasts
    /// [`ServerEvent::MemberDisconnected`] to all remaining connections.
    /// Returns the recorded timestamp when the user went offline, `None`
    /// while other connections keep it online. Disconnecting an untracked
    /// user is a logged no-op; the count never goes negative.
    pub async fn disconnect(&self, sessions: &SessionRegistry, user: &UserId) -> Option<Timestamp> {
        let mut inner = self.inner.lock().await;
        let Some(count) = inner.counts.get_mut(user) else {
            tracing::warn!(user = %user, "disconnect for untracked user");
            return None;
        };
        *count -= 1;
        if *count > 0 {
            return None;
        }
        inner.counts.remove(user);
        let went_offline = Timestamp::now();
        inner.last_seen.insert(user.clone(), went_offline);
        tracing::info!(user = %user, "user offline");
        broadcast::broadcast_all(
            sessions,
            &ServerEvent::MemberDisconnected {
                user: user.clone(),
                last_active: went_offline,
            },
        )
        .await;
        Some(went_offline)
    }

    /// Returns whether a user currently has any live connection.
    pub async fn is_online(&self, user: &UserId) -> bool {
        let inner = self.inner.lock().await;
        inner.counts.contains_key(user)
    }

    /// Returns the sorted set of online users.
    pub async fn online_users(&self) -> Vec<UserId> {
        let inner = self.inner.lock().await;
        let mut users: Vec<UserId> = inner.counts.keys().cloned().collect();
        users.sort();
        users
    }

    /// Returns when a user last went offline, if it ever has.
    pub async fn last_seen(&self, user: &UserId) -> Option<Timestamp> {
        let inner = self.inner.lock().await;
        inner.last_seen.get(user).copied()
    }

    /// Forgets all presence state. Part of the explicit lifecycle.
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.counts.clear();
        inner.last_seen.clear();
    }
}
