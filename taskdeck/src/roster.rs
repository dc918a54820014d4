//! Online-members view derived from presence events.

use std::collections::{BTreeSet, HashMap};

use taskdeck_proto::event::ServerEvent;
use taskdeck_proto::task::{Timestamp, UserId};

/// Mirror of the server's presence view for one client.
#[derive(Debug, Default)]
pub struct Roster {
    online: BTreeSet<UserId>,
    last_active: HashMap<UserId, Timestamp>,
}

impl Roster {
    /// Creates an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a presence event; other events are ignored.
    pub fn apply_event(&mut self, event: &ServerEvent) {
        match event {
            ServerEvent::OnlineMembers { users } => {
                self.online = users.iter().cloned().collect();
            }
            ServerEvent::MemberConnected { user } => {
                self.online.insert(user.clone());
            }
            ServerEvent::MemberDisconnected { user, last_active } => {
                self.online.remove(user);
                self.last_active.insert(user.clone(), *last_active);
            }
            _ => {}
        }
    }

    /// Whether a user is currently online.
    #[must_use]
    pub fn is_online(&self, user: &UserId) -> bool {
        self.online.contains(user)
    }

    /// The online users, sorted.
    #[must_use]
    pub fn online_users(&self) -> Vec<UserId> {
        self.online.iter().cloned().collect()
    }

    /// When a user was last seen going offline, if known.
    #[must_use]
    pub fn last_active(&self, user: &UserId) -> Option<Timestamp> {
        self.last_active.get(user).copied()
    }
}
