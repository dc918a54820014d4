//! Push events fanned out by the server over the WebSocket channel.
//!
//! The event set is a closed tagged union: receivers match on the variant
//! and drop anything that fails to decode rather than trusting shape at
//! runtime. Task events always carry the complete post-mutation entity
//! (deletion carries only the id) so clients can apply them as idempotent
//! upserts in any arrival order.

use serde::{Deserialize, Serialize};

use crate::task::{Comment, Task, TaskId, Timestamp, UserId};

/// Events published by the server push channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerEvent {
    /// Snapshot of all currently online users, sent once to a newly
    /// connected client right after its handshake.
    OnlineMembers {
        /// Users with at least one live connection.
        users: Vec<UserId>,
    },

    /// A user came online (first live connection). Broadcast to all
    /// clients except the one that triggered the transition.
    MemberConnected {
        /// The user who came online.
        user: UserId,
    },

    /// A user went offline (last live connection closed). Broadcast to
    /// all clients.
    MemberDisconnected {
        /// The user who went offline.
        user: UserId,
        /// When the last connection closed.
        last_active: Timestamp,
    },

    /// A task was created. Broadcast to all clients.
    TaskCreated {
        /// The full task as created.
        task: Task,
    },

    /// A task was mutated. Broadcast to all clients.
    TaskUpdated {
        /// The full post-mutation task.
        task: Task,
    },

    /// A task was deleted. Broadcast to all clients.
    TaskDeleted {
        /// Identifier of the removed task.
        task_id: TaskId,
    },

    /// A comment was appended to a task. Broadcast to all clients.
    CommentAdded {
        /// The task the comment belongs to.
        task_id: TaskId,
        /// The appended comment.
        comment: Comment,
    },

    /// A targeted notification, delivered only to the connections of the
    /// users it addresses. Best-effort, at most once, never persisted.
    Notification(Notification),
}

/// Why a notification was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// The target was assigned a task.
    Assigned,
    /// A task relevant to the target changed.
    Updated,
    /// A task the target created was completed.
    Completed,
    /// Someone commented on a task the target creates or owns.
    Commented,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Assigned => write!(f, "assigned"),
            Self::Updated => write!(f, "updated"),
            Self::Completed => write!(f, "completed"),
            Self::Commented => write!(f, "commented"),
        }
    }
}

/// A targeted, transient notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// What happened.
    pub kind: NotificationKind,
    /// Human-readable summary.
    pub message: String,
    /// The task the notification refers to.
    pub task_id: TaskId,
}
