//! Notification router: targeted delivery for mutations a user cares about.
//!
//! A separate channel from the broadcast: target sets are computed per
//! mutation kind and delivery goes only to the connections bound to those
//! users via the session registry's addressing table. Offline targets are
//! skipped silently; notifications are at-most-once, best-effort, and never
//! persisted or redelivered.

use axum::extract::ws::Message;
use taskdeck_proto::event::{Notification, NotificationKind, ServerEvent};
use taskdeck_proto::task::{Task, UserId};
use taskdeck_proto::wire::{self, ServerMessage};

use crate::sessions::SessionRegistry;

/// Notification for a freshly created task, if it was created assigned.
///
/// Target: the assignee.
#[must_use]
pub fn creation_notice(task: &Task) -> Option<(UserId, Notification)> {
    let assignee = task.assignee.clone()?;
    let notification = Notification {
        kind: NotificationKind::Assigned,
        message: format!("You have been assigned a new task: {}", task.title),
        task_id: task.id.clone(),
    };
    Some((assignee, notification))
}

/// Notifications for a task update, derived from the before/after pair.
///
/// - Assignee changed to a new user → that user, kind `assigned`.
/// - Status transitioned to completed → the creator, kind `completed`.
#[must_use]
pub fn update_notices(before: &Task, after: &Task) -> Vec<(UserId, Notification)> {
    use taskdeck_proto::task::TaskStatus;

    let mut notices = Vec::new();

    if let Some(assignee) = &after.assignee
        && before.assignee.as_ref() != Some(assignee)
    {
        notices.push((
            assignee.clone(),
            Notification {
                kind: NotificationKind::Assigned,
                message: format!("You have been assigned a task: {}", after.title),
                task_id: after.id.clone(),
            },
        ));
    }

    if after.status == TaskStatus::Completed && before.status != TaskStatus::Completed {
        notices.push((
            after.creator.clone(),
            Notification {
                kind: NotificationKind::Completed,
                message: format!("Task \"{}\" has been marked as completed", after.title),
                task_id: after.id.clone(),
            },
        ));
    }

    notices
}

/// Target set for a new comment: creator and assignee, minus the author.
///
/// A commenter is never notified about their own comment; when the author
/// is both creator and assignee the set is empty.
#[must_use]
pub fn comment_targets(
    creator: &UserId,
    assignee: Option<&UserId>,
    author: &UserId,
) -> Vec<UserId> {
    let mut targets = Vec::new();
    if creator != author {
        targets.push(creator.clone());
    }
    if let Some(assignee) = assignee
        && assignee != author
        && assignee != creator
    {
        targets.push(assignee.clone());
    }
    targets
}

/// Notifications for a new comment on a task.
#[must_use]
pub fn comment_notices(task: &Task, author: &UserId) -> Vec<(UserId, Notification)> {
    comment_targets(&task.creator, task.assignee.as_ref(), author)
        .into_iter()
        .map(|target| {
            (
                target,
                Notification {
                    kind: NotificationKind::Commented,
                    message: format!("New comment on task \"{}\"", task.title),
                    task_id: task.id.clone(),
                },
            )
        })
        .collect()
}

/// Delivers a notification to every live connection of the target user.
///
/// A target with no live connections receives nothing; there is no backlog.
pub async fn deliver(sessions: &SessionRegistry, target: &UserId, notification: Notification) {
    let senders = sessions.senders_for_user(target).await;
    if senders.is_empty() {
        tracing::debug!(user = %target, kind = %notification.kind, "notification target offline, dropped");
        return;
    }
    let msg = ServerMessage::Event(ServerEvent::Notification(notification));
    let bytes = match wire::encode_server(&msg) {
        Ok(b) => b,
        Err(e) => {
            tracing::error!(error = %e, "failed to encode notification");
            return;
        }
    };
    for sender in senders {
        let _ = sender.send(Message::Binary(bytes.clone().into()));
    }
}

/// Delivers a batch of notices.
pub async fn deliver_all(sessions: &SessionRegistry, notices: Vec<(UserId, Notification)>) {
    for (target, notification) in notices {
        deliver(sessions, &target, notification).await;
    }
}
