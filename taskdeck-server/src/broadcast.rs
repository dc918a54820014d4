//! Fire-and-forget fan-out of push events to connected clients.
//!
//! Every successful task mutation produces exactly one event, published to
//! all live connections with no acknowledgment, no queue, and no replay for
//! clients that connect later (they catch up with a full fetch). A failed
//! write to one connection is logged and dropped; it never affects the
//! mutation that triggered the event.

use axum::extract::ws::Message;
use taskdeck_proto::event::ServerEvent;
use taskdeck_proto::wire::{self, ServerMessage};
use tokio::sync::mpsc;

use crate::sessions::{ConnId, SessionRegistry};

/// Publishes an event to every live connection.
pub async fn broadcast_all(sessions: &SessionRegistry, event: &ServerEvent) {
    let senders = sessions.all_senders().await;
    send_event(&senders, event);
}

/// Publishes an event to every live connection except one.
///
/// Used for "member online" events, which the triggering connection learns
/// about through its own snapshot instead.
pub async fn broadcast_except(sessions: &SessionRegistry, skip: ConnId, event: &ServerEvent) {
    let senders = sessions.senders_except(skip).await;
    send_event(&senders, event);
}

/// Encodes an event once and enqueues it on each sender.
fn send_event(senders: &[mpsc::UnboundedSender<Message>], event: &ServerEvent) {
    let msg = ServerMessage::Event(event.clone());
    let bytes = match wire::encode_server(&msg) {
        Ok(b) => b,
        Err(e) => {
            tracing::error!(error = %e, "failed to encode push event");
            return;
        }
    };
    for sender in senders {
        if sender.send(Message::Binary(bytes.clone().into())).is_err() {
            // Connection already tearing down; its handler cleans up.
            tracing::debug!("dropped event for closed connection");
        }
    }
}
