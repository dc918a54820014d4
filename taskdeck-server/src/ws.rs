//! WebSocket push channel: handshake, presence wiring, and frame pumping.
//!
//! The connection lifecycle:
//! 1. Wait for an `Authenticate` frame carrying the bearer token.
//! 2. Verify the token; on failure send `AuthFailed` and close with nothing
//!    recorded anywhere.
//! 3. Bind the connection to the extracted user, register it, and run the
//!    presence connect transition (which may broadcast `MemberConnected` to
//!    everyone else).
//! 4. Send the `OnlineMembers` snapshot to the new client.
//! 5. Pump frames until either side closes.
//! 6. Unregister and run the presence disconnect transition (which may
//!    broadcast `MemberDisconnected`).

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use taskdeck_proto::auth;
use taskdeck_proto::event::ServerEvent;
use taskdeck_proto::wire::{self, ClientMessage, ServerMessage};
use tokio::sync::mpsc;

use crate::server::AppState;

/// axum handler that upgrades an HTTP request to a push-channel connection.
pub async fn ws_handler(
    ws: axum::extract::ws::WebSocketUpgrade,
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
) -> impl axum::response::IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handles one upgraded push-channel connection.
pub async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Step 1: the client speaks first.
    let Some(token) = wait_for_authenticate(&mut ws_receiver).await else {
        tracing::warn!("connection closed before authentication");
        return;
    };

    // Step 2: verify; a refused connection leaves no trace.
    let user = match auth::verify_token(&token, state.secret()) {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(error = %e, "push channel handshake refused");
            let refusal = ServerMessage::AuthFailed {
                reason: e.to_string(),
            };
            let _ = send_server_msg(&mut ws_sender, &refusal).await;
            let _ = ws_sender.send(Message::Close(None)).await;
            return;
        }
    };

    let ack = ServerMessage::Authenticated { user: user.clone() };
    if let Err(e) = send_server_msg(&mut ws_sender, &ack).await {
        tracing::warn!(user = %user, error = %e, "failed to send handshake ack");
        return;
    }

    // Step 3: register, then bring the user online. Registration happens
    // first so the connection is addressable the moment it counts as online.
    let conn_id = state.sessions.next_conn_id();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    state.sessions.register(conn_id, user.clone(), tx).await;
    let online = state.presence.connect(&state.sessions, conn_id, &user).await;

    tracing::info!(user = %user, conn = %conn_id, "push channel connected");

    // Step 4: snapshot, before the writer task starts draining queued events.
    let snapshot = ServerMessage::Event(ServerEvent::OnlineMembers { users: online });
    if let Err(e) = send_server_msg(&mut ws_sender, &snapshot).await {
        tracing::warn!(user = %user, error = %e, "failed to send online snapshot");
        state.sessions.unregister(conn_id).await;
        state.presence.disconnect(&state.sessions, &user).await;
        return;
    }

    // Step 5: writer drains the outbound channel; reader watches for close.
    let writer_user = user.clone();
    let mut write_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                tracing::warn!(user = %writer_user, "push channel write failed");
                break;
            }
        }
    });

    let reader_user = user.clone();
    let mut read_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            match msg {
                Message::Close(_) => {
                    tracing::debug!(user = %reader_user, "received close frame");
                    break;
                }
                Message::Binary(_) | Message::Text(_) => {
                    // Identity is immutable after the handshake and mutations
                    // go through the HTTP API; nothing else is expected here.
                    tracing::warn!(user = %reader_user, "unexpected frame after handshake, ignored");
                }
                _ => {
                    // Ping/pong frames.
                }
            }
        }
    });

    tokio::select! {
        _ = &mut read_task => {
            write_task.abort();
        }
        _ = &mut write_task => {
            read_task.abort();
        }
    }

    // Step 6: tear down. Unregister first so the offline broadcast never
    // targets the dead connection.
    state.sessions.unregister(conn_id).await;
    state.presence.disconnect(&state.sessions, &user).await;
    tracing::info!(user = %user, conn = %conn_id, "push channel disconnected");
}

/// Waits for the first frame, expecting `Authenticate`.
///
/// Returns the presented token, or `None` if the connection closes or sends
/// something else first.
async fn wait_for_authenticate(
    receiver: &mut (impl StreamExt<Item = Result<Message, axum::Error>> + Unpin),
) -> Option<String> {
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Binary(data) => match wire::decode_client(&data) {
                Ok(ClientMessage::Authenticate { token }) => {
                    return Some(token);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "malformed handshake frame");
                    return None;
                }
            },
            Message::Close(_) => return None,
            _ => {
                // Skip non-binary frames (ping/pong) during the handshake.
            }
        }
    }
    None
}

/// Encodes and sends a server message directly on a WebSocket sender.
async fn send_server_msg(
    ws_sender: &mut (impl SinkExt<Message, Error = axum::Error> + Unpin),
    msg: &ServerMessage,
) -> Result<(), String> {
    let bytes = wire::encode_server(msg).map_err(|e| e.to_string())?;
    ws_sender
        .send(Message::Binary(bytes.into()))
        .await
        .map_err(|e| format!("WebSocket send error: {e}"))
}
