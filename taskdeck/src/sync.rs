//! Push-channel connection: live events from the server.
//!
//! [`SyncConnection::connect`] dials the server's WebSocket endpoint,
//! performs the authenticate-first handshake, and spawns a background reader
//! that decodes frames into a typed event stream. Malformed frames are
//! logged and skipped without touching any state; a closed socket ends the
//! stream with a [`SyncEvent::Disconnected`] marker, after which the caller
//! must reconnect and full-fetch before trusting its cache again.

use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use taskdeck_proto::event::ServerEvent;
use taskdeck_proto::task::UserId;
use taskdeck_proto::wire::{self, ClientMessage, ServerMessage};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

/// Type alias for the write half of the WebSocket connection.
type WsSender = futures_util::stream::SplitSink<
    WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
    Message,
>;

/// Type alias for the read half of the WebSocket connection.
type WsReader =
    futures_util::stream::SplitStream<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>>;

/// Timeout for establishing the WebSocket connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for the handshake reply after sending the token.
const AUTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Capacity of the event channel between the reader task and the consumer.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Errors raised while connecting to the push channel.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Connecting or authenticating took too long.
    #[error("connection timed out")]
    Timeout,
    /// The server refused the presented token.
    #[error("authentication refused: {0}")]
    AuthRefused(String),
    /// The connection closed before the handshake completed.
    #[error("connection closed")]
    ConnectionClosed,
    /// The socket could not be established or used.
    #[error("transport error: {0}")]
    Transport(String),
    /// The server broke the handshake protocol.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// An item from the push-channel event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A decoded push event.
    Event(ServerEvent),
    /// The connection dropped; no further events will arrive until the
    /// caller reconnects and performs a fresh full fetch.
    Disconnected,
}

/// A live, authenticated push-channel connection.
#[derive(Debug)]
pub struct SyncConnection {
    user: UserId,
    events: mpsc::Receiver<SyncEvent>,
    sender: WsSender,
    _reader_handle: tokio::task::JoinHandle<()>,
}

impl SyncConnection {
    /// Connects to `ws_url` (e.g. `ws://127.0.0.1:7180/ws`) and
    /// authenticates with `token`.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Timeout`] if connecting or the handshake reply times out.
    /// - [`SyncError::AuthRefused`] if the server rejects the token.
    /// - [`SyncError::Transport`] / [`SyncError::Protocol`] for socket or
    ///   framing trouble during the handshake.
    pub async fn connect(ws_url: &str, token: &str) -> Result<Self, SyncError> {
        let (ws_stream, _response) = tokio::time::timeout(CONNECT_TIMEOUT, connect_async(ws_url))
            .await
            .map_err(|_| {
                tracing::warn!(url = ws_url, "push channel connect timed out");
                SyncError::Timeout
            })?
            .map_err(|e| {
                tracing::warn!(url = ws_url, error = %e, "push channel connect failed");
                SyncError::Transport(e.to_string())
            })?;

        let (mut ws_sender, mut ws_reader) = ws_stream.split();

        let hello = ClientMessage::Authenticate {
            token: token.to_string(),
        };
        let bytes = wire::encode_client(&hello).map_err(|e| SyncError::Protocol(e.to_string()))?;
        ws_sender
            .send(Message::Binary(bytes.into()))
            .await
            .map_err(|e| SyncError::Transport(format!("failed to send handshake: {e}")))?;

        let user = wait_for_ack(&mut ws_reader).await?;
        tracing::info!(user = %user, url = ws_url, "push channel authenticated");

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let reader_handle = tokio::spawn(reader_loop(ws_reader, tx));

        Ok(Self {
            user,
            events: rx,
            sender: ws_sender,
            _reader_handle: reader_handle,
        })
    }

    /// The user identity the server bound this connection to.
    #[must_use]
    pub fn user(&self) -> &UserId {
        &self.user
    }

    /// Waits for the next event. Returns `None` once the stream has ended
    /// (after the [`SyncEvent::Disconnected`] marker has been consumed).
    pub async fn next_event(&mut self) -> Option<SyncEvent> {
        self.events.recv().await
    }

    /// Closes the connection gracefully.
    pub async fn close(mut self) {
        let _ = self.sender.send(Message::Close(None)).await;
    }
}

/// Waits for the handshake reply.
async fn wait_for_ack(reader: &mut WsReader) -> Result<UserId, SyncError> {
    loop {
        let frame = tokio::time::timeout(AUTH_TIMEOUT, reader.next())
            .await
            .map_err(|_| SyncError::Timeout)?;
        match frame {
            Some(Ok(Message::Binary(data))) => {
                return match wire::decode_server(&data) {
                    Ok(ServerMessage::Authenticated { user }) => Ok(user),
                    Ok(ServerMessage::AuthFailed { reason }) => Err(SyncError::AuthRefused(reason)),
                    Ok(ServerMessage::Event(event)) => {
                        Err(SyncError::Protocol(format!("event before handshake ack: {event:?}")))
                    }
                    Err(e) => Err(SyncError::Protocol(e.to_string())),
                };
            }
            Some(Ok(Message::Close(_))) | None => return Err(SyncError::ConnectionClosed),
            Some(Ok(_)) => {
                // Skip ping/pong frames during the handshake.
            }
            Some(Err(e)) => return Err(SyncError::Transport(e.to_string())),
        }
    }
}

/// Background task: decode incoming frames into the event channel.
async fn reader_loop(mut reader: WsReader, tx: mpsc::Sender<SyncEvent>) {
    while let Some(frame) = reader.next().await {
        match frame {
            Ok(Message::Binary(data)) => match wire::decode_server(&data) {
                Ok(ServerMessage::Event(event)) => {
                    if tx.send(SyncEvent::Event(event)).await.is_err() {
                        // Consumer dropped; stop reading.
                        return;
                    }
                }
                Ok(other) => {
                    tracing::warn!(msg = ?other, "unexpected post-handshake frame, ignored");
                }
                Err(e) => {
                    // Fail-safe: drop the frame, keep the cache as-is. A
                    // later full fetch heals any divergence.
                    tracing::warn!(error = %e, "malformed push frame dropped");
                }
            },
            Ok(Message::Close(_)) => {
                tracing::info!("push channel closed by server");
                break;
            }
            Ok(_) => {
                // Ping/pong/text frames.
            }
            Err(e) => {
                tracing::warn!(error = %e, "push channel read error");
                break;
            }
        }
    }
    let _ = tx.send(SyncEvent::Disconnected).await;
}
