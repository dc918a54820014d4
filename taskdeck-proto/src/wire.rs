//! Framing for the WebSocket push channel.
//!
//! Both directions are postcard-encoded binary frames. The client speaks
//! first: its initial frame must be [`ClientMessage::Authenticate`], and the
//! server answers with [`ServerMessage::Authenticated`] or
//! [`ServerMessage::AuthFailed`] before any events flow.

use serde::{Deserialize, Serialize};

use crate::event::ServerEvent;
use crate::task::UserId;

/// Messages sent from a client to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Presents the bearer token. Must be the first frame after the
    /// WebSocket upgrade; the connection carries no identity until the
    /// server accepts it.
    Authenticate {
        /// Signed bearer token issued by the credential collaborator.
        token: String,
    },
}

/// Messages sent from the server to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// Handshake accepted; the connection is bound to this user for its
    /// entire lifetime.
    Authenticated {
        /// The identity extracted from the token.
        user: UserId,
    },

    /// Handshake refused. The server closes the connection after this
    /// frame and records no state for it.
    AuthFailed {
        /// Human-readable refusal reason.
        reason: String,
    },

    /// A push event (broadcast or addressed).
    Event(ServerEvent),
}

/// Error type for wire encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization failed.
    #[error("encode error: {0}")]
    Encode(String),
    /// Deserialization failed (unknown or malformed frame).
    #[error("decode error: {0}")]
    Decode(String),
}

/// Encodes a [`ClientMessage`] into postcard bytes.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] if serialization fails.
pub fn encode_client(msg: &ClientMessage) -> Result<Vec<u8>, CodecError> {
    postcard::to_allocvec(msg).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Decodes a [`ClientMessage`] from postcard bytes.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] if the bytes do not form a valid message.
pub fn decode_client(bytes: &[u8]) -> Result<ClientMessage, CodecError> {
    postcard::from_bytes(bytes).map_err(|e| CodecError::Decode(e.to_string()))
}

/// Encodes a [`ServerMessage`] into postcard bytes.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] if serialization fails.
pub fn encode_server(msg: &ServerMessage) -> Result<Vec<u8>, CodecError> {
    postcard::to_allocvec(msg).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Decodes a [`ServerMessage`] from postcard bytes.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] if the bytes do not form a valid message.
pub fn decode_server(bytes: &[u8]) -> Result<ServerMessage, CodecError> {
    postcard::from_bytes(bytes).map_err(|e| CodecError::Decode(e.to_string()))
}
