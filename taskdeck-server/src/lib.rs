//! `TaskDeck` server library.
//!
//! Exposes the push-channel and task-API server for use in tests and
//! embedding. The server accepts WebSocket connections authenticated by
//! bearer token, tracks per-user presence, fans out task mutation events to
//! every connected client, and routes targeted notifications to the users a
//! mutation concerns.

pub mod auth;
pub mod broadcast;
pub mod config;
pub mod http;
pub mod notify;
pub mod presence;
pub mod server;
pub mod sessions;
pub mod store;
pub mod ws;
