//! `TaskDeck` client library.
//!
//! Talks to a `TaskDeck` server over two channels: the HTTP task API for
//! fetches and mutations, and the WebSocket push channel for live events.
//! The [`cache::TaskCache`] reconciles both into one authoritative local
//! view; [`roster::Roster`] mirrors who is online.

pub mod api;
pub mod cache;
pub mod roster;
pub mod sync;
