//! Real-time room core for Nagaya watch parties.
//!
//! - `domain`: rooms, participants and the moderation state machine
//! - `usecase`: join / leave / chat / moderation / signaling operations
//! - `infrastructure`: in-memory registry, WebSocket pusher, resolvers, DTOs
//! - `ui`: axum server and handlers
//! - `config`: resolver selection at start-up

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
