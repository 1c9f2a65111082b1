//! WebSocket / HTTP server for watch party rooms.

mod handler;
mod server;
mod signal;
pub mod state;

pub use server::Server;
