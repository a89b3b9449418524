//! WebSocket Interview Sessions
//!
//! This module runs a live interview over a WebSocket:
//!
//! - `protocol`: the JSON message format exchanged with the client.
//! - `session`: the connection lifecycle, from `init` handshake to close.
//! - `cycle`: one Reason-Act turn of the interviewer model.
//! - `persist`: stores session updates as the tools publish them.

mod cycle;
pub mod persist;
pub mod protocol;
pub mod session;

pub use session::ws_handler;
