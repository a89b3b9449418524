//! Interviewer API Library Crate
//!
//! This library contains the web service around the interview session core:
//! application state, configuration, database access, room provisioning, REST
//! handlers, the WebSocket dialogue loop and routing. The binaries under
//! `bin/` are thin wrappers around this library.

pub mod config;
pub mod db;
pub mod handlers;
pub mod models;
pub mod rooms;
pub mod router;
pub mod state;
pub mod ws;
