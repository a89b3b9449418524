//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds all shared,
//! clonable resources like database pools and service clients.

use crate::{config::Config, rooms::RoomProvisioner};
use interviewer_core::{llm_client::LLMClient, prompts::PromptCatalog};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<crate::db::Db>,
    pub rooms: Arc<dyn RoomProvisioner>,
    pub llm_client: Arc<dyn LLMClient>,
    pub catalog: Arc<PromptCatalog>,
    pub config: Arc<Config>,
}
