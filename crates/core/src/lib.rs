//! Interview session core: the phase state machine, the session record, the
//! tool surface an LLM dialogue loop drives, scoring, and the prompt catalog.

pub mod agent;
pub mod clock;
pub mod controller;
pub mod error;
pub mod llm_client;
pub mod phase;
pub mod prompts;
pub mod record;
pub mod scoring;

pub use controller::{InterviewController, SessionSettings, ToolCall, ToolReply};
pub use error::InterviewError;
pub use phase::Phase;
pub use record::InterviewSession;
