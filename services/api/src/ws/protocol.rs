//! Defines the WebSocket message protocol between the client and the API server.

use crate::models;
use interviewer_core::{InterviewSession, scoring::InterviewSummary};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from the client to the server.
#[derive(Deserialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Starts or resumes the interview. This must be the first message.
    Init { interview_id: Uuid },
    /// Something the candidate said.
    UserMessage { text: String },
}

/// Messages sent from the server to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirms initialization with the current session and transcript.
    Initialized {
        interview_id: Uuid,
        session: InterviewSession,
        history: Vec<models::Message>,
    },
    /// The session record after a tool changed it.
    StateUpdate { session: InterviewSession },
    /// The final report. No further turns are accepted afterwards.
    InterviewCompleted { summary: InterviewSummary },
    /// Reports an error to the client.
    Error { message: String },
    /// Signals the beginning of a streamed text response from the AI.
    ResponseStart,
    /// A chunk of a streamed text response.
    ResponseChunk { chunk: String },
    /// Signals the end of a streamed text response.
    ResponseEnd,
}
