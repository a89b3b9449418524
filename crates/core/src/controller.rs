//! Interview Session Controller
//!
//! The tool dispatch surface. Every operation the dialogue loop may invoke is
//! a method on [`InterviewController`]; each one runs synchronously against
//! the session record and always produces a reply, even on invalid input.

use crate::clock::Clock;
use crate::record::InterviewSession;
use crate::scoring::{InterviewStatus, InterviewSummary};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Per-session tuning passed in at session start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Suggested number of questions per phase. Advisory only: the controller
    /// never advances the phase on its own.
    pub max_questions_per_phase: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_questions_per_phase: 5,
        }
    }
}

/// A named operation the dialogue loop may call, with a description the
/// model is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
}

pub const TOOL_CATALOG: &[ToolSpec] = &[
    ToolSpec {
        name: "record_candidate_info",
        description: "Capture the candidate's name and the position they are interviewing for.",
    },
    ToolSpec {
        name: "record_question",
        description: "Log each question asked.",
    },
    ToolSpec {
        name: "record_response",
        description: "Score (1-5) and log a summary of the candidate's response.",
    },
    ToolSpec {
        name: "add_interviewer_note",
        description: "Add an interviewer observation.",
    },
    ToolSpec {
        name: "advance_interview_phase",
        description: "Move to the next interview phase.",
    },
    ToolSpec {
        name: "get_interview_status",
        description: "Get the current phase, elapsed time, question count and running scores.",
    },
    ToolSpec {
        name: "complete_interview",
        description: "Finish the interview with an overall impression and produce the summary.",
    },
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RecordCandidateInfoArgs {
    #[schemars(description = "The candidate's name")]
    pub name: String,
    #[schemars(description = "The position the candidate is interviewing for")]
    pub position: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RecordQuestionArgs {
    pub question: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RecordResponseArgs {
    #[schemars(description = "A short summary of the candidate's answer")]
    pub response_summary: String,
    #[schemars(description = "Quality of the answer, from 1 (poor) to 5 (exceptional)")]
    pub quality_score: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AddInterviewerNoteArgs {
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CompleteInterviewArgs {
    #[schemars(description = "The interviewer's overall impression of the candidate")]
    pub overall_impression: String,
}

/// A typed tool invocation, as a scripted driver or a model runtime would
/// produce it: `{"name": "record_question", "arguments": {"question": "..."}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "arguments", rename_all = "snake_case")]
pub enum ToolCall {
    RecordCandidateInfo(RecordCandidateInfoArgs),
    RecordQuestion(RecordQuestionArgs),
    RecordResponse(RecordResponseArgs),
    AddInterviewerNote(AddInterviewerNoteArgs),
    AdvanceInterviewPhase,
    GetInterviewStatus,
    CompleteInterview(CompleteInterviewArgs),
}

impl ToolCall {
    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::RecordCandidateInfo(_) => "record_candidate_info",
            ToolCall::RecordQuestion(_) => "record_question",
            ToolCall::RecordResponse(_) => "record_response",
            ToolCall::AddInterviewerNote(_) => "add_interviewer_note",
            ToolCall::AdvanceInterviewPhase => "advance_interview_phase",
            ToolCall::GetInterviewStatus => "get_interview_status",
            ToolCall::CompleteInterview(_) => "complete_interview",
        }
    }
}

/// Result of `complete_interview`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewCompletion {
    pub summary: InterviewSummary,
    pub message: String,
}

/// What a tool call hands back to the dialogue loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolReply {
    Message(String),
    Status(InterviewStatus),
    Completed(InterviewCompletion),
}

impl ToolReply {
    /// Renders the reply as the text handed back to the model.
    pub fn to_text(&self) -> String {
        match self {
            ToolReply::Message(message) => message.clone(),
            other => serde_json::to_string(other)
                .unwrap_or_else(|e| format!("{{\"error\": \"Failed to serialize reply: {e}\"}}")),
        }
    }
}

/// Owns one interview session for its whole lifetime.
pub struct InterviewController {
    session: InterviewSession,
    settings: SessionSettings,
    clock: Arc<dyn Clock>,
}

impl InterviewController {
    /// Starts a fresh session, stamped with the clock's current time.
    pub fn new(settings: SessionSettings, clock: Arc<dyn Clock>) -> Self {
        let session = InterviewSession::new(clock.now());
        Self::resume(session, settings, clock)
    }

    /// Continues a previously persisted session.
    pub fn resume(session: InterviewSession, settings: SessionSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            session,
            settings,
            clock,
        }
    }

    pub fn session(&self) -> &InterviewSession {
        &self.session
    }

    pub fn settings(&self) -> SessionSettings {
        self.settings
    }

    /// Routes a typed call to the matching operation.
    pub fn dispatch(&mut self, call: ToolCall) -> ToolReply {
        match call {
            ToolCall::RecordCandidateInfo(args) => {
                ToolReply::Message(self.record_candidate_info(&args.name, &args.position))
            }
            ToolCall::RecordQuestion(args) => ToolReply::Message(self.record_question(&args.question)),
            ToolCall::RecordResponse(args) => ToolReply::Message(
                self.record_response(&args.response_summary, args.quality_score),
            ),
            ToolCall::AddInterviewerNote(args) => {
                ToolReply::Message(self.add_interviewer_note(&args.note))
            }
            ToolCall::AdvanceInterviewPhase => ToolReply::Message(self.advance_interview_phase()),
            ToolCall::GetInterviewStatus => ToolReply::Status(self.get_interview_status()),
            ToolCall::CompleteInterview(args) => {
                ToolReply::Completed(self.complete_interview(&args.overall_impression))
            }
        }
    }

    pub fn record_candidate_info(&mut self, name: &str, position: &str) -> String {
        info!(name, position, "Recording candidate info");
        self.session.set_candidate_info(name, position);
        format!(
            "Thank you, {name}! I've noted you're interviewing for the {position} position. Let's begin!"
        )
    }

    pub fn record_question(&mut self, question: &str) -> String {
        info!(question, phase = %self.session.phase(), "Recording question");
        self.session.record_question(question, self.clock.now());
        if self.session.questions_in_phase() > self.settings.max_questions_per_phase {
            info!(
                questions_in_phase = self.session.questions_in_phase(),
                max = self.settings.max_questions_per_phase,
                "Question count is above the suggested maximum for this phase"
            );
        }
        "Question recorded.".to_string()
    }

    pub fn record_response(&mut self, summary: &str, score: i64) -> String {
        match self.session.record_response(summary, score, self.clock.now()) {
            Ok(score) => {
                info!(score = score.value(), phase = %self.session.phase(), "Recorded response");
                format!("Response recorded with score {}/5.", score.value())
            }
            Err(e) => {
                warn!(score, "Rejected response score");
                e.to_string()
            }
        }
    }

    pub fn add_interviewer_note(&mut self, note: &str) -> String {
        info!(note, "Adding note");
        self.session.add_note(note, self.clock.now());
        "Note added.".to_string()
    }

    pub fn advance_interview_phase(&mut self) -> String {
        let transition = self.session.advance();
        info!(?transition, "Advancing interview phase");
        transition.announcement().to_string()
    }

    pub fn get_interview_status(&self) -> InterviewStatus {
        InterviewStatus::from_session(&self.session, self.clock.now())
    }

    pub fn complete_interview(&mut self, overall_impression: &str) -> InterviewCompletion {
        info!("Completing interview");
        self.session.force_complete();
        let summary = InterviewSummary::build(&self.session, overall_impression, self.clock.now());
        info!(summary = ?summary, "Interview completed");
        let message = format!(
            "Interview completed! Thank you for your time, {}. We'll be in touch soon with next steps.",
            self.session.candidate_name()
        );
        InterviewCompletion { summary, message }
    }
}
