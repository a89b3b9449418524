//! Interview Agent Service
//!
//! Exposes the [`InterviewController`] operations as Model Context Protocol
//! tools so that an LLM-backed dialogue loop can drive an interview. Each tool
//! locks the session, runs the operation and, for mutating calls, publishes
//! the new state to an optional subscriber.

use crate::controller::{
    AddInterviewerNoteArgs, CompleteInterviewArgs, InterviewController, RecordCandidateInfoArgs,
    RecordQuestionArgs, RecordResponseArgs, ToolReply,
};
use crate::record::InterviewSession;
use crate::scoring::InterviewSummary;
use rmcp::{
    ServerHandler,
    handler::server::{router::tool::ToolRouter, tool::Parameters},
    model::{ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{info, warn};

/// State changes published by the service.
#[derive(Debug, Clone)]
pub enum SessionUpdate {
    /// The session record after a mutating tool call.
    Snapshot(InterviewSession),
    /// The final report, published once `complete_interview` runs.
    Completed(InterviewSummary),
}

/// MCP server wrapping a single interview session.
pub struct InterviewService {
    /// The session controller. One service instance per interview.
    pub controller: Arc<Mutex<InterviewController>>,
    /// Optional channel for broadcasting state changes to subscribers.
    pub state_tx: Option<mpsc::Sender<SessionUpdate>>,
    tool_router: ToolRouter<Self>,
}

#[tool_handler]
impl ServerHandler for InterviewService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Tools for recording and scoring a structured job interview.".to_string(),
            ),
            ..Default::default()
        }
    }
}

#[tool_router]
impl InterviewService {
    pub fn new(
        controller: Arc<Mutex<InterviewController>>,
        state_tx: Option<mpsc::Sender<SessionUpdate>>,
    ) -> Self {
        Self {
            controller,
            state_tx,
            tool_router: Self::tool_router(),
        }
    }

    async fn publish(&self, update: SessionUpdate) {
        if let Some(tx) = &self.state_tx {
            if tx.send(update).await.is_err() {
                warn!("Failed to broadcast session update: receiver dropped.");
            }
        }
    }

    async fn publish_snapshot(&self, controller: &InterviewController) {
        self.publish(SessionUpdate::Snapshot(controller.session().clone()))
            .await;
    }

    #[tool(description = "Record the candidate's name and the position they are interviewing for.")]
    pub async fn record_candidate_info(
        &self,
        args: Parameters<RecordCandidateInfoArgs>,
    ) -> Result<String, String> {
        info!("Executing tool 'record_candidate_info'");
        let mut controller = self.controller.lock().await;
        let reply = controller.record_candidate_info(&args.0.name, &args.0.position);
        self.publish_snapshot(&controller).await;
        Ok(reply)
    }

    #[tool(description = "Record a question that was asked to the candidate.")]
    pub async fn record_question(
        &self,
        args: Parameters<RecordQuestionArgs>,
    ) -> Result<String, String> {
        info!("Executing tool 'record_question'");
        let mut controller = self.controller.lock().await;
        let reply = controller.record_question(&args.0.question);
        self.publish_snapshot(&controller).await;
        Ok(reply)
    }

    /// Records and scores a response. An out-of-range score comes back as a
    /// normal reply so the model can retry with a corrected value.
    #[tool(description = "Record a summary of the candidate's response with a quality score from 1 to 5.")]
    pub async fn record_response(
        &self,
        args: Parameters<RecordResponseArgs>,
    ) -> Result<String, String> {
        info!("Executing tool 'record_response'");
        let mut controller = self.controller.lock().await;
        let before = controller.session().responses().len();
        let reply = controller.record_response(&args.0.response_summary, args.0.quality_score);
        if controller.session().responses().len() != before {
            self.publish_snapshot(&controller).await;
        }
        Ok(reply)
    }

    #[tool(description = "Add an interviewer observation note.")]
    pub async fn add_interviewer_note(
        &self,
        args: Parameters<AddInterviewerNoteArgs>,
    ) -> Result<String, String> {
        info!("Executing tool 'add_interviewer_note'");
        let mut controller = self.controller.lock().await;
        let reply = controller.add_interviewer_note(&args.0.note);
        self.publish_snapshot(&controller).await;
        Ok(reply)
    }

    #[tool(description = "Move the interview to its next phase.")]
    pub async fn advance_interview_phase(&self) -> Result<String, String> {
        info!("Executing tool 'advance_interview_phase'");
        let mut controller = self.controller.lock().await;
        let before = controller.session().phase();
        let reply = controller.advance_interview_phase();
        if controller.session().phase() != before {
            self.publish_snapshot(&controller).await;
        }
        Ok(reply)
    }

    #[tool(description = "Get the current interview status: phase, elapsed minutes, question count and running scores.")]
    pub async fn get_interview_status(&self) -> Result<String, String> {
        info!("Executing tool 'get_interview_status'");
        let controller = self.controller.lock().await;
        serde_json::to_string(&controller.get_interview_status())
            .map_err(|e| format!("Failed to serialize interview status: {}", e))
    }

    /// Ends the interview and returns the summary along with the closing
    /// message.
    #[tool(description = "Complete the interview with an overall impression of the candidate.")]
    pub async fn complete_interview(
        &self,
        args: Parameters<CompleteInterviewArgs>,
    ) -> Result<String, String> {
        info!("Executing tool 'complete_interview'");
        let mut controller = self.controller.lock().await;
        let completion = controller.complete_interview(&args.0.overall_impression);
        self.publish_snapshot(&controller).await;
        self.publish(SessionUpdate::Completed(completion.summary.clone()))
            .await;
        Ok(ToolReply::Completed(completion).to_text())
    }
}
