//! Manages the WebSocket connection lifecycle for a live interview.

use super::{
    cycle::{DialogueTurn, handle_react_cycle},
    persist::persist_updates,
    protocol::{ClientMessage, ServerMessage},
};
use crate::{
    handlers::user_id,
    models::{self, Interview, InterviewStatus},
    state::AppState,
};
use anyhow::{Context, Result, anyhow, bail};
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use interviewer_core::{
    InterviewController, InterviewSession, SessionSettings,
    agent::InterviewService,
    clock::SystemClock,
    controller::TOOL_CATALOG,
    prompts::PromptContext,
};
use rmcp::ServiceExt;
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tokio::sync::{Mutex, mpsc};
use tracing::{Instrument, error, info, instrument, warn};
use uuid::Uuid;

const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) type SocketSink = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// Everything loaded during the `init` handshake.
struct InitializedInterview {
    interview: Interview,
    session: InterviewSession,
    history: Vec<models::Message>,
}

/// Axum handler to upgrade an HTTP connection to a WebSocket.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    let user_id = match user_id(&headers) {
        Ok(id) => id.to_string(),
        Err(e) => return e.into_response(),
    };
    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id))
}

/// Performs the `init` handshake, then hands the connection to the
/// interview loop.
#[instrument(name = "ws_session", skip_all, fields(interview_id))]
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, user_id: String) {
    info!("New WebSocket connection. Awaiting initialization...");

    let (socket_tx, mut socket_rx) = socket.split();
    let socket_tx: SocketSink = Arc::new(Mutex::new(socket_tx));

    let init = match socket_rx.next().await {
        Some(Ok(Message::Text(text))) => initialize_interview(&text, &state, &user_id).await,
        Some(Ok(_)) => Err(anyhow!("First message was not a text `init` message.")),
        Some(Err(e)) => Err(anyhow!(e).context("Failed to read init message")),
        None => {
            info!("Client disconnected before sending init message.");
            return;
        }
    };

    let init = match init {
        Ok(init) => init,
        Err(e) => {
            error!("Interview initialization failed: {:?}", e);
            let _ = send_msg(
                &mut *socket_tx.lock().await,
                ServerMessage::Error {
                    message: e.to_string(),
                },
            )
            .await;
            return;
        }
    };

    if send_msg(
        &mut *socket_tx.lock().await,
        ServerMessage::Initialized {
            interview_id: init.interview.id,
            session: init.session.clone(),
            history: init.history.clone(),
        },
    )
    .await
    .is_err()
    {
        error!("Failed to send Initialized message to client.");
        return;
    }

    let span = tracing::info_span!(
        "interview_runtime",
        interview_id = %init.interview.id,
        position = %init.interview.position
    );
    tokio::spawn(
        async move {
            if let Err(e) = run_interview(state, socket_tx, socket_rx, init).await {
                error!(error = ?e, "Interview session terminated with error.");
            }
            info!("Interview session finished.");
        }
        .instrument(span),
    );
}

/// Parses the `init` message and loads the interview, its latest session
/// snapshot and its transcript.
async fn initialize_interview(
    init_text: &str,
    state: &Arc<AppState>,
    user_id: &str,
) -> Result<InitializedInterview> {
    let ClientMessage::Init { interview_id } = serde_json::from_str(init_text)? else {
        bail!("First message must be `init`");
    };
    tracing::Span::current().record("interview_id", tracing::field::display(interview_id));

    let interview = state
        .db
        .get_interview(interview_id, user_id)
        .await?
        .with_context(|| format!("Interview '{interview_id}' not found"))?;
    if interview.status == InterviewStatus::Completed {
        bail!("Interview has already been completed");
    }

    let stored = state.db.get_latest_session(interview_id).await?;
    let (session, fresh) = start_or_resume(stored, &interview, Utc::now());
    if fresh {
        info!("First connection; starting the interview session");
        state.db.save_session(interview_id, &session).await?;
    } else {
        info!(phase = %session.phase(), "Resuming interview session");
    }
    let history = state.db.get_interview_messages(interview_id).await?;

    let interview = if interview.status == InterviewStatus::InProgress {
        interview
    } else {
        state
            .db
            .set_status(interview_id, InterviewStatus::InProgress)
            .await?
    };

    Ok(InitializedInterview {
        interview,
        session,
        history,
    })
}

/// The stored session, or a new one that starts at `now`. The record is only
/// created once the candidate first connects, so its clock measures the
/// conversation and not the wait after scheduling. The flag is `true` for a
/// new session.
fn start_or_resume(
    stored: Option<InterviewSession>,
    interview: &Interview,
    now: DateTime<Utc>,
) -> (InterviewSession, bool) {
    match stored {
        Some(session) => (session, false),
        None => {
            let mut session = InterviewSession::new(now);
            session.set_candidate_info(&interview.candidate_name, &interview.position);
            (session, true)
        }
    }
}

/// Builds the interviewer's system prompt for this interview.
fn build_system_prompt(state: &AppState, interview: &Interview, session: &InterviewSession) -> String {
    let candidate_name = if session.candidate_name().is_empty() {
        interview.candidate_name.as_str()
    } else {
        session.candidate_name()
    };
    state.catalog.system_prompt(
        &PromptContext {
            position: &interview.position,
            candidate_name,
            company_name: interview.company_name.as_deref(),
            max_questions_per_phase: state.config.max_questions_per_phase,
        },
        TOOL_CATALOG,
    )
}

/// The main event loop for an active interview.
///
/// Candidate messages are handled here one turn at a time. Session updates
/// published by the interview tools are stored by a separate task as they
/// arrive, and everything bound for the client goes through one writer.
async fn run_interview(
    state: Arc<AppState>,
    socket_tx: SocketSink,
    mut socket_rx: SplitStream<WebSocket>,
    init: InitializedInterview,
) -> Result<()> {
    let InitializedInterview {
        interview,
        session,
        mut history,
    } = init;
    let interview_id = interview.id;
    let system_prompt = build_system_prompt(&state, &interview, &session);

    let settings = SessionSettings {
        max_questions_per_phase: state.config.max_questions_per_phase,
    };
    let controller = Arc::new(Mutex::new(InterviewController::resume(
        session,
        settings,
        Arc::new(SystemClock),
    )));

    let completed = Arc::new(AtomicBool::new(false));
    let (update_tx, update_rx) = mpsc::channel(64);
    let (outbox_tx, outbox_rx) = mpsc::unbounded_channel();
    let persister = tokio::spawn(
        persist_updates(
            state.db.clone(),
            interview_id,
            update_rx,
            outbox_tx,
            completed.clone(),
        )
        .in_current_span(),
    );
    let writer = tokio::spawn(forward_to_socket(outbox_rx, socket_tx.clone()).in_current_span());

    let service = InterviewService::new(controller.clone(), Some(update_tx));
    let (server_transport, client_transport) = tokio::io::duplex(4096);
    let tool_handle = tokio::spawn(async move {
        if let Ok(service) = service.serve(server_transport).await {
            let _ = service.waiting().await;
        }
    });
    let mcp_client = ().serve(client_transport).await?;

    while let Some(msg_result) = socket_rx.next().await {
        let text = match msg_result {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(_)) => {
                warn!("Ignoring binary message; only text turns are supported.");
                continue;
            }
            Ok(Message::Close(_)) => {
                info!("Client sent close frame. Shutting down session.");
                break;
            }
            Ok(Message::Ping(_) | Message::Pong(_)) => continue,
            Err(e) => {
                error!("Error receiving from client WebSocket: {:?}", e);
                break;
            }
        };

        let reply_error = match serde_json::from_str::<ClientMessage>(&text) {
            Ok(ClientMessage::UserMessage { .. }) if completed.load(Ordering::SeqCst) => {
                warn!("Ignoring message after completion.");
                Some("Interview has already been completed")
            }
            Ok(ClientMessage::UserMessage { text }) => {
                let turn = DialogueTurn {
                    state: &state,
                    interview_id,
                    system_prompt: &system_prompt,
                    controller: &controller,
                    mcp_client: &mcp_client,
                    socket_tx: &socket_tx,
                };
                match handle_react_cycle(turn, &mut history, &text).await {
                    Ok(()) => None,
                    Err(e) => {
                        error!(error = ?e, "Interview turn failed.");
                        Some("The interviewer could not respond. Please try again.")
                    }
                }
            }
            Ok(ClientMessage::Init { .. }) => {
                warn!("Ignoring repeated init message.");
                None
            }
            Err(e) => {
                warn!(error = %e, "Ignoring malformed client message.");
                None
            }
        };

        if let Some(message) = reply_error {
            let sent = send_msg(
                &mut *socket_tx.lock().await,
                ServerMessage::Error {
                    message: message.to_string(),
                },
            )
            .await;
            if sent.is_err() {
                info!("Client is gone. Shutting down session.");
                break;
            }
        }
    }

    // Closing the tool server drops the last update sender, which lets the
    // persister finish whatever is still buffered.
    if let Err(e) = mcp_client.cancel().await {
        warn!(error = ?e, "Failed to close the tool client cleanly.");
    }
    tool_handle.abort();
    let _ = tool_handle.await;
    match tokio::time::timeout(SHUTDOWN_DRAIN_TIMEOUT, persister).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = ?e, "Session persister panicked."),
        Err(_) => error!("Timed out storing buffered session updates."),
    }
    writer.abort();
    info!("WebSocket connection closed and interview session terminated.");
    Ok(())
}

/// Writes queued server messages to the client until the queue closes.
async fn forward_to_socket(
    mut outbox: mpsc::UnboundedReceiver<ServerMessage>,
    socket_tx: SocketSink,
) {
    while let Some(msg) = outbox.recv().await {
        if let Err(e) = send_msg(&mut *socket_tx.lock().await, msg).await {
            warn!(error = ?e, "Dropping server message; client unreachable.");
        }
    }
}

/// Serializes and sends a `ServerMessage` to the client.
pub(crate) async fn send_msg(
    socket_tx: &mut SplitSink<WebSocket, Message>,
    msg: ServerMessage,
) -> Result<()> {
    let serialized = serde_json::to_string(&msg)?;
    socket_tx.send(Message::Text(serialized.into())).await?;
    Ok(())
}
