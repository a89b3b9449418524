//! Contains the logic for the interviewer's "ReAct" (Reason and Act) cycle.

use crate::{
    models::{self, MessageRole},
    state::AppState,
    ws::{
        protocol::ServerMessage,
        session::{SocketSink, send_msg},
    },
};
use anyhow::Result;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionTool, ChatCompletionToolArgs, FunctionObjectArgs,
};
use interviewer_core::{
    InterviewController,
    llm_client::{LLMAction, LLMStreamEvent, ToolCall},
};
use futures_util::StreamExt;
use rmcp::{
    model::{CallToolRequestParam, Content, JsonObject, RawContent},
    service::{RoleClient, RunningService},
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

/// The per-connection resources a turn needs.
pub struct DialogueTurn<'a> {
    pub state: &'a Arc<AppState>,
    pub interview_id: Uuid,
    pub system_prompt: &'a str,
    pub controller: &'a Arc<Mutex<InterviewController>>,
    pub mcp_client: &'a RunningService<RoleClient, ()>,
    pub socket_tx: &'a SocketSink,
}

/// Appends the live interview status to the base prompt so the model knows
/// the phase and counts for this turn.
fn prompt_with_status(system_prompt: &str, status_json: &str) -> String {
    format!("{system_prompt}\n\n# Current Interview Status\n\n```json\n{status_json}\n```")
}

/// Converts the stored transcript into chat messages.
fn history_messages(history: &[models::Message]) -> Result<Vec<ChatCompletionRequestMessage>> {
    history
        .iter()
        .map(|msg| -> Result<ChatCompletionRequestMessage> {
            Ok(match msg.role {
                MessageRole::User => ChatCompletionRequestUserMessageArgs::default()
                    .content(msg.content.clone())
                    .build()?
                    .into(),
                MessageRole::Ai => ChatCompletionRequestAssistantMessageArgs::default()
                    .content(msg.content.clone())
                    .build()?
                    .into(),
            })
        })
        .collect()
}

async fn available_tools(mcp_client: &RunningService<RoleClient, ()>) -> Result<Vec<ChatCompletionTool>> {
    mcp_client
        .list_all_tools()
        .await?
        .into_iter()
        .map(|t| -> Result<ChatCompletionTool> {
            Ok(ChatCompletionToolArgs::default()
                .function(
                    FunctionObjectArgs::default()
                        .name(t.name)
                        .description(t.description.unwrap_or_default())
                        .parameters(serde_json::to_value(&*t.input_schema)?)
                        .build()?,
                )
                .build()?)
        })
        .collect()
}

/// Parses the model's argument string. A blank string means no arguments.
fn parse_tool_arguments(raw: &str) -> Result<JsonObject, String> {
    if raw.trim().is_empty() {
        return Ok(JsonObject::new());
    }
    serde_json::from_str(raw).map_err(|e| format!("arguments are not a JSON object: {e}"))
}

/// The reply the model sees when a tool could not run.
fn tool_error(tool: &str, reason: &str) -> String {
    json!({
        "error": format!("Tool '{tool}' failed: {reason}. Fix the arguments and call it again."),
    })
    .to_string()
}

fn tool_result_text(content: Option<Vec<Content>>) -> String {
    match content.and_then(|mut items| items.pop()).map(|item| item.raw) {
        Some(RawContent::Text(text_content)) => text_content.text,
        Some(_) => json!({"error": "Unexpected content type from tool"}).to_string(),
        None => json!({"error": "Tool returned no content"}).to_string(),
    }
}

/// Runs one requested tool. Bad input becomes an error reply for the model,
/// never an error for the turn.
async fn run_tool(mcp_client: &RunningService<RoleClient, ()>, call: &ToolCall) -> String {
    let name = call.function.name.as_str();
    info!(tool = %name, "Model requested tool");

    let arguments = match parse_tool_arguments(&call.function.arguments) {
        Ok(arguments) => arguments,
        Err(reason) => {
            warn!(tool = %name, %reason, "Rejected tool arguments");
            return tool_error(name, &reason);
        }
    };

    match mcp_client
        .peer()
        .call_tool(CallToolRequestParam {
            name: name.to_string().into(),
            arguments: Some(arguments),
        })
        .await
    {
        Ok(result) => tool_result_text(result.content),
        Err(e) => {
            warn!(tool = %name, error = %e, "Tool call failed");
            tool_error(name, &e.to_string())
        }
    }
}

/// Handles one candidate message:
///
/// 1. Stores the message and builds the prompt with the live status.
/// 2. Lets the model either answer directly or call interview tools.
/// 3. Feeds tool results back and streams the final reply to the client.
/// 4. Stores the reply in the transcript.
pub async fn handle_react_cycle(
    turn: DialogueTurn<'_>,
    history: &mut Vec<models::Message>,
    user_text: &str,
) -> Result<()> {
    let DialogueTurn {
        state,
        interview_id,
        system_prompt,
        controller,
        mcp_client,
        socket_tx,
    } = turn;

    let user_msg = state
        .db
        .add_message(interview_id, MessageRole::User, user_text)
        .await?;
    history.push(user_msg);

    let status = controller.lock().await.get_interview_status();
    let system_prompt = prompt_with_status(system_prompt, &serde_json::to_string_pretty(&status)?);

    let messages = history_messages(history)?;
    let tools = available_tools(mcp_client).await?;

    let action = state
        .llm_client
        .decide_action(system_prompt.clone(), messages.clone(), tools)
        .await?;

    let mut full_response = String::new();
    send_msg(&mut *socket_tx.lock().await, ServerMessage::ResponseStart).await?;
    match action {
        LLMAction::TextResponse(text) => {
            send_msg(
                &mut *socket_tx.lock().await,
                ServerMessage::ResponseChunk {
                    chunk: text.clone(),
                },
            )
            .await?;
            full_response = text;
        }
        LLMAction::ToolCall(tool_calls) => {
            let mut with_tools = messages;
            with_tools.push(
                ChatCompletionRequestAssistantMessageArgs::default()
                    .tool_calls(tool_calls.clone())
                    .build()?
                    .into(),
            );

            for call in &tool_calls {
                let result_text = run_tool(mcp_client, call).await;
                with_tools.push(
                    ChatCompletionRequestToolMessageArgs::default()
                        .tool_call_id(call.id.clone())
                        .content(result_text)
                        .build()?
                        .into(),
                );
            }

            let mut stream = state
                .llm_client
                .stream_after_tools(system_prompt, with_tools)
                .await?;
            while let Some(event) = stream.next().await {
                match event {
                    Ok(LLMStreamEvent::TextChunk(chunk)) => {
                        full_response.push_str(&chunk);
                        send_msg(
                            &mut *socket_tx.lock().await,
                            ServerMessage::ResponseChunk { chunk },
                        )
                        .await?;
                    }
                    Err(e) => warn!(error = %e, "Error in response stream"),
                }
            }
        }
    }
    send_msg(&mut *socket_tx.lock().await, ServerMessage::ResponseEnd).await?;

    if !full_response.is_empty() {
        let ai_msg = state
            .db
            .add_message(interview_id, MessageRole::Ai, &full_response)
            .await?;
        history.push(ai_msg);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn message(role: MessageRole, content: &str) -> models::Message {
        models::Message {
            id: 1,
            interview_id: Uuid::nil(),
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_history_keeps_roles_in_order() {
        let history = vec![
            message(MessageRole::Ai, "Welcome! Tell me about yourself."),
            message(MessageRole::User, "I build compilers."),
        ];
        let messages = history_messages(&history).unwrap();
        assert_eq!(messages.len(), 2);
        assert!(matches!(
            messages[0],
            ChatCompletionRequestMessage::Assistant(_)
        ));
        assert!(matches!(messages[1], ChatCompletionRequestMessage::User(_)));
    }

    #[test]
    fn test_prompt_with_status_appends_block() {
        let prompt = prompt_with_status("Be kind.", "{\"current_phase\": \"technical\"}");
        assert!(prompt.starts_with("Be kind.\n\n# Current Interview Status"));
        assert!(prompt.ends_with("```json\n{\"current_phase\": \"technical\"}\n```"));
    }

    #[test]
    fn test_tool_arguments_must_be_an_object() {
        assert!(parse_tool_arguments("").unwrap().is_empty());
        assert!(parse_tool_arguments("   ").unwrap().is_empty());
        let args = parse_tool_arguments(r#"{"question": "Why Rust?"}"#).unwrap();
        assert_eq!(args["question"], "Why Rust?");

        assert!(parse_tool_arguments("not json").is_err());
        assert!(parse_tool_arguments("[1, 2]").is_err());
    }

    #[test]
    fn test_tool_error_is_actionable_json() {
        let reply = tool_error("record_response", "missing field `quality_score`");
        let value: serde_json::Value = serde_json::from_str(&reply).unwrap();
        let message = value["error"].as_str().unwrap();
        assert!(message.contains("record_response"));
        assert!(message.contains("missing field `quality_score`"));
        assert!(message.ends_with("call it again."));
    }

    #[test]
    fn test_tool_result_text_without_content() {
        let value: serde_json::Value = serde_json::from_str(&tool_result_text(None)).unwrap();
        assert_eq!(value["error"], "Tool returned no content");
        assert_eq!(
            tool_result_text(Some(vec![Content::text("Note added.")])),
            "Note added."
        );
    }

    mod against_tool_server {
        use super::*;
        use async_openai::types::{ChatCompletionToolType, FunctionCall};
        use interviewer_core::{
            SessionSettings, agent::InterviewService, clock::SystemClock,
        };
        use rmcp::ServiceExt;

        fn call(name: &str, arguments: &str) -> ToolCall {
            ToolCall {
                id: format!("call_{name}"),
                r#type: ChatCompletionToolType::Function,
                function: FunctionCall {
                    name: name.to_string(),
                    arguments: arguments.to_string(),
                },
            }
        }

        #[tokio::test]
        async fn test_bad_arguments_leave_the_turn_running() {
            let controller = Arc::new(Mutex::new(InterviewController::new(
                SessionSettings::default(),
                Arc::new(SystemClock),
            )));
            let service = InterviewService::new(controller.clone(), None);
            let (server_transport, client_transport) = tokio::io::duplex(4096);
            let server = tokio::spawn(async move {
                if let Ok(service) = service.serve(server_transport).await {
                    let _ = service.waiting().await;
                }
            });
            let client = ().serve(client_transport).await.unwrap();

            let reply = run_tool(&client, &call("record_response", "{not json")).await;
            assert!(reply.contains("\"error\""));

            let reply = run_tool(
                &client,
                &call(
                    "record_response",
                    r#"{"response_summary": "solid", "quality_score": "4"}"#,
                ),
            )
            .await;
            assert!(!reply.starts_with("Response recorded"));
            assert!(controller.lock().await.session().responses().is_empty());

            let reply = run_tool(
                &client,
                &call(
                    "record_response",
                    r#"{"response_summary": "solid", "quality_score": 4}"#,
                ),
            )
            .await;
            assert_eq!(reply, "Response recorded with score 4/5.");
            assert_eq!(controller.lock().await.session().responses().len(), 1);

            let _ = client.cancel().await;
            server.abort();
        }
    }
}
