//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API, WebSocket endpoint, and OpenAPI documentation.

use crate::{
    handlers,
    models::{
        CreateInterviewPayload, ErrorResponse, Interview, InterviewStatus, InterviewToken,
        Message, MessageRole, QuestionBank, UpdateInterviewPayload,
    },
    state::AppState,
    ws::ws_handler,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::create_interview,
        handlers::list_interviews,
        handlers::get_interview,
        handlers::update_interview,
        handlers::generate_interview_token,
        handlers::question_bank,
    ),
    components(
        schemas(
            Interview,
            Message,
            CreateInterviewPayload,
            UpdateInterviewPayload,
            InterviewToken,
            QuestionBank,
            ErrorResponse,
            InterviewStatus,
            MessageRole
        )
    ),
    tags(
        (name = "Interviewer API", description = "Scheduling and running AI-led job interviews")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route(
            "/interviews",
            get(handlers::list_interviews).post(handlers::create_interview),
        )
        .route(
            "/interviews/{id}",
            get(handlers::get_interview).put(handlers::update_interview),
        )
        .route(
            "/interviews/{id}/token",
            post(handlers::generate_interview_token),
        )
        .route("/question-bank", get(handlers::question_bank))
        .route("/ws", get(ws_handler))
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
