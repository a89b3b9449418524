//! Axum Handlers for the REST API
//!
//! This module contains the logic for handling HTTP requests for interview
//! management. It uses `utoipa` doc comments to generate OpenAPI documentation.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    db::NewInterview,
    models::{
        CreateInterviewPayload, ErrorResponse, Interview, InterviewStatus, InterviewToken,
        ListInterviewsQuery, QuestionBank, QuestionBankQuery, UpdateInterviewPayload,
    },
    rooms::INTERVIEW_ROOM_EMPTY_TIMEOUT_SECS,
    state::AppState,
};

pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { message })).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse { message })).into_response()
            }
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                let message = "An internal server error occurred.".to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { message }),
                )
                    .into_response()
            }
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::InternalServerError(err.into())
    }
}

/// The authenticated caller, as forwarded by the upstream gateway.
pub(crate) fn user_id(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest("x-user-id header is required".to_string()))
}

fn not_found(id: Uuid) -> ApiError {
    ApiError::NotFound(format!("Interview with id '{}' not found", id))
}

fn require_text(value: &str, field: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::BadRequest(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Schedule a new interview and provision its room.
#[utoipa::path(
    post,
    path = "/interviews",
    request_body = CreateInterviewPayload,
    responses(
        (status = 201, description = "Interview created", body = Interview),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ("x-user-id" = String, Header, description = "The ID of the user scheduling the interview")
    )
)]
pub async fn create_interview(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<CreateInterviewPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = user_id(&headers)?;
    require_text(&payload.candidate_name, "candidate_name")?;
    require_text(&payload.position, "position")?;

    let room_name = format!("interview-{}", Uuid::new_v4().simple());
    let mut interview = state
        .db
        .create_interview(NewInterview {
            creator_id: user_id,
            candidate_name: &payload.candidate_name,
            position: &payload.position,
            company_name: payload.company_name.as_deref(),
            room_name: &room_name,
        })
        .await?;

    if let Err(e) = state
        .rooms
        .create_room(&room_name, INTERVIEW_ROOM_EMPTY_TIMEOUT_SECS)
        .await
    {
        warn!(interview_id = %interview.id, error = ?e, "Room creation failed");
        interview = state
            .db
            .set_status(interview.id, InterviewStatus::RoomCreationFailed)
            .await?;
    }

    info!(interview_id = %interview.id, %room_name, "Interview scheduled");
    Ok((StatusCode::CREATED, Json(interview)))
}

/// List the caller's interviews.
#[utoipa::path(
    get,
    path = "/interviews",
    responses(
        (status = 200, description = "List of interviews", body = [Interview]),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ListInterviewsQuery,
        ("x-user-id" = String, Header, description = "The ID of the user")
    )
)]
pub async fn list_interviews(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListInterviewsQuery>,
) -> Result<Json<Vec<Interview>>, ApiError> {
    let user_id = user_id(&headers)?;
    let interviews = state
        .db
        .list_interviews(user_id, query.skip, query.limit)
        .await?;
    Ok(Json(interviews))
}

/// Get a specific interview by its ID.
#[utoipa::path(
    get,
    path = "/interviews/{id}",
    responses(
        (status = 200, description = "Interview details", body = Interview),
        (status = 404, description = "Interview not found"),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Interview ID"),
        ("x-user-id" = String, Header, description = "The ID of the user")
    )
)]
pub async fn get_interview(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = user_id(&headers)?;
    let interview = state
        .db
        .get_interview(id, user_id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok((StatusCode::OK, Json(interview)))
}

/// Update an interview's status or report.
#[utoipa::path(
    put,
    path = "/interviews/{id}",
    request_body = UpdateInterviewPayload,
    responses(
        (status = 200, description = "Interview updated", body = Interview),
        (status = 404, description = "Interview not found"),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Interview ID"),
        ("x-user-id" = String, Header, description = "The ID of the user")
    )
)]
pub async fn update_interview(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateInterviewPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = user_id(&headers)?;

    // First, ensure the interview exists and belongs to the user.
    state
        .db
        .get_interview(id, user_id)
        .await?
        .ok_or_else(|| not_found(id))?;

    let updated = state.db.update_interview(id, &payload).await?;
    Ok((StatusCode::OK, Json(updated)))
}

/// Issue the candidate's room join token.
#[utoipa::path(
    post,
    path = "/interviews/{id}/token",
    responses(
        (status = 200, description = "Join token issued", body = InterviewToken),
        (status = 404, description = "Interview not found"),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Interview ID"),
        ("x-user-id" = String, Header, description = "The ID of the user")
    )
)]
pub async fn generate_interview_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<InterviewToken>, ApiError> {
    let user_id = user_id(&headers)?;
    let interview = state
        .db
        .get_interview(id, user_id)
        .await?
        .ok_or_else(|| not_found(id))?;

    let identity = format!("candidate-{}", interview.id);
    let token = state.rooms.join_token(
        &interview.room_name,
        &interview.candidate_name,
        Some(&identity),
    )?;

    Ok(Json(InterviewToken {
        token,
        room_name: interview.room_name,
        participant_name: interview.candidate_name,
        server_url: state.rooms.server_url().to_string(),
    }))
}

/// Suggested questions for a position.
#[utoipa::path(
    get,
    path = "/question-bank",
    responses(
        (status = 200, description = "Questions for the position", body = QuestionBank),
        (status = 400, description = "Bad request", body = ErrorResponse)
    ),
    params(QuestionBankQuery)
)]
pub async fn question_bank(
    State(state): State<Arc<AppState>>,
    Query(query): Query<QuestionBankQuery>,
) -> Result<Json<QuestionBank>, ApiError> {
    require_text(&query.position, "position")?;
    let mut rng = rand::rng();
    let catalog = &state.catalog;
    Ok(Json(QuestionBank {
        technical: catalog.technical_questions(&query.position).to_vec(),
        behavioral: catalog.behavioral_questions(query.behavioral_count, &mut rng),
        follow_up: catalog.follow_up_prompt(&mut rng).map(str::to_string),
        position: query.position,
    }))
}
