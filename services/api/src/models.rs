//! API and Database Models
//!
//! This module defines the core data structures used for both database mapping
//! with `sqlx` and for generating OpenAPI documentation with `utoipa`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(sqlx::Type, Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "interview_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InterviewStatus {
    Scheduled,
    InProgress,
    Completed,
    RoomCreationFailed,
}

#[derive(sqlx::Type, Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq)]
#[sqlx(type_name = "message_role", rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Ai,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Ai => write!(f, "ai"),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, FromRow, Debug, Clone)]
pub struct Interview {
    #[schema(value_type = String, format = Uuid)]
    pub id: Uuid,
    pub creator_id: String,
    pub candidate_name: String,
    pub position: String,
    pub company_name: Option<String>,
    #[schema(value_type = String, example = "scheduled")]
    pub status: InterviewStatus,
    pub room_name: String,
    /// The completion summary, once the interview has finished.
    #[schema(value_type = Option<Object>)]
    pub report: Option<serde_json::Value>,
    pub scheduled_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, ToSchema, FromRow, Debug, Clone)]
pub struct Message {
    pub id: i64,
    #[schema(value_type = String, format = Uuid)]
    pub interview_id: Uuid,
    #[schema(value_type = String, example = "user")]
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateInterviewPayload {
    #[schema(example = "Ada Lovelace")]
    pub candidate_name: String,
    #[schema(example = "Software Engineer")]
    pub position: String,
    #[schema(example = "Analytical Engines Ltd")]
    pub company_name: Option<String>,
}

#[derive(Deserialize, ToSchema, Default)]
pub struct UpdateInterviewPayload {
    #[schema(example = "completed")]
    pub status: Option<InterviewStatus>,
    #[schema(value_type = Option<Object>)]
    pub report: Option<serde_json::Value>,
}

#[derive(Deserialize, IntoParams, Debug)]
#[into_params(parameter_in = Query)]
pub struct ListInterviewsQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

#[derive(Deserialize, IntoParams, Debug)]
#[into_params(parameter_in = Query)]
pub struct QuestionBankQuery {
    pub position: String,
    #[serde(default = "default_behavioral_count")]
    pub behavioral_count: usize,
}

fn default_behavioral_count() -> usize {
    5
}

/// Suggested questions for a position, drawn from the prompt catalog.
#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct QuestionBank {
    pub position: String,
    pub technical: Vec<String>,
    pub behavioral: Vec<String>,
    pub follow_up: Option<String>,
}

/// Credentials a participant uses to join the interview room.
#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct InterviewToken {
    pub token: String,
    pub room_name: String,
    pub participant_name: String,
    pub server_url: String,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn interview(status: InterviewStatus) -> Interview {
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        Interview {
            id: Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap(),
            creator_id: "recruiter-1".to_string(),
            candidate_name: "Ada".to_string(),
            position: "Software Engineer".to_string(),
            company_name: None,
            status,
            room_name: "interview-550e8400".to_string(),
            report: None,
            scheduled_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_interview_status_serialization() {
        assert_eq!(
            serde_json::to_string(&InterviewStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
        assert_eq!(
            serde_json::to_string(&InterviewStatus::RoomCreationFailed).unwrap(),
            "\"room_creation_failed\""
        );
        let parsed: InterviewStatus = serde_json::from_str("\"completed\"").unwrap();
        assert_eq!(parsed, InterviewStatus::Completed);
        assert!(serde_json::from_str::<InterviewStatus>("\"Completed\"").is_err());
    }

    #[test]
    fn test_message_role_display() {
        assert_eq!(format!("{}", MessageRole::User), "user");
        assert_eq!(format!("{}", MessageRole::Ai), "ai");
    }

    #[test]
    fn test_interview_serialization() {
        let mut record = interview(InterviewStatus::Completed);
        record.report = Some(json!({"avg_technical_score": 4.0}));

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["status"], "completed");
        assert_eq!(value["report"]["avg_technical_score"], 4.0);
        assert_eq!(value["scheduled_at"], "2024-01-15T10:30:00Z");

        let deserialized: Interview = serde_json::from_value(value).unwrap();
        assert_eq!(deserialized.id, record.id);
        assert_eq!(deserialized.status, record.status);
    }

    #[test]
    fn test_create_interview_payload() {
        let payload: CreateInterviewPayload =
            serde_json::from_str(r#"{"candidate_name": "Ada", "position": "Designer"}"#).unwrap();
        assert_eq!(payload.candidate_name, "Ada");
        assert_eq!(payload.company_name, None);

        let missing: Result<CreateInterviewPayload, _> =
            serde_json::from_str(r#"{"candidate_name": "Ada"}"#);
        assert!(missing.is_err());
    }

    #[test]
    fn test_update_interview_payload_is_partial() {
        let payload: UpdateInterviewPayload = serde_json::from_str(r#"{}"#).unwrap();
        assert!(payload.status.is_none());
        assert!(payload.report.is_none());

        let payload: UpdateInterviewPayload =
            serde_json::from_str(r#"{"status": "in_progress"}"#).unwrap();
        assert_eq!(payload.status, Some(InterviewStatus::InProgress));
    }

    #[test]
    fn test_list_query_defaults() {
        let query: ListInterviewsQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.skip, 0);
        assert_eq!(query.limit, 100);
    }

    #[test]
    fn test_error_response_serialization() {
        let error = ErrorResponse {
            message: "Interview not found".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&error).unwrap(),
            r#"{"message":"Interview not found"}"#
        );
    }
}
