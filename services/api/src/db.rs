//! Data Access Layer
//!
//! All interaction with PostgreSQL goes through [`Db`]. Queries are checked at
//! runtime with `sqlx::query_as`, so the crate builds without a live database.

use anyhow::Result;
use interviewer_core::InterviewSession;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Interview, InterviewStatus, Message, MessageRole, UpdateInterviewPayload};

const INTERVIEW_COLUMNS: &str = "id, creator_id, candidate_name, position, company_name, status, room_name, report, scheduled_at, updated_at";

/// A wrapper around the `PgPool` to provide a clear data access interface.
#[derive(Clone)]
pub struct Db {
    pool: PgPool,
}

/// Fields needed to schedule a new interview.
pub struct NewInterview<'a> {
    pub creator_id: &'a str,
    pub candidate_name: &'a str,
    pub position: &'a str,
    pub company_name: Option<&'a str>,
    pub room_name: &'a str,
}

impl Db {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs all pending `sqlx` migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Creates an interview. Its session record is started on first connect.
    pub async fn create_interview(&self, new: NewInterview<'_>) -> Result<Interview> {
        let interview = sqlx::query_as::<_, Interview>(&format!(
            "INSERT INTO interviews (creator_id, candidate_name, position, company_name, room_name)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {INTERVIEW_COLUMNS}"
        ))
        .bind(new.creator_id)
        .bind(new.candidate_name)
        .bind(new.position)
        .bind(new.company_name)
        .bind(new.room_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(interview)
    }

    /// Retrieves a single interview by its ID, scoped to its creator.
    pub async fn get_interview(&self, id: Uuid, creator_id: &str) -> Result<Option<Interview>> {
        let interview = sqlx::query_as::<_, Interview>(&format!(
            "SELECT {INTERVIEW_COLUMNS} FROM interviews WHERE id = $1 AND creator_id = $2"
        ))
        .bind(id)
        .bind(creator_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(interview)
    }

    /// Lists a creator's interviews, most recently scheduled first.
    pub async fn list_interviews(
        &self,
        creator_id: &str,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Interview>> {
        let interviews = sqlx::query_as::<_, Interview>(&format!(
            "SELECT {INTERVIEW_COLUMNS} FROM interviews
             WHERE creator_id = $1
             ORDER BY scheduled_at DESC
             OFFSET $2 LIMIT $3"
        ))
        .bind(creator_id)
        .bind(skip.max(0))
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;
        Ok(interviews)
    }

    /// Applies a partial update; absent fields keep their current value.
    pub async fn update_interview(
        &self,
        id: Uuid,
        update: &UpdateInterviewPayload,
    ) -> Result<Interview> {
        let interview = sqlx::query_as::<_, Interview>(&format!(
            "UPDATE interviews
             SET status = COALESCE($1, status), report = COALESCE($2, report)
             WHERE id = $3
             RETURNING {INTERVIEW_COLUMNS}"
        ))
        .bind(update.status)
        .bind(update.report.clone())
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(interview)
    }

    pub async fn set_status(&self, id: Uuid, status: InterviewStatus) -> Result<Interview> {
        self.update_interview(
            id,
            &UpdateInterviewPayload {
                status: Some(status),
                report: None,
            },
        )
        .await
    }

    /// Stores the completion report and marks the interview completed.
    pub async fn save_report(&self, id: Uuid, report: serde_json::Value) -> Result<Interview> {
        self.update_interview(
            id,
            &UpdateInterviewPayload {
                status: Some(InterviewStatus::Completed),
                report: Some(report),
            },
        )
        .await
    }

    /// Adds a new message to an interview's conversation history.
    pub async fn add_message(
        &self,
        interview_id: Uuid,
        role: MessageRole,
        content: &str,
    ) -> Result<Message> {
        let message = sqlx::query_as::<_, Message>(
            "INSERT INTO messages (interview_id, role, content)
             VALUES ($1, $2, $3)
             RETURNING id, interview_id, role, content, created_at",
        )
        .bind(interview_id)
        .bind(role)
        .bind(content)
        .fetch_one(&self.pool)
        .await?;
        Ok(message)
    }

    /// Retrieves the full message history, ordered chronologically.
    pub async fn get_interview_messages(&self, interview_id: Uuid) -> Result<Vec<Message>> {
        let messages = sqlx::query_as::<_, Message>(
            "SELECT id, interview_id, role, content, created_at
             FROM messages
             WHERE interview_id = $1
             ORDER BY id ASC",
        )
        .bind(interview_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    /// Retrieves the most recent session snapshot for an interview.
    pub async fn get_latest_session(&self, interview_id: Uuid) -> Result<Option<InterviewSession>> {
        let record: Option<(serde_json::Value,)> = sqlx::query_as(
            "SELECT state_json FROM session_states WHERE interview_id = $1 ORDER BY id DESC LIMIT 1",
        )
        .bind(interview_id)
        .fetch_optional(&self.pool)
        .await?;

        match record {
            Some((state_json,)) => Ok(Some(serde_json::from_value(state_json)?)),
            None => Ok(None),
        }
    }

    /// Persists a new version of the session record.
    pub async fn save_session(&self, interview_id: Uuid, session: &InterviewSession) -> Result<()> {
        let state_json = serde_json::to_value(session)?;
        sqlx::query("INSERT INTO session_states (interview_id, state_json) VALUES ($1, $2)")
            .bind(interview_id)
            .bind(state_json)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
