//! Scoring Aggregator and Session Summary Builder
//!
//! Pure derivations over an [`InterviewSession`]: running status snapshots
//! while the interview is in progress and the final report once it completes.

use crate::phase::Phase;
use crate::record::{InterviewSession, NoteEntry, QuestionEntry, ResponseEntry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Two-decimal rounding with exact halves going to the even neighbour.
fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Mean score of the responses recorded during `phase`, rounded to two
/// decimals. Returns `0.0` when the phase has no responses.
pub fn phase_average(responses: &[ResponseEntry], phase: Phase) -> f64 {
    let (sum, count) = responses
        .iter()
        .filter(|entry| entry.phase == phase)
        .fold((0u64, 0u64), |(sum, count), entry| {
            (sum + u64::from(entry.score.value()), count + 1)
        });
    if count == 0 {
        return 0.0;
    }
    round2(sum as f64 / count as f64)
}

/// Read-only snapshot of an interview in progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewStatus {
    pub candidate_name: String,
    pub position: String,
    pub current_phase: Phase,
    pub duration_minutes: i64,
    pub questions_asked: usize,
    pub technical_score: i64,
    pub behavioral_score: i64,
}

impl InterviewStatus {
    pub fn from_session(session: &InterviewSession, now: DateTime<Utc>) -> Self {
        Self {
            candidate_name: session.candidate_name().to_string(),
            position: session.position().to_string(),
            current_phase: session.phase(),
            duration_minutes: session.elapsed_minutes(now),
            questions_asked: session.questions().len(),
            technical_score: session.technical_score_total(),
            behavioral_score: session.behavioral_score_total(),
        }
    }
}

/// The complete logs of a session, copied verbatim into the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedData {
    pub questions: Vec<QuestionEntry>,
    pub responses: Vec<ResponseEntry>,
    pub notes: Vec<NoteEntry>,
}

/// Final report produced when an interview completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewSummary {
    pub candidate_name: String,
    pub position: String,
    pub duration_minutes: i64,
    pub questions_asked: usize,
    pub avg_technical_score: f64,
    pub avg_behavioral_score: f64,
    pub overall_impression: String,
    pub detailed_data: DetailedData,
}

impl InterviewSummary {
    pub fn build(
        session: &InterviewSession,
        overall_impression: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            candidate_name: session.candidate_name().to_string(),
            position: session.position().to_string(),
            duration_minutes: session.elapsed_minutes(now),
            questions_asked: session.questions().len(),
            avg_technical_score: phase_average(session.responses(), Phase::Technical),
            avg_behavioral_score: phase_average(session.responses(), Phase::Behavioral),
            overall_impression: overall_impression.into(),
            detailed_data: DetailedData {
                questions: session.questions().to_vec(),
                responses: session.responses().to_vec(),
                notes: session.notes().to_vec(),
            },
        }
    }
}
