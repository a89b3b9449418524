//! Session Record
//!
//! Accumulated state of one candidate interview. The record is the single
//! source of truth for the session: the question, response and note logs are
//! append-only, every entry carries the phase that was active when it was
//! written, and the per-phase score totals are maintained incrementally as
//! responses arrive.

use crate::error::InterviewError;
use crate::phase::{NO_FURTHER_PHASE, Phase};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A response score in `[1, 5]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Score(u8);

impl Score {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(score: i64) -> Result<Self, InterviewError> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&score) {
            Ok(Self(score as u8))
        } else {
            Err(InterviewError::ScoreOutOfRange { score })
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Score {
    type Error = InterviewError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Score::new(value)
    }
}

impl From<Score> for u8 {
    fn from(score: Score) -> Self {
        score.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionEntry {
    pub question: String,
    pub timestamp: DateTime<Utc>,
    pub phase: Phase,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEntry {
    pub summary: String,
    pub score: Score,
    pub timestamp: DateTime<Utc>,
    pub phase: Phase,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEntry {
    pub note: String,
    pub timestamp: DateTime<Utc>,
    pub phase: Phase,
}

/// The outcome of a phase advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The interview moved from `from` to `to`.
    Advanced { from: Phase, to: Phase },
    /// The interview was already completed; nothing changed.
    AtFinalPhase,
}

impl Transition {
    /// The message announced to the candidate for this transition.
    pub fn announcement(self) -> &'static str {
        match self {
            Transition::Advanced { to, .. } => to.announcement(),
            Transition::AtFinalPhase => NO_FURTHER_PHASE,
        }
    }
}

/// State of one interview session.
///
/// Deserialization rejects records whose score totals disagree with the
/// response log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredSession")]
pub struct InterviewSession {
    candidate_name: String,
    position: String,
    phase: Phase,
    questions: Vec<QuestionEntry>,
    responses: Vec<ResponseEntry>,
    notes: Vec<NoteEntry>,
    technical_score_total: i64,
    behavioral_score_total: i64,
    questions_in_phase: u32,
    start_time: DateTime<Utc>,
}

/// Wire form of [`InterviewSession`], checked before it becomes one.
#[derive(Deserialize)]
struct StoredSession {
    candidate_name: String,
    position: String,
    phase: Phase,
    questions: Vec<QuestionEntry>,
    responses: Vec<ResponseEntry>,
    notes: Vec<NoteEntry>,
    technical_score_total: i64,
    behavioral_score_total: i64,
    questions_in_phase: u32,
    start_time: DateTime<Utc>,
}

impl TryFrom<StoredSession> for InterviewSession {
    type Error = InterviewError;

    fn try_from(stored: StoredSession) -> Result<Self, Self::Error> {
        let session = Self {
            candidate_name: stored.candidate_name,
            position: stored.position,
            phase: stored.phase,
            questions: stored.questions,
            responses: stored.responses,
            notes: stored.notes,
            technical_score_total: stored.technical_score_total,
            behavioral_score_total: stored.behavioral_score_total,
            questions_in_phase: stored.questions_in_phase,
            start_time: stored.start_time,
        };
        if !session.totals_consistent() {
            let (technical, behavioral) = session.recomputed_totals();
            return Err(InterviewError::InconsistentTotals {
                technical: session.technical_score_total,
                behavioral: session.behavioral_score_total,
                expected_technical: technical,
                expected_behavioral: behavioral,
            });
        }
        Ok(session)
    }
}

impl InterviewSession {
    /// Starts a new session in the introduction phase.
    pub fn new(start_time: DateTime<Utc>) -> Self {
        Self {
            candidate_name: String::new(),
            position: String::new(),
            phase: Phase::Introduction,
            questions: Vec::new(),
            responses: Vec::new(),
            notes: Vec::new(),
            technical_score_total: 0,
            behavioral_score_total: 0,
            questions_in_phase: 0,
            start_time,
        }
    }

    pub fn candidate_name(&self) -> &str {
        &self.candidate_name
    }

    pub fn position(&self) -> &str {
        &self.position
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn questions(&self) -> &[QuestionEntry] {
        &self.questions
    }

    pub fn responses(&self) -> &[ResponseEntry] {
        &self.responses
    }

    pub fn notes(&self) -> &[NoteEntry] {
        &self.notes
    }

    pub fn technical_score_total(&self) -> i64 {
        self.technical_score_total
    }

    pub fn behavioral_score_total(&self) -> i64 {
        self.behavioral_score_total
    }

    pub fn questions_in_phase(&self) -> u32 {
        self.questions_in_phase
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Whole minutes elapsed between the session start and `now`.
    pub fn elapsed_minutes(&self, now: DateTime<Utc>) -> i64 {
        (now - self.start_time).num_seconds().max(0) / 60
    }

    /// Sets (or overwrites) the candidate's name and position.
    pub fn set_candidate_info(&mut self, name: impl Into<String>, position: impl Into<String>) {
        self.candidate_name = name.into();
        self.position = position.into();
    }

    pub fn record_question(&mut self, question: impl Into<String>, at: DateTime<Utc>) {
        self.questions.push(QuestionEntry {
            question: question.into(),
            timestamp: at,
            phase: self.phase,
        });
        self.questions_in_phase += 1;
    }

    /// Validates and records a scored response.
    ///
    /// An out-of-range score leaves the record untouched.
    pub fn record_response(
        &mut self,
        summary: impl Into<String>,
        score: i64,
        at: DateTime<Utc>,
    ) -> Result<Score, InterviewError> {
        let score = Score::new(score)?;
        self.responses.push(ResponseEntry {
            summary: summary.into(),
            score,
            timestamp: at,
            phase: self.phase,
        });
        match self.phase {
            Phase::Technical => self.technical_score_total += i64::from(score.value()),
            Phase::Behavioral => self.behavioral_score_total += i64::from(score.value()),
            _ => {}
        }
        Ok(score)
    }

    pub fn add_note(&mut self, note: impl Into<String>, at: DateTime<Utc>) {
        self.notes.push(NoteEntry {
            note: note.into(),
            timestamp: at,
            phase: self.phase,
        });
    }

    /// Moves to the next phase. A completed session stays completed.
    pub fn advance(&mut self) -> Transition {
        let from = self.phase;
        match from.next() {
            Some(to) => {
                self.phase = to;
                if to.resets_question_count() {
                    self.questions_in_phase = 0;
                }
                Transition::Advanced { from, to }
            }
            None => Transition::AtFinalPhase,
        }
    }

    /// Jumps straight to `Completed`, whatever the current phase.
    pub fn force_complete(&mut self) {
        self.phase = Phase::Completed;
    }

    /// Recomputes `(technical, behavioral)` totals from the response log.
    pub fn recomputed_totals(&self) -> (i64, i64) {
        self.responses
            .iter()
            .fold((0, 0), |(technical, behavioral), entry| match entry.phase {
                Phase::Technical => (technical + i64::from(entry.score.value()), behavioral),
                Phase::Behavioral => (technical, behavioral + i64::from(entry.score.value())),
                _ => (technical, behavioral),
            })
    }

    /// Whether the incrementally maintained totals agree with the log.
    pub fn totals_consistent(&self) -> bool {
        self.recomputed_totals() == (self.technical_score_total, self.behavioral_score_total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn session_in(phase: Phase) -> InterviewSession {
        let mut session = InterviewSession::new(start());
        while session.phase() != phase {
            session.advance();
        }
        session
    }

    #[test]
    fn test_new_session_defaults() {
        let session = InterviewSession::new(start());
        assert_eq!(session.phase(), Phase::Introduction);
        assert!(session.candidate_name().is_empty());
        assert!(session.position().is_empty());
        assert!(session.questions().is_empty());
        assert_eq!(session.questions_in_phase(), 0);
        assert_eq!(session.start_time(), start());
    }

    #[test]
    fn test_valid_scores_add_to_technical_total_only() {
        for s in 1..=5 {
            let mut session = session_in(Phase::Technical);
            let before_behavioral = session.behavioral_score_total();
            let score = session.record_response("answer", s, start()).unwrap();
            assert_eq!(i64::from(score.value()), s);
            assert_eq!(session.technical_score_total(), s);
            assert_eq!(session.behavioral_score_total(), before_behavioral);
        }
    }

    #[test]
    fn test_valid_scores_add_to_behavioral_total_only() {
        let mut session = session_in(Phase::Behavioral);
        session.record_response("a", 2, start()).unwrap();
        session.record_response("b", 5, start()).unwrap();
        assert_eq!(session.behavioral_score_total(), 7);
        assert_eq!(session.technical_score_total(), 0);
    }

    #[test]
    fn test_out_of_range_scores_are_rejected_without_side_effects() {
        for s in [0, 6, -1, i64::MAX, i64::MIN] {
            let mut session = session_in(Phase::Technical);
            let snapshot = session.clone();
            let err = session.record_response("answer", s, start()).unwrap_err();
            assert!(matches!(err, InterviewError::ScoreOutOfRange { score } if score == s));
            assert_eq!(session, snapshot);
        }
    }

    #[test]
    fn test_scores_outside_scored_phases_count_towards_no_total() {
        let mut session = InterviewSession::new(start());
        session.record_response("intro chat", 4, start()).unwrap();
        for _ in 0..3 {
            session.advance();
        }
        assert_eq!(session.phase(), Phase::Closing);
        session.record_response("closing remarks", 3, start()).unwrap();
        assert_eq!(session.responses().len(), 2);
        assert_eq!(session.technical_score_total(), 0);
        assert_eq!(session.behavioral_score_total(), 0);
        assert!(session.totals_consistent());
    }

    #[test]
    fn test_advance_walks_every_phase_then_stops() {
        let mut session = InterviewSession::new(start());
        let expected = [
            (Phase::Introduction, Phase::Technical),
            (Phase::Technical, Phase::Behavioral),
            (Phase::Behavioral, Phase::Closing),
            (Phase::Closing, Phase::Completed),
        ];
        for (from, to) in expected {
            assert_eq!(session.advance(), Transition::Advanced { from, to });
        }
        assert_eq!(session.phase(), Phase::Completed);

        let first = session.advance();
        let second = session.advance();
        assert_eq!(first, Transition::AtFinalPhase);
        assert_eq!(first.announcement(), second.announcement());
        assert_eq!(first.announcement(), NO_FURTHER_PHASE);
        assert_eq!(session.phase(), Phase::Completed);
    }

    #[test]
    fn test_question_counter_resets_only_entering_technical_and_behavioral() {
        let mut session = InterviewSession::new(start());
        session.record_question("intro", start());
        session.record_question("background", start());
        assert_eq!(session.questions_in_phase(), 2);

        session.advance();
        assert_eq!(session.questions_in_phase(), 0);
        session.record_question("tech", start());
        assert_eq!(session.questions_in_phase(), 1);

        session.advance();
        assert_eq!(session.questions_in_phase(), 0);
        session.record_question("behavioral 1", start());
        session.record_question("behavioral 2", start());

        session.advance();
        assert_eq!(session.phase(), Phase::Closing);
        assert_eq!(session.questions_in_phase(), 2);

        session.advance();
        assert_eq!(session.phase(), Phase::Completed);
        assert_eq!(session.questions_in_phase(), 2);
        assert_eq!(session.questions().len(), 5);
    }

    #[test]
    fn test_entries_keep_their_original_phase_tag() {
        let mut session = InterviewSession::new(start());
        session.record_question("q-intro", start());
        session.add_note("n-intro", start());
        session.advance();
        session.record_response("r-tech", 4, start()).unwrap();
        session.advance();
        session.add_note("n-behavioral", start());
        session.advance();
        session.advance();
        session.force_complete();

        assert_eq!(session.questions()[0].phase, Phase::Introduction);
        assert_eq!(session.notes()[0].phase, Phase::Introduction);
        assert_eq!(session.responses()[0].phase, Phase::Technical);
        assert_eq!(session.notes()[1].phase, Phase::Behavioral);
    }

    #[test]
    fn test_force_complete_from_any_phase() {
        let mut session = session_in(Phase::Technical);
        session.force_complete();
        assert_eq!(session.phase(), Phase::Completed);
        assert_eq!(session.advance(), Transition::AtFinalPhase);
    }

    #[test]
    fn test_candidate_info_is_overwritable() {
        let mut session = InterviewSession::new(start());
        session.set_candidate_info("Ada", "Software Engineer");
        session.set_candidate_info("Ada Lovelace", "Data Scientist");
        assert_eq!(session.candidate_name(), "Ada Lovelace");
        assert_eq!(session.position(), "Data Scientist");
    }

    #[test]
    fn test_elapsed_minutes_floors() {
        let session = InterviewSession::new(start());
        assert_eq!(session.elapsed_minutes(start()), 0);
        assert_eq!(session.elapsed_minutes(start() + Duration::seconds(59)), 0);
        assert_eq!(session.elapsed_minutes(start() + Duration::seconds(61)), 1);
        assert_eq!(session.elapsed_minutes(start() + Duration::seconds(14 * 60 + 59)), 14);
    }

    #[test]
    fn test_totals_recompute_from_the_log() {
        let mut session = session_in(Phase::Technical);
        session.record_response("a", 3, start()).unwrap();
        session.record_response("b", 5, start()).unwrap();
        session.advance();
        session.record_response("c", 1, start()).unwrap();
        let _ = session.record_response("bad", 9, start());
        assert_eq!(session.recomputed_totals(), (8, 1));
        assert!(session.totals_consistent());
    }

    #[test]
    fn test_snapshot_rejects_invalid_score_on_load() {
        let mut session = session_in(Phase::Technical);
        session.record_response("a", 3, start()).unwrap();
        let json = serde_json::to_string(&session).unwrap();
        let restored: InterviewSession = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, session);

        let tampered = json.replace("\"score\":3", "\"score\":7");
        assert!(serde_json::from_str::<InterviewSession>(&tampered).is_err());
    }

    #[test]
    fn test_snapshot_rejects_totals_that_disagree_with_log() {
        let mut session = session_in(Phase::Technical);
        session.record_response("a", 3, start()).unwrap();
        let mut value = serde_json::to_value(&session).unwrap();
        value["technical_score_total"] = serde_json::json!(9);

        let err = serde_json::from_value::<InterviewSession>(value).unwrap_err();
        assert!(err.to_string().contains("disagree with the response log"));
    }
}
