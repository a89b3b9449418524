use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Message returned when `advance` is called on a finished interview.
pub const NO_FURTHER_PHASE: &str = "Interview phase already at maximum.";

/// One stage of the fixed interview sequence.
///
/// Phases are strictly ordered; the derived `Ord` follows declaration order,
/// so `Introduction < Technical < ... < Completed`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Introduction,
    Technical,
    Behavioral,
    Closing,
    Completed,
}

impl Phase {
    /// All phases in interview order.
    pub const ALL: [Phase; 5] = [
        Phase::Introduction,
        Phase::Technical,
        Phase::Behavioral,
        Phase::Closing,
        Phase::Completed,
    ];

    /// The stable label used in logs and persisted data.
    pub fn label(self) -> &'static str {
        match self {
            Phase::Introduction => "introduction",
            Phase::Technical => "technical",
            Phase::Behavioral => "behavioral",
            Phase::Closing => "closing",
            Phase::Completed => "completed",
        }
    }

    /// The phase that follows this one, or `None` once completed.
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Introduction => Some(Phase::Technical),
            Phase::Technical => Some(Phase::Behavioral),
            Phase::Behavioral => Some(Phase::Closing),
            Phase::Closing => Some(Phase::Completed),
            Phase::Completed => None,
        }
    }

    /// Whether entering this phase starts a fresh question count.
    pub fn resets_question_count(self) -> bool {
        matches!(self, Phase::Technical | Phase::Behavioral)
    }

    /// What the interviewer announces when the interview enters this phase.
    pub fn announcement(self) -> &'static str {
        match self {
            Phase::Introduction => "Let's start with a quick introduction.",
            Phase::Technical => {
                "Moving to technical questions. I'll now ask about your technical skills and experience."
            }
            Phase::Behavioral => {
                "Great! Now let's discuss some behavioral questions to understand how you work in teams and handle challenges."
            }
            Phase::Closing => {
                "Thank you for those insights. Let me wrap up with some final questions."
            }
            Phase::Completed => "Interview completed successfully!",
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Phase::Completed
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown interview phase: '{0}'")]
pub struct UnknownPhase(pub String);

impl FromStr for Phase {
    type Err = UnknownPhase;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Phase::ALL
            .into_iter()
            .find(|phase| phase.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownPhase(s.to_string()))
    }
}
