use std::path::PathBuf;

/// Errors raised by the interview core.
///
/// None of these escape a tool call: the controller turns them into a reply
/// the dialogue loop can act on.
#[derive(Debug, thiserror::Error)]
pub enum InterviewError {
    #[error("Score must be between 1 and 5.")]
    ScoreOutOfRange { score: i64 },
    #[error(
        "Score totals ({technical}, {behavioral}) disagree with the response log ({expected_technical}, {expected_behavioral})"
    )]
    InconsistentTotals {
        technical: i64,
        behavioral: i64,
        expected_technical: i64,
        expected_behavioral: i64,
    },
    #[error("Failed to read prompt catalog at {path}: {source}")]
    CatalogRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse prompt catalog at {path}: {source}")]
    CatalogParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
