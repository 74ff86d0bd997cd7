use thiserror::Error;

#[derive(Debug, Error)]
pub enum ComposeError {
    /// The categorized pool fell below the item floor. Recoverable: scrape
    /// more content and retry; never persists anything.
    #[error("insufficient content: {found} tiered items, need {minimum}")]
    InsufficientContent { found: usize, minimum: usize },

    /// The generative-text backend errored, timed out, or returned output
    /// we could not parse. No partial draft is persisted.
    #[error("generation failed: {0}")]
    GenerationFailed(String),

    /// The style analysis returned no parseable JSON payload at all; the
    /// stored profile (if any) is left untouched.
    #[error("voice analysis returned no parseable payload")]
    VoiceAnalysisFailed,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("database error: {0}")]
    Db(#[from] pulse_db::DbError),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
