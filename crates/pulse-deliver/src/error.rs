use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeliverError {
    /// No draft in `draft` status exists for the user.
    #[error("no unsent draft to deliver")]
    NoDraft,

    /// No active recipient has email notifications enabled.
    #[error("no recipients with email notifications enabled")]
    NoRecipients,

    /// Some recipients failed; the draft stays unsent so a retry covers
    /// everyone. There is no per-recipient resume.
    #[error("delivery partially failed: {failed} of {attempted} recipients")]
    PartialFailure { attempted: usize, failed: usize },

    #[error("email API error: {0}")]
    Api(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("database error: {0}")]
    Db(#[from] pulse_db::DbError),
}
