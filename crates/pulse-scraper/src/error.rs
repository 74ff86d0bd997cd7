use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("feed parse error: {0}")]
    Feed(#[from] feed_rs::parser::ParseFeedError),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid locator '{locator}': {reason}")]
    InvalidLocator { locator: String, reason: String },

    #[error("missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("scrape service error: {0}")]
    Api(String),
}
