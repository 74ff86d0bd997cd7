use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("scrape failed: {0}")]
    Scrape(#[from] pulse_scraper::ScrapeError),

    #[error("database error: {0}")]
    Db(#[from] pulse_db::DbError),

    #[error("unknown source type: {0}")]
    UnknownSourceType(String),
}
