//! Content ingestion pipeline.
//!
//! Dispatches a scrape per source, normalizes engagement once, inserts with
//! dedup riding on the database's unique index, and keeps the source's run
//! bookkeeping current. One source's failure never blocks its siblings.

pub mod error;
pub mod pipeline;
pub mod types;

pub use error::IngestError;
pub use pipeline::{run_all_sources, run_source, run_user_sources};
pub use types::{IngestConfig, IngestSummary, ScraperSet, SourceScrapeResult};
