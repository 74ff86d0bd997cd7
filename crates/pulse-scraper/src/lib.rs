//! Scraper collaborator clients, one per source type.
//!
//! Every client speaks to an external service over HTTP and maps whatever
//! that service returns into the common [`RawItem`] shape. Engagement
//! normalization and deduplication are *not* done here; that is the
//! ingestion pipeline's job; a scraper only fetches and reshapes.
//!
//! All clients take `with_base_url` constructors so tests can point them at
//! a wiremock server.

pub mod error;
pub mod feed;
pub mod forum;
pub mod page;
pub mod social;
pub mod types;
pub mod video;

pub use error::ScrapeError;
pub use feed::FeedClient;
pub use forum::ForumClient;
pub use page::PageClient;
pub use social::SocialClient;
pub use types::RawItem;
pub use video::VideoClient;
