//! RSS/Atom feed scraper (newsletters and blogs).

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::ScrapeError;
use crate::types::{derive_external_id, strip_html, RawItem};

/// Client for plain RSS/Atom feeds. Feeds carry no engagement counters, so
/// every item comes back with zeroed engagement.
pub struct FeedClient {
    client: reqwest::Client,
}

impl FeedClient {
    /// Creates a feed client with the given request timeout and user agent.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, ScrapeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    /// Fetch a feed and return up to `max_items` entries, newest-listed
    /// first (feed order is preserved).
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Http`] on network failure or a non-2xx
    /// status, or [`ScrapeError::Feed`] on malformed XML.
    pub async fn fetch_items(
        &self,
        feed_url: &str,
        max_items: usize,
    ) -> Result<Vec<RawItem>, ScrapeError> {
        let response = self.client.get(feed_url).send().await?;
        let response = response.error_for_status()?;
        let body = response.bytes().await?;
        parse_feed(&body, max_items)
    }
}

/// Parse feed XML into raw items. Split out of the client so malformed-feed
/// handling is testable without a server.
///
/// # Errors
///
/// Returns [`ScrapeError::Feed`] if the bytes are not a parseable feed.
pub(crate) fn parse_feed(bytes: &[u8], max_items: usize) -> Result<Vec<RawItem>, ScrapeError> {
    let feed = feed_rs::parser::parse(bytes)?;
    let feed_title = feed
        .title
        .as_ref()
        .map(|t| t.content.clone())
        .unwrap_or_default();

    let items = feed
        .entries
        .into_iter()
        .take(max_items)
        .map(|entry| {
            let title = entry
                .title
                .as_ref()
                .map(|t| t.content.clone())
                .unwrap_or_default();
            let url = entry
                .links
                .first()
                .map(|l| l.href.clone())
                .unwrap_or_default();
            let body = entry
                .content
                .as_ref()
                .and_then(|c| c.body.clone())
                .or_else(|| entry.summary.as_ref().map(|s| s.content.clone()))
                .unwrap_or_default();
            let author = entry
                .authors
                .first()
                .map_or_else(|| feed_title.clone(), |a| a.name.clone());
            let published: Option<DateTime<Utc>> = entry.published.or(entry.updated);

            let external_id = if entry.id.is_empty() {
                if url.is_empty() {
                    derive_external_id(&[&title, &body])
                } else {
                    url.clone()
                }
            } else {
                entry.id
            };

            let media_urls: Vec<String> = entry
                .media
                .iter()
                .flat_map(|m| m.content.iter())
                .filter_map(|c| c.url.as_ref().map(ToString::to_string))
                .collect();

            RawItem {
                external_id,
                title,
                content_text: strip_html(&body),
                url,
                author,
                published_at: published,
                engagement_likes: 0,
                engagement_shares: 0,
                engagement_comments: 0,
                engagement_views: 0,
                media_urls,
                hashtags: Vec::new(),
            }
        })
        .collect();

    Ok(items)
}
