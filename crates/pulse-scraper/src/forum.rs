//! Forum community scraper (public JSON listing endpoints).

use std::time::Duration;

use chrono::DateTime;
use serde::Deserialize;

use crate::error::ScrapeError;
use crate::types::{extract_hashtags, RawItem};

const DEFAULT_BASE_URL: &str = "https://www.reddit.com";
const CANONICAL_BASE: &str = "https://www.reddit.com";

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    children: Vec<Thread>,
}

#[derive(Debug, Deserialize)]
struct Thread {
    data: ThreadData,
}

#[derive(Debug, Deserialize)]
struct ThreadData {
    id: String,
    title: Option<String>,
    selftext: Option<String>,
    permalink: Option<String>,
    author: Option<String>,
    created_utc: Option<f64>,
    ups: Option<i64>,
    num_comments: Option<i64>,
    thumbnail: Option<String>,
}

/// Client for forum listing endpoints (`/r/{community}/{sort}.json`).
pub struct ForumClient {
    client: reqwest::Client,
    base_url: String,
}

impl ForumClient {
    /// Creates a client pointed at the production endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, ScrapeError> {
        Self::with_base_url(timeout_secs, user_agent, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn with_base_url(
        timeout_secs: u64,
        user_agent: &str,
        base_url: &str,
    ) -> Result<Self, ScrapeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch threads from a community listing.
    ///
    /// `locator` accepts a bare community name, an `r/name` form, or a full
    /// URL containing `/r/name`. `sort` defaults to `hot`; the `t` (top
    /// timeframe) parameter is only sent for `top`.
    ///
    /// # Errors
    ///
    /// - [`ScrapeError::InvalidLocator`] when no community name can be
    ///   extracted.
    /// - [`ScrapeError::Http`] on network failure or a non-2xx status.
    pub async fn fetch_threads(
        &self,
        locator: &str,
        limit: usize,
        sort: Option<&str>,
        timeframe: Option<&str>,
    ) -> Result<Vec<RawItem>, ScrapeError> {
        let community = extract_community(locator).ok_or_else(|| ScrapeError::InvalidLocator {
            locator: locator.to_string(),
            reason: "expected a community name or /r/<name> URL".to_string(),
        })?;
        let sort = sort.unwrap_or("hot");

        let mut request = self
            .client
            .get(format!("{}/r/{community}/{sort}.json", self.base_url))
            .query(&[("limit", limit.to_string()), ("raw_json", "1".to_string())]);
        if sort == "top" {
            request = request.query(&[("t", timeframe.unwrap_or("day"))]);
        }

        let response = request.send().await?.error_for_status()?;
        let listing: Listing = response.json().await?;

        Ok(listing
            .data
            .children
            .into_iter()
            .map(|thread| map_thread(thread.data))
            .collect())
    }
}

#[allow(clippy::cast_possible_truncation)]
fn map_thread(data: ThreadData) -> RawItem {
    let title = data.title.unwrap_or_default();
    let body = data.selftext.unwrap_or_default();
    let url = data
        .permalink
        .map(|p| format!("{CANONICAL_BASE}{p}"))
        .unwrap_or_default();
    let published_at = data
        .created_utc
        .and_then(|secs| DateTime::from_timestamp(secs as i64, 0));
    let media_urls = data
        .thumbnail
        .filter(|t| t.starts_with("http"))
        .map(|t| vec![t])
        .unwrap_or_default();
    let hashtags = extract_hashtags(&body);

    RawItem {
        external_id: data.id,
        content_text: body,
        author: data.author.unwrap_or_default(),
        published_at,
        engagement_likes: data.ups.unwrap_or(0),
        engagement_shares: 0,
        engagement_comments: data.num_comments.unwrap_or(0),
        engagement_views: 0,
        media_urls,
        hashtags,
        title,
        url,
    }
}

/// Pull the community name out of a locator string.
fn extract_community(locator: &str) -> Option<String> {
    if let Some(idx) = locator.find("r/") {
        let rest = &locator[idx + 2..];
        let name: String = rest
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();
        if !name.is_empty() {
            return Some(name);
        }
    }
    if !locator.is_empty()
        && locator
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Some(locator.to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn listing_body() -> serde_json::Value {
        json!({
            "data": {
                "children": [
                    {
                        "data": {
                            "id": "t3_abc",
                            "title": "Show: my newsletter stack",
                            "selftext": "Built with #rust over a weekend",
                            "permalink": "/r/creator/comments/t3_abc/",
                            "author": "builder",
                            "created_utc": 1_749_000_000.0,
                            "ups": 240,
                            "num_comments": 31,
                            "thumbnail": "https://img.example.com/t.png"
                        }
                    },
                    {
                        "data": { "id": "t3_def" }
                    }
                ]
            }
        })
    }

    #[test]
    fn extract_community_handles_all_locator_shapes() {
        assert_eq!(extract_community("creator"), Some("creator".to_string()));
        assert_eq!(extract_community("r/creator"), Some("creator".to_string()));
        assert_eq!(
            extract_community("https://www.reddit.com/r/creator/"),
            Some("creator".to_string())
        );
        assert_eq!(extract_community("not a community!"), None);
        assert_eq!(extract_community(""), None);
    }

    #[tokio::test]
    async fn fetch_threads_maps_listing_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/r/creator/hot.json"))
            .and(query_param("limit", "20"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing_body()))
            .mount(&server)
            .await;

        let client =
            ForumClient::with_base_url(5, "pulse-test/0.1", &server.uri()).expect("client");
        let items = client
            .fetch_threads("r/creator", 20, None, None)
            .await
            .expect("fetch");

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].external_id, "t3_abc");
        assert_eq!(items[0].engagement_likes, 240);
        assert_eq!(items[0].engagement_comments, 31);
        assert_eq!(items[0].engagement_shares, 0);
        assert_eq!(items[0].hashtags, vec!["rust"]);
        assert!(items[0].url.starts_with("https://www.reddit.com/r/creator/"));
        assert!(items[0].published_at.is_some());
        // Sparse thread: everything defaults, nothing panics.
        assert_eq!(items[1].engagement_likes, 0);
        assert!(items[1].published_at.is_none());
    }

    #[tokio::test]
    async fn top_sort_sends_timeframe() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/r/creator/top.json"))
            .and(query_param("t", "week"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "data": { "children": [] } })),
            )
            .mount(&server)
            .await;

        let client =
            ForumClient::with_base_url(5, "pulse-test/0.1", &server.uri()).expect("client");
        let items = client
            .fetch_threads("creator", 10, Some("top"), Some("week"))
            .await
            .expect("fetch");
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn invalid_locator_is_rejected_before_any_request() {
        let client =
            ForumClient::with_base_url(5, "pulse-test/0.1", "http://127.0.0.1:1").expect("client");
        let result = client.fetch_threads("!!!", 10, None, None).await;
        assert!(matches!(result, Err(ScrapeError::InvalidLocator { .. })));
    }
}
