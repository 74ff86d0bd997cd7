//! Generic web-page scraper, backed by a neural content-extraction API.
//!
//! Arbitrary pages carry no engagement counters; every extracted item comes
//! back with zeroed engagement and the extraction service's own result id
//! as the external id.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::error::ScrapeError;
use crate::types::{derive_external_id, RawItem};

const DEFAULT_BASE_URL: &str = "https://api.exa.ai";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    id: Option<String>,
    title: Option<String>,
    url: String,
    #[serde(rename = "publishedDate")]
    published_date: Option<DateTime<Utc>>,
    author: Option<String>,
    text: Option<String>,
    summary: Option<String>,
}

/// Client for the content-extraction API.
pub struct PageClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl PageClient {
    /// Creates a client pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(api_key: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, ScrapeError> {
        Self::with_base_url(api_key, timeout_secs, user_agent, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn with_base_url(
        api_key: &str,
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
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Extract the content behind one URL.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Http`] on network failure or a non-2xx status.
    pub async fn extract_page(&self, page_url: &str) -> Result<Vec<RawItem>, ScrapeError> {
        let body = json!({
            "query": page_url,
            "type": "neural",
            "numResults": 1,
            "contents": { "text": true, "summary": true },
        });

        let response: SearchResponse = self
            .client
            .post(format!("{}/search", self.base_url))
            .header("x-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.results.into_iter().map(map_result).collect())
    }
}

fn map_result(result: SearchResult) -> RawItem {
    let content = result
        .text
        .or(result.summary)
        .unwrap_or_default();
    let external_id = result
        .id
        .unwrap_or_else(|| derive_external_id(&[&result.url]));

    RawItem {
        external_id,
        title: result.title.unwrap_or_default(),
        content_text: content,
        url: result.url,
        author: result.author.unwrap_or_default(),
        published_at: result.published_date,
        engagement_likes: 0,
        engagement_shares: 0,
        engagement_comments: 0,
        engagement_views: 0,
        media_urls: Vec::new(),
        hashtags: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn extract_page_maps_results() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header("x-api-key", "pk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{
                    "id": "doc-9",
                    "title": "State of the creator economy",
                    "url": "https://blog.example.com/state",
                    "publishedDate": "2025-06-01T00:00:00Z",
                    "author": "Analyst",
                    "text": "Long-form analysis body."
                }]
            })))
            .mount(&server)
            .await;

        let client =
            PageClient::with_base_url("pk-test", 5, "pulse-test/0.1", &server.uri())
                .expect("client");
        let items = client
            .extract_page("https://blog.example.com/state")
            .await
            .expect("extract");

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].external_id, "doc-9");
        assert_eq!(items[0].content_text, "Long-form analysis body.");
        assert_eq!(items[0].engagement_likes, 0);
    }

    #[tokio::test]
    async fn missing_result_id_derives_one_from_the_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{ "url": "https://blog.example.com/no-id" }]
            })))
            .mount(&server)
            .await;

        let client =
            PageClient::with_base_url("pk-test", 5, "pulse-test/0.1", &server.uri())
                .expect("client");
        let items = client
            .extract_page("https://blog.example.com/no-id")
            .await
            .expect("extract");
        assert_eq!(items[0].external_id.len(), 64);
    }
}
