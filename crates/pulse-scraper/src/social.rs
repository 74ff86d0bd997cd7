//! Social timeline scraper, driven through a hosted actor-run service.
//!
//! The service runs scraping "actors" asynchronously: start a run, poll its
//! status, then page the result dataset. A run that does not reach
//! `SUCCEEDED` within the polling budget is a scrape failure for this
//! source only.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::error::ScrapeError;
use crate::types::{extract_hashtags, RawItem};

const DEFAULT_BASE_URL: &str = "https://api.apify.com";
const ACTOR_ID: &str = "apidojo~tweet-scraper";
const MAX_POLL_ATTEMPTS: u32 = 24;

#[derive(Debug, Deserialize)]
struct RunEnvelope {
    data: RunData,
}

#[derive(Debug, Deserialize)]
struct RunData {
    id: String,
    status: String,
    #[serde(rename = "defaultDatasetId")]
    default_dataset_id: String,
}

#[derive(Debug, Deserialize)]
struct DatasetPost {
    id: Option<String>,
    url: Option<String>,
    text: Option<String>,
    #[serde(rename = "createdAt")]
    created_at: Option<String>,
    #[serde(rename = "likeCount")]
    like_count: Option<i64>,
    #[serde(rename = "retweetCount")]
    retweet_count: Option<i64>,
    #[serde(rename = "replyCount")]
    reply_count: Option<i64>,
    #[serde(rename = "viewCount")]
    view_count: Option<i64>,
    author: Option<DatasetAuthor>,
    #[serde(rename = "mediaUrls", default)]
    media_urls: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DatasetAuthor {
    #[serde(rename = "userName")]
    user_name: Option<String>,
}

/// Client for the social actor-run service.
pub struct SocialClient {
    client: reqwest::Client,
    token: String,
    base_url: String,
    poll_interval: Duration,
}

impl SocialClient {
    /// Creates a client pointed at the production service.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(token: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, ScrapeError> {
        Self::with_base_url(token, timeout_secs, user_agent, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn with_base_url(
        token: &str,
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
            token: token.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            poll_interval: Duration::from_secs(5),
        })
    }

    /// Overrides the run-status polling interval. Tests use a short
    /// interval; production keeps the 5-second default.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Fetch recent posts from an account timeline.
    ///
    /// # Errors
    ///
    /// - [`ScrapeError::Http`] on network failure or a non-2xx status.
    /// - [`ScrapeError::Api`] when the actor run ends in a non-success
    ///   state or exceeds the polling budget.
    pub async fn fetch_posts(
        &self,
        handle: &str,
        max_items: usize,
    ) -> Result<Vec<RawItem>, ScrapeError> {
        let handle = handle.trim_start_matches('@');
        let input = json!({
            "twitterHandles": [handle],
            "maxItems": max_items,
            "sort": "Latest",
        });

        let run: RunEnvelope = self
            .client
            .post(format!(
                "{}/v2/acts/{ACTOR_ID}/runs?token={}",
                self.base_url, self.token
            ))
            .json(&input)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let run = self.wait_for_run(run.data).await?;

        let posts: Vec<DatasetPost> = self
            .client
            .get(format!(
                "{}/v2/datasets/{}/items?token={}",
                self.base_url, run.default_dataset_id, self.token
            ))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(posts.into_iter().map(map_post).collect())
    }

    /// Poll the run until it leaves `RUNNING`/`READY`, within the attempt
    /// budget.
    async fn wait_for_run(&self, mut run: RunData) -> Result<RunData, ScrapeError> {
        let mut attempts = 0;
        while matches!(run.status.as_str(), "RUNNING" | "READY") {
            if attempts >= MAX_POLL_ATTEMPTS {
                return Err(ScrapeError::Api(format!(
                    "actor run {} still {} after {attempts} polls",
                    run.id, run.status
                )));
            }
            attempts += 1;
            tracing::debug!(run_id = %run.id, attempts, "social: actor run still pending");
            tokio::time::sleep(self.poll_interval).await;

            let envelope: RunEnvelope = self
                .client
                .get(format!(
                    "{}/v2/acts/{ACTOR_ID}/runs/{}?token={}",
                    self.base_url, run.id, self.token
                ))
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            run = envelope.data;
        }

        if run.status != "SUCCEEDED" {
            return Err(ScrapeError::Api(format!(
                "actor run {} finished with status {}",
                run.id, run.status
            )));
        }
        Ok(run)
    }
}

fn map_post(post: DatasetPost) -> RawItem {
    let text = post.text.unwrap_or_default();
    let title = text.lines().next().unwrap_or_default().to_string();
    let author = post
        .author
        .and_then(|a| a.user_name)
        .unwrap_or_default();
    let url = post.url.unwrap_or_default();
    let external_id = post.id.unwrap_or_else(|| url.clone());
    let published_at = post.created_at.as_deref().and_then(parse_post_timestamp);
    let hashtags = extract_hashtags(&text);

    RawItem {
        external_id,
        title,
        content_text: text,
        url,
        author,
        published_at,
        engagement_likes: post.like_count.unwrap_or(0),
        engagement_shares: post.retweet_count.unwrap_or(0),
        engagement_comments: post.reply_count.unwrap_or(0),
        engagement_views: post.view_count.unwrap_or(0),
        media_urls: post.media_urls,
        hashtags,
    }
}

/// Timestamps arrive either as RFC 3339 or in the legacy
/// `Wed Jun 04 09:00:00 +0000 2025` form; anything else is treated as absent.
fn parse_post_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    DateTime::parse_from_str(raw, "%a %b %d %H:%M:%S %z %Y")
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn run_body(status: &str) -> serde_json::Value {
        json!({ "data": { "id": "run-1", "status": status, "defaultDatasetId": "ds-1" } })
    }

    fn dataset_body() -> serde_json::Value {
        json!([
            {
                "id": "1800000000000000001",
                "url": "https://x.com/maker/status/1800000000000000001",
                "text": "We just shipped the new editor\nmore below #shipping",
                "createdAt": "2025-06-04T09:00:00Z",
                "likeCount": 320,
                "retweetCount": 45,
                "replyCount": 12,
                "viewCount": 15000,
                "author": { "userName": "maker" },
                "mediaUrls": ["https://img.example.com/editor.png"]
            },
            { "text": "sparse post" }
        ])
    }

    #[tokio::test]
    async fn fetch_posts_runs_actor_and_maps_dataset() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/v2/acts/.+/runs$"))
            .respond_with(ResponseTemplate::new(201).set_body_json(run_body("SUCCEEDED")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/v2/datasets/ds-1/items$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(dataset_body()))
            .mount(&server)
            .await;

        let client = SocialClient::with_base_url("tok", 5, "pulse-test/0.1", &server.uri())
            .expect("client");
        let items = client.fetch_posts("@maker", 50).await.expect("fetch");

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].external_id, "1800000000000000001");
        assert_eq!(items[0].title, "We just shipped the new editor");
        assert_eq!(items[0].author, "maker");
        assert_eq!(items[0].engagement_shares, 45);
        assert_eq!(items[0].engagement_views, 15_000);
        assert_eq!(items[0].hashtags, vec!["shipping"]);
        assert!(items[0].published_at.is_some());
        assert!(items[1].published_at.is_none());
    }

    #[tokio::test]
    async fn failed_run_is_an_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/v2/acts/.+/runs$"))
            .respond_with(ResponseTemplate::new(201).set_body_json(run_body("FAILED")))
            .mount(&server)
            .await;

        let client = SocialClient::with_base_url("tok", 5, "pulse-test/0.1", &server.uri())
            .expect("client");
        let result = client.fetch_posts("maker", 10).await;
        assert!(matches!(result, Err(ScrapeError::Api(_))));
    }

    #[tokio::test]
    async fn running_run_is_polled_until_succeeded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/v2/acts/.+/runs$"))
            .respond_with(ResponseTemplate::new(201).set_body_json(run_body("RUNNING")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/v2/acts/.+/runs/run-1$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(run_body("SUCCEEDED")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/v2/datasets/ds-1/items$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let client = SocialClient::with_base_url("tok", 5, "pulse-test/0.1", &server.uri())
            .expect("client")
            .with_poll_interval(Duration::from_millis(5));
        let items = client.fetch_posts("maker", 10).await.expect("fetch");
        assert!(items.is_empty());
    }

    #[test]
    fn legacy_timestamp_format_parses() {
        let parsed = parse_post_timestamp("Wed Jun 04 09:00:00 +0000 2025");
        assert!(parsed.is_some());
        assert!(parse_post_timestamp("yesterday").is_none());
    }
}
