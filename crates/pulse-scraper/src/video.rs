//! Video channel scraper (official data API).
//!
//! Three calls per channel: resolve the channel to its uploads playlist,
//! page the playlist, then batch-fetch per-video statistics and join the
//! two by video id.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

use crate::error::ScrapeError;
use crate::types::{extract_hashtags, RawItem};

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";
const PLAYLIST_PAGE_CAP: usize = 50;

#[derive(Debug, Deserialize)]
struct ChannelListResponse {
    #[serde(default)]
    items: Vec<Channel>,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "contentDetails")]
    content_details: ChannelContentDetails,
}

#[derive(Debug, Deserialize)]
struct ChannelContentDetails {
    #[serde(rename = "relatedPlaylists")]
    related_playlists: RelatedPlaylists,
}

#[derive(Debug, Deserialize)]
struct RelatedPlaylists {
    uploads: String,
}

#[derive(Debug, Deserialize)]
struct PlaylistItemsResponse {
    #[serde(default)]
    items: Vec<PlaylistItem>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    snippet: PlaylistSnippet,
}

#[derive(Debug, Deserialize)]
struct PlaylistSnippet {
    title: Option<String>,
    description: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<DateTime<Utc>>,
    #[serde(rename = "channelTitle")]
    channel_title: Option<String>,
    #[serde(rename = "resourceId")]
    resource_id: ResourceId,
    thumbnails: Option<Thumbnails>,
}

#[derive(Debug, Deserialize)]
struct ResourceId {
    #[serde(rename = "videoId")]
    video_id: String,
}

#[derive(Debug, Deserialize)]
struct Thumbnails {
    high: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoStats>,
}

#[derive(Debug, Deserialize)]
struct VideoStats {
    id: String,
    statistics: Option<Statistics>,
}

/// The API reports counters as decimal strings.
#[derive(Debug, Default, Deserialize)]
struct Statistics {
    #[serde(rename = "viewCount")]
    view_count: Option<String>,
    #[serde(rename = "likeCount")]
    like_count: Option<String>,
    #[serde(rename = "commentCount")]
    comment_count: Option<String>,
}

/// Client for the video data API.
pub struct VideoClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl VideoClient {
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

    /// Fetch a channel's most recent uploads with statistics.
    ///
    /// # Errors
    ///
    /// - [`ScrapeError::InvalidLocator`] when no channel id or handle can
    ///   be extracted from `channel_url`.
    /// - [`ScrapeError::Api`] when the channel does not exist.
    /// - [`ScrapeError::Http`] on network failure or a non-2xx status.
    pub async fn fetch_channel_uploads(
        &self,
        channel_url: &str,
        max_results: usize,
    ) -> Result<Vec<RawItem>, ScrapeError> {
        let channel_ref =
            extract_channel_ref(channel_url).ok_or_else(|| ScrapeError::InvalidLocator {
                locator: channel_url.to_string(),
                reason: "expected a channel URL, @handle, or channel id".to_string(),
            })?;

        let uploads_playlist = self.resolve_uploads_playlist(&channel_ref).await?;
        let playlist_items = self
            .list_playlist_items(&uploads_playlist, max_results.min(PLAYLIST_PAGE_CAP))
            .await?;

        let video_ids: Vec<&str> = playlist_items
            .iter()
            .map(|item| item.snippet.resource_id.video_id.as_str())
            .collect();
        let stats = self.fetch_statistics(&video_ids).await?;

        Ok(playlist_items
            .into_iter()
            .map(|item| map_video(item.snippet, &stats))
            .collect())
    }

    async fn resolve_uploads_playlist(&self, channel_ref: &str) -> Result<String, ScrapeError> {
        // Raw channel ids start with "UC"; anything else resolves by handle.
        let (param, value) = if channel_ref.starts_with("UC") {
            ("id", channel_ref)
        } else {
            ("forHandle", channel_ref.trim_start_matches('@'))
        };

        let response: ChannelListResponse = self
            .client
            .get(format!("{}/channels", self.base_url))
            .query(&[
                ("part", "contentDetails,snippet"),
                (param, value),
                ("key", &self.api_key),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response
            .items
            .into_iter()
            .next()
            .map(|channel| channel.content_details.related_playlists.uploads)
            .ok_or_else(|| ScrapeError::Api(format!("channel not found: {channel_ref}")))
    }

    async fn list_playlist_items(
        &self,
        playlist_id: &str,
        max_results: usize,
    ) -> Result<Vec<PlaylistItem>, ScrapeError> {
        let response: PlaylistItemsResponse = self
            .client
            .get(format!("{}/playlistItems", self.base_url))
            .query(&[
                ("part", "snippet"),
                ("playlistId", playlist_id),
                ("maxResults", &max_results.to_string()),
                ("key", &self.api_key),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.items)
    }

    async fn fetch_statistics(
        &self,
        video_ids: &[&str],
    ) -> Result<HashMap<String, Statistics>, ScrapeError> {
        if video_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let response: VideoListResponse = self
            .client
            .get(format!("{}/videos", self.base_url))
            .query(&[
                ("part", "statistics"),
                ("id", &video_ids.join(",")),
                ("key", &self.api_key),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response
            .items
            .into_iter()
            .map(|v| (v.id, v.statistics.unwrap_or_default()))
            .collect())
    }
}

fn map_video(snippet: PlaylistSnippet, stats: &HashMap<String, Statistics>) -> RawItem {
    let video_id = snippet.resource_id.video_id;
    let description = snippet.description.unwrap_or_default();
    let stat = stats.get(&video_id);
    let thumbnail = snippet.thumbnails.and_then(|t| {
        t.high
            .or(t.medium)
            .or(t.default)
            .map(|thumb| thumb.url)
    });
    let hashtags = extract_hashtags(&description);

    RawItem {
        url: format!("https://www.youtube.com/watch?v={video_id}"),
        external_id: video_id,
        title: snippet.title.unwrap_or_default(),
        content_text: description,
        author: snippet.channel_title.unwrap_or_default(),
        published_at: snippet.published_at,
        engagement_likes: parse_count(stat.and_then(|s| s.like_count.as_deref())),
        engagement_shares: 0,
        engagement_comments: parse_count(stat.and_then(|s| s.comment_count.as_deref())),
        engagement_views: parse_count(stat.and_then(|s| s.view_count.as_deref())),
        media_urls: thumbnail.map(|t| vec![t]).unwrap_or_default(),
        hashtags,
    }
}

fn parse_count(raw: Option<&str>) -> i64 {
    raw.and_then(|v| v.parse::<i64>().ok()).unwrap_or(0)
}

/// Extract a channel id or handle from the common URL shapes.
fn extract_channel_ref(url: &str) -> Option<String> {
    static HANDLE: OnceLock<Regex> = OnceLock::new();
    static CHANNEL: OnceLock<Regex> = OnceLock::new();
    static CUSTOM: OnceLock<Regex> = OnceLock::new();

    let handle = HANDLE.get_or_init(|| Regex::new(r"@([A-Za-z0-9_.-]+)").expect("valid regex"));
    let channel =
        CHANNEL.get_or_init(|| Regex::new(r"channel/([A-Za-z0-9_-]+)").expect("valid regex"));
    let custom =
        CUSTOM.get_or_init(|| Regex::new(r"/(?:c|user)/([A-Za-z0-9_-]+)").expect("valid regex"));

    if let Some(cap) = handle.captures(url) {
        return Some(format!("@{}", &cap[1]));
    }
    if let Some(cap) = channel.captures(url) {
        return Some(cap[1].to_string());
    }
    if let Some(cap) = custom.captures(url) {
        return Some(cap[1].to_string());
    }
    if url.starts_with("UC") && !url.contains('/') {
        return Some(url.to_string());
    }
    if !url.is_empty() && !url.contains('/') && !url.contains('.') {
        return Some(url.to_string());
    }
    None
}
