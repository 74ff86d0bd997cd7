//! The common raw-item shape produced by every scraper client.

use chrono::{DateTime, Utc};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

/// One piece of content as returned by a scraper, before ingestion.
///
/// `published_at` stays `None` when the upstream service reports no
/// timestamp; the ingestion pipeline substitutes the scrape instant.
#[derive(Debug, Clone, PartialEq)]
pub struct RawItem {
    pub external_id: String,
    pub title: String,
    pub content_text: String,
    pub url: String,
    pub author: String,
    pub published_at: Option<DateTime<Utc>>,
    pub engagement_likes: i64,
    pub engagement_shares: i64,
    pub engagement_comments: i64,
    pub engagement_views: i64,
    pub media_urls: Vec<String>,
    pub hashtags: Vec<String>,
}

impl RawItem {
    /// An item with zeroed engagement and empty media/hashtag lists;
    /// the starting point for sources that report none of those.
    #[must_use]
    pub fn bare(external_id: String, title: String, url: String) -> Self {
        Self {
            external_id,
            title,
            content_text: String::new(),
            url,
            author: String::new(),
            published_at: None,
            engagement_likes: 0,
            engagement_shares: 0,
            engagement_comments: 0,
            engagement_views: 0,
            media_urls: Vec::new(),
            hashtags: Vec::new(),
        }
    }
}

/// Extract `#hashtag` tokens from free text, without the `#`.
#[must_use]
pub fn extract_hashtags(text: &str) -> Vec<String> {
    static HASHTAG: OnceLock<Regex> = OnceLock::new();
    let re = HASHTAG.get_or_init(|| Regex::new(r"#([A-Za-z0-9_]+)").expect("valid regex"));
    re.captures_iter(text)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// Strip HTML tags from a string, returning plain text.
#[must_use]
pub fn strip_html(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }
    result.trim().to_string()
}

/// Stable fallback identifier for items whose source provides none:
/// a hex SHA-256 of the given parts.
#[must_use]
pub fn derive_external_id(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0]);
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashtags_are_extracted_without_hash() {
        let tags = extract_hashtags("new drop #launch day #Creator_Economy!");
        assert_eq!(tags, vec!["launch", "Creator_Economy"]);
    }

    #[test]
    fn no_hashtags_yields_empty_vec() {
        assert!(extract_hashtags("plain text, no tags").is_empty());
    }

    #[test]
    fn strip_html_removes_tags_and_trims() {
        assert_eq!(
            strip_html("<p>Hello <b>world</b></p>\n"),
            "Hello world"
        );
    }

    #[test]
    fn derive_external_id_is_stable_and_order_sensitive() {
        let a = derive_external_id(&["https://x.com", "title"]);
        let b = derive_external_id(&["https://x.com", "title"]);
        let c = derive_external_id(&["title", "https://x.com"]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }
}
