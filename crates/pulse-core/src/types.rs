use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The kind of external source a content item was scraped from.
///
/// Stored as lowercase text in the database and echoed on every tiered
/// item so the composer can attribute content to its origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// A social-media account timeline (posts).
    Social,
    /// A video channel (uploads with view/like/comment statistics).
    Video,
    /// A forum community listing (threads with upvotes and comments).
    Forum,
    /// An RSS/Atom feed (newsletter or blog).
    Feed,
    /// An arbitrary web page fetched through a content-extraction service.
    Page,
}

impl SourceType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SourceType::Social => "social",
            SourceType::Video => "video",
            SourceType::Forum => "forum",
            SourceType::Feed => "feed",
            SourceType::Page => "page",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "social" => Ok(SourceType::Social),
            "video" => Ok(SourceType::Video),
            "forum" => Ok(SourceType::Forum),
            "feed" => Ok(SourceType::Feed),
            "page" => Ok(SourceType::Page),
            other => Err(format!("unknown source type: {other}")),
        }
    }
}
