//! Content categorization into priority tiers.
//!
//! Three fixed windows over one pool. Primary is recency-first, the other
//! two are engagement-first. The Trending window (72h) deliberately
//! overlaps Primary (48h): a high-engagement recent item is surfaced in
//! both places, once for recency and once as a trend.

use chrono::{DateTime, Duration, Utc};
use pulse_db::ContentPoolItem;

pub const PRIMARY_WINDOW_HOURS: i64 = 48;
pub const EVERGREEN_WINDOW_DAYS: i64 = 7;
pub const TRENDING_WINDOW_HOURS: i64 = 72;

pub const PRIMARY_CAP: usize = 15;
pub const EVERGREEN_CAP: usize = 5;
pub const TRENDING_CAP: usize = 3;

/// Below this many tiered items (summed across tiers, overlaps counted),
/// draft generation aborts rather than producing a thin newsletter.
pub const MIN_TIERED_ITEMS: usize = 5;

/// The three priority tiers feeding the composer, weighted 70/20/10 in the
/// generated newsletter.
#[derive(Debug, Default)]
pub struct Tiers {
    /// Fresh content (last 48h), newest first: the "what's hot" section.
    pub primary: Vec<ContentPoolItem>,
    /// Older but high-engagement content (48h–7d): "worth your time".
    pub evergreen: Vec<ContentPoolItem>,
    /// Highest-engagement content of the last 72h: "on the radar".
    pub trending: Vec<ContentPoolItem>,
}

impl Tiers {
    /// Total tiered items; an item in both Primary and Trending counts
    /// twice, matching the sufficiency gate's view of the pool.
    #[must_use]
    pub fn total(&self) -> usize {
        self.primary.len() + self.evergreen.len() + self.trending.len()
    }

    /// True when the pool clears the [`MIN_TIERED_ITEMS`] floor.
    #[must_use]
    pub fn is_sufficient(&self) -> bool {
        self.total() >= MIN_TIERED_ITEMS
    }
}

/// Partition a content pool into the three tiers at instant `now`.
///
/// Empty tiers are fine individually; only the aggregate floor matters,
/// and enforcing it is the caller's job (see
/// [`crate::pipeline::generate_draft`]).
#[must_use]
pub fn categorize(items: &[ContentPoolItem], now: DateTime<Utc>) -> Tiers {
    let primary_cutoff = now - Duration::hours(PRIMARY_WINDOW_HOURS);
    let evergreen_cutoff = now - Duration::days(EVERGREEN_WINDOW_DAYS);
    let trending_cutoff = now - Duration::hours(TRENDING_WINDOW_HOURS);

    let mut primary: Vec<ContentPoolItem> = items
        .iter()
        .filter(|item| item.published_at >= primary_cutoff)
        .cloned()
        .collect();
    primary.sort_by(|a, b| {
        b.published_at
            .cmp(&a.published_at)
            .then(b.engagement_score.total_cmp(&a.engagement_score))
    });
    primary.truncate(PRIMARY_CAP);

    let mut evergreen: Vec<ContentPoolItem> = items
        .iter()
        .filter(|item| {
            item.published_at >= evergreen_cutoff && item.published_at < primary_cutoff
        })
        .cloned()
        .collect();
    evergreen.sort_by(|a, b| {
        b.engagement_score
            .total_cmp(&a.engagement_score)
            .then(b.published_at.cmp(&a.published_at))
    });
    evergreen.truncate(EVERGREEN_CAP);

    let mut trending: Vec<ContentPoolItem> = items
        .iter()
        .filter(|item| item.published_at >= trending_cutoff)
        .cloned()
        .collect();
    trending.sort_by(|a, b| {
        b.engagement_score
            .total_cmp(&a.engagement_score)
            .then(b.published_at.cmp(&a.published_at))
    });
    trending.truncate(TRENDING_CAP);

    Tiers {
        primary,
        evergreen,
        trending,
    }
}
