//! Database operations for the `content_items` table.
//!
//! Items are write-once. Deduplication rides on the
//! `(source_id, external_id)` unique index with `ON CONFLICT DO NOTHING`,
//! so concurrent scrapes of one source settle to exactly one winner without
//! any check-then-insert in application code.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// Fields for inserting a scraped content item.
///
/// `published_at` is already resolved by the caller: when the raw item had
/// no publish timestamp the ingest instant is substituted before insert.
/// `engagement_score` is computed exactly once from the raw counters.
pub struct NewContentItem<'a> {
    pub user_id: i64,
    pub source_id: i64,
    pub external_id: &'a str,
    pub title: &'a str,
    pub content_text: &'a str,
    pub url: &'a str,
    pub author: &'a str,
    pub published_at: DateTime<Utc>,
    pub engagement_likes: i64,
    pub engagement_shares: i64,
    pub engagement_comments: i64,
    pub engagement_views: i64,
    pub engagement_score: f64,
    pub media_urls: &'a [String],
    pub hashtags: &'a [String],
}

/// A content item joined with its source's type tag, as consumed by the
/// categorizer and composer.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ContentPoolItem {
    pub id: i64,
    pub source_id: i64,
    pub external_id: String,
    pub title: String,
    pub content_text: String,
    pub url: String,
    pub author: String,
    pub published_at: DateTime<Utc>,
    pub engagement_likes: i64,
    pub engagement_shares: i64,
    pub engagement_comments: i64,
    pub engagement_views: i64,
    pub engagement_score: f64,
    pub source_type: String,
}

/// Insert a content item, ignoring duplicates.
///
/// Returns `Some(id)` when a new row was created, `None` when the
/// `(source_id, external_id)` pair already existed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails for any reason other than
/// the dedup conflict.
pub async fn insert_content_item(
    pool: &PgPool,
    item: &NewContentItem<'_>,
) -> Result<Option<i64>, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO content_items \
           (user_id, source_id, external_id, title, content_text, url, author, \
            published_at, engagement_likes, engagement_shares, engagement_comments, \
            engagement_views, engagement_score, media_urls, hashtags) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
         ON CONFLICT (source_id, external_id) DO NOTHING \
         RETURNING id",
    )
    .bind(item.user_id)
    .bind(item.source_id)
    .bind(item.external_id)
    .bind(item.title)
    .bind(item.content_text)
    .bind(item.url)
    .bind(item.author)
    .bind(item.published_at)
    .bind(item.engagement_likes)
    .bind(item.engagement_shares)
    .bind(item.engagement_comments)
    .bind(item.engagement_views)
    .bind(item.engagement_score)
    .bind(item.media_urls)
    .bind(item.hashtags)
    .fetch_optional(pool)
    .await?;

    Ok(id)
}

/// Count stored items for a user.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_items_for_user(pool: &PgPool, user_id: i64) -> Result<i64, DbError> {
    Ok(
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM content_items WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await?,
    )
}

/// Load a user's content pool published at or after `since`, each item
/// decorated with its source's type tag.
///
/// The composer passes `now - 7 days` so a single query covers every tier
/// window; the categorizer slices the pool further in memory.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_pool_for_user(
    pool: &PgPool,
    user_id: i64,
    since: DateTime<Utc>,
) -> Result<Vec<ContentPoolItem>, DbError> {
    let rows = sqlx::query_as::<_, ContentPoolItem>(
        "SELECT c.id, c.source_id, c.external_id, c.title, c.content_text, c.url, \
                c.author, c.published_at, c.engagement_likes, c.engagement_shares, \
                c.engagement_comments, c.engagement_views, c.engagement_score, \
                s.source_type \
         FROM content_items c \
         JOIN sources s ON s.id = c.source_id \
         WHERE c.user_id = $1 AND c.published_at >= $2 \
         ORDER BY c.published_at DESC",
    )
    .bind(user_id)
    .bind(since)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
