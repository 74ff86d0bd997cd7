//! Database operations for the append-only `activity_events` table.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `activity_events` table. Write-once; there is no update
/// path anywhere in the crate.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ActivityEventRow {
    pub id: i64,
    pub user_id: i64,
    pub event_type: String,
    pub title: String,
    pub description: String,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

/// Append an activity event and return its generated id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_activity_event(
    pool: &PgPool,
    user_id: i64,
    event_type: &str,
    title: &str,
    description: &str,
    metadata: Value,
) -> Result<i64, DbError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO activity_events (user_id, event_type, title, description, metadata) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id",
    )
    .bind(user_id)
    .bind(event_type)
    .bind(title)
    .bind(description)
    .bind(metadata)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// List a user's recent activity, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_activity_for_user(
    pool: &PgPool,
    user_id: i64,
    limit: i64,
) -> Result<Vec<ActivityEventRow>, DbError> {
    let rows = sqlx::query_as::<_, ActivityEventRow>(
        "SELECT id, user_id, event_type, title, description, metadata, created_at \
         FROM activity_events WHERE user_id = $1 \
         ORDER BY created_at DESC, id DESC LIMIT $2",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
