//! Database operations for the `drafts` table.
//!
//! A draft's body and curated lists are final once it reaches `sent`: the
//! edit and send paths all guard on the current status, so no core code
//! path can mutate a sent draft.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `drafts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DraftRow {
    pub id: i64,
    pub public_id: Uuid,
    pub user_id: i64,
    pub status: String,
    pub ai_title: String,
    pub ai_body: String,
    pub ai_intro: String,
    pub ai_closing: String,
    pub user_edited_body: Option<String>,
    pub curated_items: Value,
    pub trending_items: Value,
    pub edit_seconds: i32,
    pub ai_acceptance_rate: Option<f32>,
    pub generation_ms: i64,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub delivered_count: i32,
    pub created_at: DateTime<Utc>,
}

impl DraftRow {
    /// The body that would actually be delivered: the user's edit when one
    /// exists, otherwise the AI body.
    #[must_use]
    pub fn delivery_body(&self) -> &str {
        self.user_edited_body.as_deref().unwrap_or(&self.ai_body)
    }
}

/// Fields for inserting a freshly composed draft.
pub struct NewDraft<'a> {
    pub user_id: i64,
    pub ai_title: &'a str,
    pub ai_body: &'a str,
    pub ai_intro: &'a str,
    pub ai_closing: &'a str,
    pub curated_items: Value,
    pub trending_items: Value,
    pub generation_ms: i64,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Insert a new draft in `draft` status and return the created row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_draft(pool: &PgPool, draft: &NewDraft<'_>) -> Result<DraftRow, DbError> {
    let public_id = Uuid::new_v4();

    let row = sqlx::query_as::<_, DraftRow>(
        "INSERT INTO drafts \
           (public_id, user_id, ai_title, ai_body, ai_intro, ai_closing, \
            curated_items, trending_items, generation_ms) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         RETURNING id, public_id, user_id, status, ai_title, ai_body, ai_intro, \
                   ai_closing, user_edited_body, curated_items, trending_items, \
                   edit_seconds, ai_acceptance_rate, generation_ms, scheduled_at, \
                   sent_at, delivered_count, created_at",
    )
    .bind(public_id)
    .bind(draft.user_id)
    .bind(draft.ai_title)
    .bind(draft.ai_body)
    .bind(draft.ai_intro)
    .bind(draft.ai_closing)
    .bind(&draft.curated_items)
    .bind(&draft.trending_items)
    .bind(draft.generation_ms)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Fetch one draft owned by `user_id`, or `None`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_draft(
    pool: &PgPool,
    user_id: i64,
    draft_id: i64,
) -> Result<Option<DraftRow>, DbError> {
    let row = sqlx::query_as::<_, DraftRow>(
        "SELECT id, public_id, user_id, status, ai_title, ai_body, ai_intro, \
                ai_closing, user_edited_body, curated_items, trending_items, \
                edit_seconds, ai_acceptance_rate, generation_ms, scheduled_at, \
                sent_at, delivered_count, created_at \
         FROM drafts WHERE id = $1 AND user_id = $2",
    )
    .bind(draft_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// List a user's drafts, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_drafts_for_user(
    pool: &PgPool,
    user_id: i64,
    limit: i64,
) -> Result<Vec<DraftRow>, DbError> {
    let rows = sqlx::query_as::<_, DraftRow>(
        "SELECT id, public_id, user_id, status, ai_title, ai_body, ai_intro, \
                ai_closing, user_edited_body, curated_items, trending_items, \
                edit_seconds, ai_acceptance_rate, generation_ms, scheduled_at, \
                sent_at, delivered_count, created_at \
         FROM drafts WHERE user_id = $1 \
         ORDER BY created_at DESC, id DESC LIMIT $2",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// The most recent draft still in `draft` status, or `None`.
///
/// The send pipeline delivers this one; older unsent drafts stay behind
/// until explicitly archived.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn latest_unsent_draft(
    pool: &PgPool,
    user_id: i64,
) -> Result<Option<DraftRow>, DbError> {
    let row = sqlx::query_as::<_, DraftRow>(
        "SELECT id, public_id, user_id, status, ai_title, ai_body, ai_intro, \
                ai_closing, user_edited_body, curated_items, trending_items, \
                edit_seconds, ai_acceptance_rate, generation_ms, scheduled_at, \
                sent_at, delivered_count, created_at \
         FROM drafts WHERE user_id = $1 AND status = 'draft' \
         ORDER BY created_at DESC, id DESC LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Replace the user-edited body and accumulate edit time.
///
/// Refuses to touch a sent draft.
///
/// # Errors
///
/// Returns [`DbError::InvalidDraftTransition`] if the draft is missing or
/// already sent, or [`DbError::Sqlx`] if the update fails.
pub async fn update_draft_body(
    pool: &PgPool,
    user_id: i64,
    draft_id: i64,
    body: &str,
    edit_seconds_delta: i32,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE drafts SET \
           user_edited_body = $3, edit_seconds = edit_seconds + $4 \
         WHERE id = $1 AND user_id = $2 AND status <> 'sent'",
    )
    .bind(draft_id)
    .bind(user_id)
    .bind(body)
    .bind(edit_seconds_delta)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidDraftTransition {
            id: draft_id,
            expected_status: "draft or scheduled",
        });
    }
    Ok(())
}

/// Schedule a draft for a future send.
///
/// # Errors
///
/// Returns [`DbError::InvalidDraftTransition`] if the draft is missing or
/// not in `draft` status, or [`DbError::Sqlx`] if the update fails.
pub async fn schedule_draft(
    pool: &PgPool,
    user_id: i64,
    draft_id: i64,
    scheduled_at: DateTime<Utc>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE drafts SET status = 'scheduled', scheduled_at = $3 \
         WHERE id = $1 AND user_id = $2 AND status = 'draft'",
    )
    .bind(draft_id)
    .bind(user_id)
    .bind(scheduled_at)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidDraftTransition {
            id: draft_id,
            expected_status: "draft",
        });
    }
    Ok(())
}

/// Mark a draft as sent with its delivered-recipient count.
///
/// Only called by the delivery pipeline after *every* recipient succeeded;
/// a partial delivery leaves the draft unsent so a retry covers everyone.
///
/// # Errors
///
/// Returns [`DbError::InvalidDraftTransition`] if the draft is missing or
/// already sent, or [`DbError::Sqlx`] if the update fails.
pub async fn mark_draft_sent(
    pool: &PgPool,
    draft_id: i64,
    delivered_count: i32,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE drafts SET status = 'sent', sent_at = NOW(), delivered_count = $2 \
         WHERE id = $1 AND status <> 'sent'",
    )
    .bind(draft_id)
    .bind(delivered_count)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidDraftTransition {
            id: draft_id,
            expected_status: "draft or scheduled",
        });
    }
    Ok(())
}
