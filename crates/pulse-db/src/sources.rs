//! Database operations for the `sources` table.
//!
//! Scrape-run bookkeeping lives here: the ingestion pipeline walks a source
//! through `running` → `succeeded`/`failed` and records per-run counters.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `sources` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SourceRow {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub source_type: String,
    pub locator: String,
    pub max_items: i32,
    pub sort_mode: Option<String>,
    pub lookback_hours: Option<i32>,
    pub is_active: bool,
    pub last_run_status: String,
    pub last_run_at: Option<DateTime<Utc>>,
    pub items_last_run: i32,
    pub total_items: i64,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields for creating a source.
pub struct NewSource<'a> {
    pub user_id: i64,
    pub name: &'a str,
    pub source_type: &'a str,
    pub locator: &'a str,
    pub max_items: i32,
    pub sort_mode: Option<&'a str>,
    pub lookback_hours: Option<i32>,
}

/// Optional fields for a partial source update; `None` leaves the column
/// untouched.
#[derive(Debug, Default)]
pub struct SourceUpdate<'a> {
    pub name: Option<&'a str>,
    pub is_active: Option<bool>,
    pub max_items: Option<i32>,
    pub sort_mode: Option<&'a str>,
    pub lookback_hours: Option<i32>,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Insert a new source and return the created row.
///
/// The `(user_id, locator, source_type)` triple is unique; a duplicate
/// insert surfaces as a [`DbError`] for which
/// [`DbError::is_unique_violation`] returns true.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_source(pool: &PgPool, source: &NewSource<'_>) -> Result<SourceRow, DbError> {
    let row = sqlx::query_as::<_, SourceRow>(
        "INSERT INTO sources \
           (user_id, name, source_type, locator, max_items, sort_mode, lookback_hours) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING id, user_id, name, source_type, locator, max_items, sort_mode, \
                   lookback_hours, is_active, last_run_status, last_run_at, \
                   items_last_run, total_items, last_error, created_at",
    )
    .bind(source.user_id)
    .bind(source.name)
    .bind(source.source_type)
    .bind(source.locator)
    .bind(source.max_items)
    .bind(source.sort_mode)
    .bind(source.lookback_hours)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Fetch one source owned by `user_id`, or `None`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_source(
    pool: &PgPool,
    user_id: i64,
    source_id: i64,
) -> Result<Option<SourceRow>, DbError> {
    let row = sqlx::query_as::<_, SourceRow>(
        "SELECT id, user_id, name, source_type, locator, max_items, sort_mode, \
                lookback_hours, is_active, last_run_status, last_run_at, \
                items_last_run, total_items, last_error, created_at \
         FROM sources WHERE id = $1 AND user_id = $2",
    )
    .bind(source_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// List all sources for one user, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_sources_for_user(
    pool: &PgPool,
    user_id: i64,
) -> Result<Vec<SourceRow>, DbError> {
    let rows = sqlx::query_as::<_, SourceRow>(
        "SELECT id, user_id, name, source_type, locator, max_items, sort_mode, \
                lookback_hours, is_active, last_run_status, last_run_at, \
                items_last_run, total_items, last_error, created_at \
         FROM sources WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// List active sources: for one user when `user_id` is given, otherwise for
/// everyone (the batch scrape job).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_sources(
    pool: &PgPool,
    user_id: Option<i64>,
) -> Result<Vec<SourceRow>, DbError> {
    let rows = sqlx::query_as::<_, SourceRow>(
        "SELECT id, user_id, name, source_type, locator, max_items, sort_mode, \
                lookback_hours, is_active, last_run_status, last_run_at, \
                items_last_run, total_items, last_error, created_at \
         FROM sources \
         WHERE is_active = true AND ($1::BIGINT IS NULL OR user_id = $1) \
         ORDER BY user_id, id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Apply a partial update to a source owned by `user_id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no such source exists, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_source(
    pool: &PgPool,
    user_id: i64,
    source_id: i64,
    update: &SourceUpdate<'_>,
) -> Result<SourceRow, DbError> {
    let row = sqlx::query_as::<_, SourceRow>(
        "UPDATE sources SET \
           name = COALESCE($3, name), \
           is_active = COALESCE($4, is_active), \
           max_items = COALESCE($5, max_items), \
           sort_mode = COALESCE($6, sort_mode), \
           lookback_hours = COALESCE($7, lookback_hours) \
         WHERE id = $1 AND user_id = $2 \
         RETURNING id, user_id, name, source_type, locator, max_items, sort_mode, \
                   lookback_hours, is_active, last_run_status, last_run_at, \
                   items_last_run, total_items, last_error, created_at",
    )
    .bind(source_id)
    .bind(user_id)
    .bind(update.name)
    .bind(update.is_active)
    .bind(update.max_items)
    .bind(update.sort_mode)
    .bind(update.lookback_hours)
    .fetch_optional(pool)
    .await?;

    row.ok_or(DbError::NotFound)
}

/// Delete a source owned by `user_id`. Content items cascade.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no such source exists, or
/// [`DbError::Sqlx`] if the delete fails.
pub async fn delete_source(pool: &PgPool, user_id: i64, source_id: i64) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM sources WHERE id = $1 AND user_id = $2")
        .bind(source_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Mark a source as `running` at the start of a scrape attempt.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn mark_source_running(pool: &PgPool, source_id: i64) -> Result<(), DbError> {
    sqlx::query("UPDATE sources SET last_run_status = 'running' WHERE id = $1")
        .bind(source_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Record a successful scrape run: status, timestamps, and item counters.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn record_source_success(
    pool: &PgPool,
    source_id: i64,
    items_inserted: i32,
) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE sources SET \
           last_run_status = 'succeeded', last_run_at = NOW(), \
           items_last_run = $2, total_items = total_items + $2, last_error = NULL \
         WHERE id = $1",
    )
    .bind(source_id)
    .bind(items_inserted)
    .execute(pool)
    .await?;
    Ok(())
}

/// Record a failed scrape run with its error message.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn record_source_failure(
    pool: &PgPool,
    source_id: i64,
    error_message: &str,
) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE sources SET \
           last_run_status = 'failed', last_run_at = NOW(), \
           items_last_run = 0, last_error = $2 \
         WHERE id = $1",
    )
    .bind(source_id)
    .bind(error_message)
    .execute(pool)
    .await?;
    Ok(())
}
