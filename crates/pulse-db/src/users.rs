//! Database operations for the `users` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `users` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub display_name: Option<String>,
    pub status: String,
    pub delivery_frequency: String,
    pub delivery_day: String,
    pub delivery_hour: i16,
    pub email_notifications: bool,
    pub delivery_email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserRow {
    /// The address newsletters for this user are delivered to.
    #[must_use]
    pub fn recipient_address(&self) -> &str {
        self.delivery_email.as_deref().unwrap_or(&self.email)
    }
}

/// Fetch a user by id, or `None` if absent.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_user(pool: &PgPool, user_id: i64) -> Result<Option<UserRow>, DbError> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, email, display_name, status, delivery_frequency, delivery_day, \
                delivery_hour, email_notifications, delivery_email, created_at \
         FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// List all users in `active` status, ordered by id.
///
/// The batch jobs iterate this list; pausing a user removes them from every
/// scheduled action without touching their data.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_users(pool: &PgPool) -> Result<Vec<UserRow>, DbError> {
    let rows = sqlx::query_as::<_, UserRow>(
        "SELECT id, email, display_name, status, delivery_frequency, delivery_day, \
                delivery_hour, email_notifications, delivery_email, created_at \
         FROM users WHERE status = 'active' ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Recipient addresses for newsletter delivery: active users with email
/// notifications enabled, preferring the dedicated delivery address.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn recipient_emails(pool: &PgPool) -> Result<Vec<String>, DbError> {
    Ok(sqlx::query_scalar::<_, String>(
        "SELECT COALESCE(delivery_email, email) FROM users \
         WHERE status = 'active' AND email_notifications = true \
         ORDER BY id",
    )
    .fetch_all(pool)
    .await?)
}
