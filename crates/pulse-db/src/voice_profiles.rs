//! Database operations for the `voice_profiles` table.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `voice_profiles` table. `profile` is the serialized
/// typed profile; the surrounding columns exist for cheap listing.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VoiceProfileRow {
    pub user_id: i64,
    pub profile: Value,
    pub sample_count: i32,
    pub trained_at: DateTime<Utc>,
}

/// Fetch a user's voice profile, or `None` if never trained.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_voice_profile(
    pool: &PgPool,
    user_id: i64,
) -> Result<Option<VoiceProfileRow>, DbError> {
    let row = sqlx::query_as::<_, VoiceProfileRow>(
        "SELECT user_id, profile, sample_count, trained_at \
         FROM voice_profiles WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Replace a user's voice profile wholesale. Retraining never merges with
/// the previous profile.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_voice_profile(
    pool: &PgPool,
    user_id: i64,
    profile: &Value,
    sample_count: i32,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO voice_profiles (user_id, profile, sample_count, trained_at) \
         VALUES ($1, $2, $3, NOW()) \
         ON CONFLICT (user_id) DO UPDATE SET \
           profile = EXCLUDED.profile, \
           sample_count = EXCLUDED.sample_count, \
           trained_at = NOW()",
    )
    .bind(user_id)
    .bind(profile)
    .bind(sample_count)
    .execute(pool)
    .await?;

    Ok(())
}
