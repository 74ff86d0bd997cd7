//! Draft generation orchestration.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;
use std::time::Instant;

use pulse_core::VoiceProfile;
use pulse_db::{ContentPoolItem, DraftRow, NewDraft};

use crate::brief::{build_content_brief, build_style_directive, snippet};
use crate::categorize::{categorize, Tiers, EVERGREEN_WINDOW_DAYS, MIN_TIERED_ITEMS};
use crate::client::GenTextClient;
use crate::draft_text::parse_generated;
use crate::error::ComposeError;

/// Items carried into the draft's curated list (from the Primary tier).
pub const CURATED_ITEMS_CAP: usize = 10;
/// Items carried into the draft's trends list (from the Trending tier).
pub const TRENDS_CAP: usize = 5;
const CURATED_SUMMARY_CHARS: usize = 200;

/// One entry of a draft's curated-items list, stored as JSON on the draft.
#[derive(Debug, Serialize)]
pub struct CuratedItem {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub author: String,
    pub source_type: String,
    pub summary: String,
    pub engagement: EngagementSnapshot,
    pub published_at: DateTime<Utc>,
}

/// Raw counters frozen at composition time.
#[derive(Debug, Serialize)]
pub struct EngagementSnapshot {
    pub likes: i64,
    pub comments: i64,
    pub views: i64,
}

/// One entry of a draft's trending list.
#[derive(Debug, Serialize)]
pub struct TrendItem {
    pub title: String,
    pub url: String,
    pub source_type: String,
    pub engagement: f64,
}

/// Generate and persist a newsletter draft for one user.
///
/// Loads the 7-day content pool, tiers it, briefs the generative backend in
/// the user's voice, parses the result, and inserts the draft with a
/// `draft_generated` activity event. Nothing is persisted on any failure.
///
/// # Errors
///
/// - [`ComposeError::InsufficientContent`] when the tiered pool is below
///   the floor of [`MIN_TIERED_ITEMS`].
/// - [`ComposeError::GenerationFailed`] when the backend errors or returns
///   empty output.
/// - [`ComposeError::Db`] when persistence fails.
pub async fn generate_draft(
    pool: &PgPool,
    client: &GenTextClient,
    user_id: i64,
) -> Result<DraftRow, ComposeError> {
    let now = Utc::now();
    let since = now - Duration::days(EVERGREEN_WINDOW_DAYS);
    let items = pulse_db::list_pool_for_user(pool, user_id, since).await?;

    let tiers = categorize(&items, now);
    if !tiers.is_sufficient() {
        return Err(ComposeError::InsufficientContent {
            found: tiers.total(),
            minimum: MIN_TIERED_ITEMS,
        });
    }

    tracing::info!(
        user_id,
        primary = tiers.primary.len(),
        evergreen = tiers.evergreen.len(),
        trending = tiers.trending.len(),
        "compose: content categorized"
    );

    let profile = load_voice_profile(pool, user_id).await?;
    let directive = build_style_directive(profile.as_ref());
    let content_brief = build_content_brief(&tiers, now);

    let started = Instant::now();
    let generated = client.complete(&directive, &content_brief).await?;
    let parsed = parse_generated(&generated).ok_or_else(|| {
        ComposeError::GenerationFailed("generated output contained no text".to_string())
    })?;

    let curated = curated_items(&tiers);
    let trends = trend_items(&tiers);
    #[allow(clippy::cast_possible_truncation)]
    let generation_ms = started.elapsed().as_millis() as i64;

    let draft = pulse_db::insert_draft(
        pool,
        &NewDraft {
            user_id,
            ai_title: &parsed.title,
            ai_body: &generated,
            ai_intro: &parsed.intro,
            ai_closing: &parsed.closing,
            curated_items: serde_json::to_value(&curated)?,
            trending_items: serde_json::to_value(&trends)?,
            generation_ms,
        },
    )
    .await?;

    pulse_db::insert_activity_event(
        pool,
        user_id,
        "draft_generated",
        "Newsletter draft generated",
        &format!("Generated: \"{}\"", parsed.title),
        json!({
            "draft_id": draft.id,
            "content_stats": {
                "primary": tiers.primary.len(),
                "evergreen": tiers.evergreen.len(),
                "trending": tiers.trending.len(),
            },
            "generation_ms": generation_ms,
        }),
    )
    .await?;

    tracing::info!(user_id, draft_id = draft.id, generation_ms, "compose: draft created");
    Ok(draft)
}

/// Load and deserialize the stored voice profile, treating an unparseable
/// one as absent (the composer then uses the default style).
async fn load_voice_profile(
    pool: &PgPool,
    user_id: i64,
) -> Result<Option<VoiceProfile>, ComposeError> {
    let Some(row) = pulse_db::get_voice_profile(pool, user_id).await? else {
        return Ok(None);
    };

    match serde_json::from_value::<VoiceProfile>(row.profile) {
        Ok(profile) => Ok(Some(profile)),
        Err(e) => {
            tracing::warn!(user_id, error = %e, "compose: stored voice profile unparseable; using defaults");
            Ok(None)
        }
    }
}

fn curated_items(tiers: &Tiers) -> Vec<CuratedItem> {
    tiers
        .primary
        .iter()
        .take(CURATED_ITEMS_CAP)
        .map(|item| CuratedItem {
            id: item.id,
            title: item.title.clone(),
            url: item.url.clone(),
            author: item.author.clone(),
            source_type: item.source_type.clone(),
            summary: snippet(&item.content_text, CURATED_SUMMARY_CHARS),
            engagement: EngagementSnapshot {
                likes: item.engagement_likes,
                comments: item.engagement_comments,
                views: item.engagement_views,
            },
            published_at: item.published_at,
        })
        .collect()
}

fn trend_items(tiers: &Tiers) -> Vec<TrendItem> {
    tiers
        .trending
        .iter()
        .take(TRENDS_CAP)
        .map(|item: &ContentPoolItem| TrendItem {
            title: item.title.clone(),
            url: item.url.clone(),
            source_type: item.source_type.clone(),
            engagement: item.engagement_score,
        })
        .collect()
}
