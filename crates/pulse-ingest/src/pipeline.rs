//! Ingestion orchestration.

use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;

use pulse_core::{normalize_engagement, SourceType};
use pulse_db::{NewContentItem, SourceRow};
use pulse_scraper::{RawItem, ScrapeError};

use crate::error::IngestError;
use crate::types::{IngestSummary, ScraperSet, SourceScrapeResult};

/// Scrape every active source belonging to one user.
///
/// Failures are recorded per source (status + error message) and collected
/// in the summary; they never abort the remaining sources.
///
/// # Errors
///
/// Returns [`IngestError::Db`] only when the source list itself cannot be
/// loaded.
pub async fn run_user_sources(
    pool: &PgPool,
    scrapers: &ScraperSet,
    user_id: i64,
) -> Result<IngestSummary, IngestError> {
    let sources = pulse_db::list_active_sources(pool, Some(user_id)).await?;
    Ok(run_sources(pool, scrapers, &sources).await)
}

/// Scrape every active source for every user (the batch job entry point).
///
/// # Errors
///
/// Returns [`IngestError::Db`] only when the source list itself cannot be
/// loaded.
pub async fn run_all_sources(
    pool: &PgPool,
    scrapers: &ScraperSet,
) -> Result<IngestSummary, IngestError> {
    let sources = pulse_db::list_active_sources(pool, None).await?;
    Ok(run_sources(pool, scrapers, &sources).await)
}

async fn run_sources(pool: &PgPool, scrapers: &ScraperSet, sources: &[SourceRow]) -> IngestSummary {
    let mut summary = IngestSummary::default();

    for source in sources {
        summary.sources_processed += 1;
        match run_source(pool, scrapers, source).await {
            Ok(result) => {
                tracing::info!(
                    source_id = source.id,
                    source_type = %source.source_type,
                    fetched = result.items_fetched,
                    inserted = result.items_inserted,
                    duplicates = result.duplicates_skipped,
                    "ingest: source scraped"
                );
                summary.items_inserted += result.items_inserted;
            }
            Err(e) => {
                tracing::warn!(
                    source_id = source.id,
                    source_type = %source.source_type,
                    error = %e,
                    "ingest: source scrape failed"
                );
                summary.failures.push((source.id, e.to_string()));
            }
        }
    }

    summary
}

/// Scrape one source end to end: mark it running, fetch, insert with dedup,
/// record the outcome, and append the activity event.
///
/// # Errors
///
/// Returns [`IngestError::Scrape`] when the scraper client fails (the
/// failure is recorded on the source row first) and [`IngestError::Db`]
/// when persistence fails.
pub async fn run_source(
    pool: &PgPool,
    scrapers: &ScraperSet,
    source: &SourceRow,
) -> Result<SourceScrapeResult, IngestError> {
    pulse_db::mark_source_running(pool, source.id).await?;

    let raw_items = match dispatch_scrape(scrapers, source).await {
        Ok(items) => items,
        Err(e) => {
            pulse_db::record_source_failure(pool, source.id, &e.to_string()).await?;
            return Err(e);
        }
    };

    let mut result = SourceScrapeResult {
        items_fetched: raw_items.len(),
        ..SourceScrapeResult::default()
    };

    for raw in &raw_items {
        if insert_raw_item(pool, source, raw).await? {
            result.items_inserted += 1;
        } else {
            result.duplicates_skipped += 1;
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    let inserted = result.items_inserted as i32;
    pulse_db::record_source_success(pool, source.id, inserted).await?;

    pulse_db::insert_activity_event(
        pool,
        source.user_id,
        "source_scraped",
        &format!("Scraped {}", source.name),
        &format!("Found {} new items from {}", result.items_inserted, source.name),
        json!({
            "source_id": source.id,
            "items_count": result.items_inserted,
            "duplicates_skipped": result.duplicates_skipped,
        }),
    )
    .await?;

    Ok(result)
}

/// Route the scrape to the right client for the source's type.
async fn dispatch_scrape(
    scrapers: &ScraperSet,
    source: &SourceRow,
) -> Result<Vec<RawItem>, IngestError> {
    let source_type = source
        .source_type
        .parse::<SourceType>()
        .map_err(IngestError::UnknownSourceType)?;
    #[allow(clippy::cast_sign_loss)]
    let max_items = source.max_items.max(1) as usize;

    let items = match source_type {
        SourceType::Feed => scrapers.feed.fetch_items(&source.locator, max_items).await?,
        SourceType::Forum => {
            let timeframe = source.lookback_hours.map(timeframe_for_lookback);
            scrapers
                .forum
                .fetch_threads(
                    &source.locator,
                    max_items,
                    source.sort_mode.as_deref(),
                    timeframe,
                )
                .await?
        }
        SourceType::Social => {
            let client = scrapers
                .social
                .as_ref()
                .ok_or(ScrapeError::MissingCredential("PULSE_SOCIAL_API_TOKEN"))?;
            client.fetch_posts(&source.locator, max_items).await?
        }
        SourceType::Video => {
            let client = scrapers
                .video
                .as_ref()
                .ok_or(ScrapeError::MissingCredential("PULSE_VIDEO_API_KEY"))?;
            client
                .fetch_channel_uploads(&source.locator, max_items)
                .await?
        }
        SourceType::Page => {
            let client = scrapers
                .page
                .as_ref()
                .ok_or(ScrapeError::MissingCredential("PULSE_PAGE_API_KEY"))?;
            client.extract_page(&source.locator).await?
        }
    };

    Ok(items)
}

/// Insert one raw item; returns `true` when a new row was created.
///
/// The publish timestamp defaults to the ingest instant and the engagement
/// score is fixed here, exactly once.
async fn insert_raw_item(
    pool: &PgPool,
    source: &SourceRow,
    raw: &RawItem,
) -> Result<bool, IngestError> {
    let published_at = raw.published_at.unwrap_or_else(Utc::now);
    let score = normalize_engagement(
        raw.engagement_likes,
        raw.engagement_shares,
        raw.engagement_comments,
    );

    let inserted = pulse_db::insert_content_item(
        pool,
        &NewContentItem {
            user_id: source.user_id,
            source_id: source.id,
            external_id: &raw.external_id,
            title: &raw.title,
            content_text: &raw.content_text,
            url: &raw.url,
            author: &raw.author,
            published_at,
            engagement_likes: raw.engagement_likes,
            engagement_shares: raw.engagement_shares,
            engagement_comments: raw.engagement_comments,
            engagement_views: raw.engagement_views,
            engagement_score: score,
            media_urls: &raw.media_urls,
            hashtags: &raw.hashtags,
        },
    )
    .await?;

    Ok(inserted.is_some())
}

/// Map a lookback window to the forum API's coarse timeframe buckets.
fn timeframe_for_lookback(lookback_hours: i32) -> &'static str {
    match lookback_hours {
        i32::MIN..=24 => "day",
        25..=168 => "week",
        _ => "month",
    }
}
