//! Interactive pipeline triggers: scrape, generate, send.
//!
//! These are the user-facing counterparts of the scheduled jobs. Unlike a
//! batch tick, errors here propagate to the caller as structured responses
//!; a user pressing the button deserves to see why nothing happened.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Serialize;

use pulse_compose::GenTextClient;
use pulse_deliver::EmailClient;
use pulse_ingest::{IngestConfig, ScraperSet};

use crate::middleware::RequestId;

use super::{
    map_compose_error, map_db_error, map_deliver_error, ApiError, ApiResponse, AppState,
    ResponseMeta,
};

#[derive(Debug, Serialize)]
pub(super) struct ScrapeOutcome {
    sources_processed: usize,
    items_inserted: usize,
    failures: Vec<SourceFailure>,
}

#[derive(Debug, Serialize)]
pub(super) struct SourceFailure {
    source_id: i64,
    error: String,
}

#[derive(Debug, Serialize)]
pub(super) struct GenerateOutcome {
    draft_id: i64,
    title: String,
    generation_ms: i64,
}

#[derive(Debug, Serialize)]
pub(super) struct SendOutcome {
    draft_id: i64,
    delivered: usize,
}

pub(super) async fn scrape_sources(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(user_id): Path<i64>,
) -> Result<Json<ApiResponse<ScrapeOutcome>>, ApiError> {
    let scrapers = ScraperSet::from_config(&IngestConfig::from_app_config(&state.config))
        .map_err(|e| {
            tracing::error!(error = %e, "scraper set construction failed");
            ApiError::new(req_id.0.clone(), "internal_error", "scraper setup failed")
        })?;

    let summary = pulse_ingest::run_user_sources(&state.pool, &scrapers, user_id)
        .await
        .map_err(|e| match e {
            pulse_ingest::IngestError::Db(db) => map_db_error(req_id.0.clone(), &db),
            other => ApiError::new(req_id.0.clone(), "internal_error", other.to_string()),
        })?;

    Ok(Json(ApiResponse {
        data: ScrapeOutcome {
            sources_processed: summary.sources_processed,
            items_inserted: summary.items_inserted,
            failures: summary
                .failures
                .into_iter()
                .map(|(source_id, error)| SourceFailure { source_id, error })
                .collect(),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn generate_draft(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(user_id): Path<i64>,
) -> Result<Json<ApiResponse<GenerateOutcome>>, ApiError> {
    let client = GenTextClient::from_app_config(&state.config)
        .map_err(|e| map_compose_error(req_id.0.clone(), &e))?;

    let draft = pulse_compose::generate_draft(&state.pool, &client, user_id)
        .await
        .map_err(|e| map_compose_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: GenerateOutcome {
            draft_id: draft.id,
            title: draft.ai_title,
            generation_ms: draft.generation_ms,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn send_newsletter(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(user_id): Path<i64>,
) -> Result<Json<ApiResponse<SendOutcome>>, ApiError> {
    let client = EmailClient::from_app_config(&state.config)
        .map_err(|e| map_deliver_error(req_id.0.clone(), &e))?;

    let report =
        pulse_deliver::send_latest_draft(&state.pool, &client, &state.config.email_sender, user_id)
            .await
            .map_err(|e| map_deliver_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: SendOutcome {
            draft_id: report.draft_id,
            delivered: report.delivered,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
