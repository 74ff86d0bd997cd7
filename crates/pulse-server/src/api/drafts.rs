use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct DraftItem {
    id: i64,
    public_id: Uuid,
    status: String,
    ai_title: String,
    ai_intro: String,
    ai_closing: String,
    body: String,
    user_edited: bool,
    curated_items: Value,
    trending_items: Value,
    edit_seconds: i32,
    generation_ms: i64,
    scheduled_at: Option<DateTime<Utc>>,
    sent_at: Option<DateTime<Utc>>,
    delivered_count: i32,
    created_at: DateTime<Utc>,
}

impl From<pulse_db::DraftRow> for DraftItem {
    fn from(row: pulse_db::DraftRow) -> Self {
        let user_edited = row.user_edited_body.is_some();
        let body = row.delivery_body().to_string();
        Self {
            id: row.id,
            public_id: row.public_id,
            status: row.status,
            ai_title: row.ai_title,
            ai_intro: row.ai_intro,
            ai_closing: row.ai_closing,
            body,
            user_edited,
            curated_items: row.curated_items,
            trending_items: row.trending_items,
            edit_seconds: row.edit_seconds,
            generation_ms: row.generation_ms,
            scheduled_at: row.scheduled_at,
            sent_at: row.sent_at,
            delivered_count: row.delivered_count,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct DraftListQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateDraftBody {
    body: Option<String>,
    edit_seconds: Option<i32>,
    scheduled_at: Option<DateTime<Utc>>,
}

pub(super) async fn list_drafts(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(user_id): Path<i64>,
    Query(query): Query<DraftListQuery>,
) -> Result<Json<ApiResponse<Vec<DraftItem>>>, ApiError> {
    let rows = pulse_db::list_drafts_for_user(&state.pool, user_id, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(DraftItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn get_draft(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((user_id, draft_id)): Path<(i64, i64)>,
) -> Result<Json<ApiResponse<DraftItem>>, ApiError> {
    let row = pulse_db::get_draft(&state.pool, user_id, draft_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "draft not found"))?;

    Ok(Json(ApiResponse {
        data: DraftItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Patch a draft: replace the user-edited body (accumulating edit time),
/// and/or schedule it. Both paths refuse to touch a sent draft.
pub(super) async fn update_draft(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((user_id, draft_id)): Path<(i64, i64)>,
    Json(body): Json<UpdateDraftBody>,
) -> Result<Json<ApiResponse<DraftItem>>, ApiError> {
    if body.body.is_none() && body.scheduled_at.is_none() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "nothing to update: provide body and/or scheduled_at",
        ));
    }

    if let Some(new_body) = &body.body {
        pulse_db::update_draft_body(
            &state.pool,
            user_id,
            draft_id,
            new_body,
            body.edit_seconds.unwrap_or(0).max(0),
        )
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    }

    if let Some(scheduled_at) = body.scheduled_at {
        pulse_db::schedule_draft(&state.pool, user_id, draft_id, scheduled_at)
            .await
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    }

    let row = pulse_db::get_draft(&state.pool, user_id, draft_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "draft not found"))?;

    Ok(Json(ApiResponse {
        data: DraftItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}
