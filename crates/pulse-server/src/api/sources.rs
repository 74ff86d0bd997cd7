use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct SourceItem {
    id: i64,
    name: String,
    source_type: String,
    locator: String,
    max_items: i32,
    sort_mode: Option<String>,
    lookback_hours: Option<i32>,
    is_active: bool,
    last_run_status: String,
    last_run_at: Option<DateTime<Utc>>,
    items_last_run: i32,
    total_items: i64,
    last_error: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<pulse_db::SourceRow> for SourceItem {
    fn from(row: pulse_db::SourceRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            source_type: row.source_type,
            locator: row.locator,
            max_items: row.max_items,
            sort_mode: row.sort_mode,
            lookback_hours: row.lookback_hours,
            is_active: row.is_active,
            last_run_status: row.last_run_status,
            last_run_at: row.last_run_at,
            items_last_run: row.items_last_run,
            total_items: row.total_items,
            last_error: row.last_error,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateSourceBody {
    name: String,
    source_type: String,
    locator: String,
    max_items: Option<i32>,
    sort_mode: Option<String>,
    lookback_hours: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateSourceBody {
    name: Option<String>,
    is_active: Option<bool>,
    max_items: Option<i32>,
    sort_mode: Option<String>,
    lookback_hours: Option<i32>,
}

pub(super) async fn list_sources(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(user_id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<SourceItem>>>, ApiError> {
    let rows = pulse_db::list_sources_for_user(&state.pool, user_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(SourceItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn create_source(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(user_id): Path<i64>,
    Json(body): Json<CreateSourceBody>,
) -> Result<(StatusCode, Json<ApiResponse<SourceItem>>), ApiError> {
    if body.source_type.parse::<pulse_core::SourceType>().is_err() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            format!("unknown source type: {}", body.source_type),
        ));
    }
    if body.name.trim().is_empty() || body.locator.trim().is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "name and locator are required",
        ));
    }

    let row = pulse_db::create_source(
        &state.pool,
        &pulse_db::NewSource {
            user_id,
            name: body.name.trim(),
            source_type: &body.source_type,
            locator: body.locator.trim(),
            max_items: body.max_items.unwrap_or(20),
            sort_mode: body.sort_mode.as_deref(),
            lookback_hours: body.lookback_hours,
        },
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    pulse_db::insert_activity_event(
        &state.pool,
        user_id,
        "source_added",
        &format!("Added {}", row.name),
        &format!("New {} source: {}", row.source_type, row.locator),
        json!({ "source_id": row.id }),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: SourceItem::from(row),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

pub(super) async fn get_source(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((user_id, source_id)): Path<(i64, i64)>,
) -> Result<Json<ApiResponse<SourceItem>>, ApiError> {
    let row = pulse_db::get_source(&state.pool, user_id, source_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "source not found"))?;

    Ok(Json(ApiResponse {
        data: SourceItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn update_source(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((user_id, source_id)): Path<(i64, i64)>,
    Json(body): Json<UpdateSourceBody>,
) -> Result<Json<ApiResponse<SourceItem>>, ApiError> {
    let row = pulse_db::update_source(
        &state.pool,
        user_id,
        source_id,
        &pulse_db::SourceUpdate {
            name: body.name.as_deref(),
            is_active: body.is_active,
            max_items: body.max_items,
            sort_mode: body.sort_mode.as_deref(),
            lookback_hours: body.lookback_hours,
        },
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: SourceItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn delete_source(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((user_id, source_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    pulse_db::delete_source(&state.pool, user_id, source_id)
        .await
        .map_err(|e| map_db_error(req_id.0, &e))?;

    Ok(StatusCode::NO_CONTENT)
}
