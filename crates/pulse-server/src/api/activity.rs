use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct ActivityItem {
    id: i64,
    event_type: String,
    title: String,
    description: String,
    metadata: Value,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ActivityQuery {
    pub limit: Option<i64>,
}

pub(super) async fn list_activity(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(user_id): Path<i64>,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<ApiResponse<Vec<ActivityItem>>>, ApiError> {
    let rows = pulse_db::list_activity_for_user(&state.pool, user_id, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| ActivityItem {
            id: row.id,
            event_type: row.event_type,
            title: row.title,
            description: row.description,
            metadata: row.metadata,
            created_at: row.created_at,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
