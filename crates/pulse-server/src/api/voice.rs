use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use pulse_compose::GenTextClient;

use crate::middleware::RequestId;

use super::{map_compose_error, map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

/// Samples shorter than this are rejected up front; the analyser needs
/// enough text to say anything useful.
const MIN_SAMPLE_CHARS: usize = 100;

#[derive(Debug, Deserialize)]
pub(super) struct TrainVoiceBody {
    samples: Vec<String>,
}

pub(super) async fn get_voice_profile(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(user_id): Path<i64>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let profile = pulse_db::get_voice_profile(&state.pool, user_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .map_or_else(|| json!({ "trained": false }), |row| row.profile);

    Ok(Json(ApiResponse {
        data: profile,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn train_voice(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(user_id): Path<i64>,
    Json(body): Json<TrainVoiceBody>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    if body.samples.is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "at least one writing sample is required",
        ));
    }
    if let Some(index) = body
        .samples
        .iter()
        .position(|s| s.chars().count() < MIN_SAMPLE_CHARS)
    {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            format!("sample {} is shorter than {MIN_SAMPLE_CHARS} characters", index + 1),
        ));
    }

    let client = GenTextClient::from_app_config(&state.config)
        .map_err(|e| map_compose_error(req_id.0.clone(), &e))?;

    let profile = pulse_compose::train_voice(&state.pool, &client, user_id, &body.samples)
        .await
        .map_err(|e| map_compose_error(req_id.0.clone(), &e))?;

    let data = serde_json::to_value(&profile).map_err(|e| {
        tracing::error!(error = %e, "voice profile serialization failed");
        ApiError::new(req_id.0.clone(), "internal_error", "profile serialization failed")
    })?;

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
