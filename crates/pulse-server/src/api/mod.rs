mod activity;
mod drafts;
mod runs;
mod sources;
mod voice;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, RateLimitState, RequestId,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<pulse_core::AppConfig>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "insufficient_content" => StatusCode::UNPROCESSABLE_ENTITY,
            "generation_failed" | "voice_analysis_failed" | "delivery_partial_failure"
            | "delivery_failed" => StatusCode::BAD_GATEWAY,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

pub(super) fn map_db_error(request_id: String, error: &pulse_db::DbError) -> ApiError {
    if error.is_unique_violation() {
        return ApiError::new(request_id, "conflict", "resource already exists");
    }
    match error {
        pulse_db::DbError::NotFound => ApiError::new(request_id, "not_found", "record not found"),
        pulse_db::DbError::InvalidDraftTransition { .. } => {
            ApiError::new(request_id, "conflict", error.to_string())
        }
        _ => {
            tracing::error!(error = %error, "database query failed");
            ApiError::new(request_id, "internal_error", "database query failed")
        }
    }
}

pub(super) fn map_compose_error(
    request_id: String,
    error: &pulse_compose::ComposeError,
) -> ApiError {
    use pulse_compose::ComposeError;

    match error {
        ComposeError::InsufficientContent { .. } => {
            ApiError::new(request_id, "insufficient_content", error.to_string())
        }
        ComposeError::GenerationFailed(_) | ComposeError::Http(_) => {
            tracing::warn!(error = %error, "generation backend failed");
            ApiError::new(request_id, "generation_failed", error.to_string())
        }
        ComposeError::VoiceAnalysisFailed => {
            ApiError::new(request_id, "voice_analysis_failed", error.to_string())
        }
        ComposeError::Db(db) => map_db_error(request_id, db),
        ComposeError::Json(_) => {
            tracing::error!(error = %error, "composition serialization failed");
            ApiError::new(request_id, "internal_error", "composition failed")
        }
    }
}

pub(super) fn map_deliver_error(
    request_id: String,
    error: &pulse_deliver::DeliverError,
) -> ApiError {
    use pulse_deliver::DeliverError;

    match error {
        DeliverError::NoDraft => {
            ApiError::new(request_id, "not_found", "no unsent draft to deliver")
        }
        DeliverError::NoRecipients => {
            ApiError::new(request_id, "validation_error", error.to_string())
        }
        DeliverError::PartialFailure { .. } => {
            ApiError::new(request_id, "delivery_partial_failure", error.to_string())
        }
        DeliverError::Api(_) | DeliverError::Http(_) => {
            tracing::warn!(error = %error, "delivery backend failed");
            ApiError::new(request_id, "delivery_failed", error.to_string())
        }
        DeliverError::Db(db) => map_db_error(request_id, db),
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/users/{user_id}/sources",
            get(sources::list_sources).post(sources::create_source),
        )
        .route(
            "/api/v1/users/{user_id}/sources/{source_id}",
            get(sources::get_source)
                .patch(sources::update_source)
                .delete(sources::delete_source),
        )
        .route("/api/v1/users/{user_id}/scrape", post(runs::scrape_sources))
        .route(
            "/api/v1/users/{user_id}/drafts",
            get(drafts::list_drafts),
        )
        .route(
            "/api/v1/users/{user_id}/drafts/generate",
            post(runs::generate_draft),
        )
        .route(
            "/api/v1/users/{user_id}/drafts/send",
            post(runs::send_newsletter),
        )
        .route(
            "/api/v1/users/{user_id}/drafts/{draft_id}",
            get(drafts::get_draft).patch(drafts::update_draft),
        )
        .route(
            "/api/v1/users/{user_id}/voice",
            get(voice::get_voice_profile).post(voice::train_voice),
        )
        .route(
            "/api/v1/users/{user_id}/activity",
            get(activity::list_activity),
        )
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                )),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match pulse_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::json;
    use tower::ServiceExt;

    fn test_config() -> Arc<pulse_core::AppConfig> {
        // No generation/email keys: pipeline routes must fail cleanly.
        // Only supply a placeholder when the harness hasn't already set a
        // DATABASE_URL; clobbering it trips sqlx's runtime "URL changed" guard.
        if std::env::var("DATABASE_URL").is_err() {
            std::env::set_var("DATABASE_URL", "postgres://unused/unused");
        }
        let config = pulse_core::load_app_config_from_env().expect("config");
        Arc::new(config)
    }

    fn test_app(pool: sqlx::PgPool) -> Router {
        let auth = AuthState::from_env(true).expect("auth");
        build_app(
            AppState {
                pool,
                config: test_config(),
            },
            auth,
            default_rate_limit_state(),
        )
    }

    async fn seed_user(pool: &sqlx::PgPool, email: &str) -> i64 {
        sqlx::query_scalar::<_, i64>("INSERT INTO users (email) VALUES ($1) RETURNING id")
            .bind(email)
            .fetch_one(pool)
            .await
            .expect("seed_user failed")
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&bytes).expect("json parse")
    }

    #[test]
    fn normalize_limit_applies_defaults_and_bounds() {
        assert_eq!(normalize_limit(None), 50);
        assert_eq!(normalize_limit(Some(0)), 1);
        assert_eq!(normalize_limit(Some(1_000)), 200);
        assert_eq!(normalize_limit(Some(25)), 25);
    }

    #[test]
    fn insufficient_content_maps_to_422() {
        let response = ApiError::new("req-1", "insufficient_content", "too thin").into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn generation_failed_maps_to_502() {
        let response = ApiError::new("req-1", "generation_failed", "backend down").into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn source_crud_round_trip(pool: sqlx::PgPool) {
        let user_id = seed_user(&pool, "crud@example.com").await;
        let app = test_app(pool);

        // Create.
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/v1/users/{user_id}/sources"))
                    .header("content-type", "application/json")
                    .body(Body::from(
                        json!({
                            "name": "My Feed",
                            "source_type": "feed",
                            "locator": "https://example.com/feed.xml"
                        })
                        .to_string(),
                    ))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        let source_id = created["data"]["id"].as_i64().expect("source id");
        assert_eq!(created["data"]["last_run_status"], "pending");

        // Duplicate triple conflicts.
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/v1/users/{user_id}/sources"))
                    .header("content-type", "application/json")
                    .body(Body::from(
                        json!({
                            "name": "Same again",
                            "source_type": "feed",
                            "locator": "https://example.com/feed.xml"
                        })
                        .to_string(),
                    ))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::CONFLICT);

        // List.
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/v1/users/{user_id}/sources"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let listed = body_json(response).await;
        assert_eq!(listed["data"].as_array().map(Vec::len), Some(1));

        // Patch.
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("PATCH")
                    .uri(format!("/api/v1/users/{user_id}/sources/{source_id}"))
                    .header("content-type", "application/json")
                    .body(Body::from(json!({ "is_active": false }).to_string()))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let patched = body_json(response).await;
        assert_eq!(patched["data"]["is_active"], json!(false));

        // Delete, then 404 on re-delete.
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/api/v1/users/{user_id}/sources/{source_id}"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/api/v1/users/{user_id}/sources/{source_id}"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn invalid_source_type_is_rejected(pool: sqlx::PgPool) {
        let user_id = seed_user(&pool, "badtype@example.com").await;
        let app = test_app(pool);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/v1/users/{user_id}/sources"))
                    .header("content-type", "application/json")
                    .body(Body::from(
                        json!({
                            "name": "Nope",
                            "source_type": "carrier-pigeon",
                            "locator": "coop"
                        })
                        .to_string(),
                    ))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn generate_without_backend_key_is_a_502(pool: sqlx::PgPool) {
        let user_id = seed_user(&pool, "nokey@example.com").await;
        let app = test_app(pool);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/v1/users/{user_id}/drafts/generate"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "generation_failed");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn empty_training_samples_are_rejected(pool: sqlx::PgPool) {
        let user_id = seed_user(&pool, "nosamples@example.com").await;
        let app = test_app(pool);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/v1/users/{user_id}/voice"))
                    .header("content-type", "application/json")
                    .body(Body::from(json!({ "samples": [] }).to_string()))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn untrained_voice_profile_reads_as_untrained(pool: sqlx::PgPool) {
        let user_id = seed_user(&pool, "voiceless@example.com").await;
        let app = test_app(pool);

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/v1/users/{user_id}/voice"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["trained"], json!(false));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn activity_feed_lists_events(pool: sqlx::PgPool) {
        let user_id = seed_user(&pool, "activity@example.com").await;
        pulse_db::insert_activity_event(
            &pool,
            user_id,
            "source_added",
            "Source added",
            "Added a feed",
            json!({}),
        )
        .await
        .expect("insert event");

        let app = test_app(pool);
        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/v1/users/{user_id}/activity"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"][0]["event_type"], "source_added");
        assert!(body["meta"]["request_id"].is_string());
    }
}
