use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use sentinel_core::domain::{ErrorPayload, SentinelError};

use super::AppState;

pub fn error_response(err: &SentinelError) -> Response {
    let payload = ErrorPayload::from_error(err);
    let status = status_for_code(&payload.code);
    (status, Json(payload)).into_response()
}

fn status_for_code(code: &str) -> StatusCode {
    match code {
        "E_DASHBOARD_ASSET_FORBIDDEN" => StatusCode::FORBIDDEN,
        "E_DASHBOARD_ASSETS_MISSING" => StatusCode::NOT_FOUND,
        "E_DASHBOARD_AUTH_REQUIRED" => StatusCode::UNAUTHORIZED,
        "E_DASHBOARD_METHOD_NOT_ALLOWED" => StatusCode::METHOD_NOT_ALLOWED,
        "E_SENTINEL_CONFIG_NOT_FOUND" | "E_SENTINEL_CONFIG_INVALID_JSON" | "E_SENTINEL_CONFIG_INVALID" => {
            StatusCode::BAD_REQUEST
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let status = state.scheduler.status().await;
    Json(json!({
        "ok": true,
        "ready": status.ready,
        "stale": status.stale,
        "generatedAt": status.generated_at,
        "nextRefreshAt": status.next_refresh_at,
    }))
}

pub async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.scheduler.status().await)
}

pub async fn snapshot(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.scheduler.snapshot().await)
}

pub async fn refresh(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.scheduler.trigger_refresh().await;
    let status = state.scheduler.status().await;
    Json(json!({ "status": status, "snapshot": snapshot }))
}

#[derive(Debug, Serialize)]
struct ConfigResponse {
    config_path: String,
    source: sentinel_core::ConfigSource,
    config: sentinel_core::Config,
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let config = state.scheduler.config_snapshot().await;
    let source = state.scheduler.config_source().await;
    Json(ConfigResponse {
        config_path: state.config_path.display().to_string(),
        source,
        config,
    })
}

#[derive(Debug, Deserialize)]
pub struct PutConfigBody {
    config: sentinel_core::Config,
}

pub async fn put_config(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PutConfigBody>,
) -> Response {
    if let Err(issues) = body.config.validate() {
        return error_response(&SentinelError::ConfigInvalid(issues));
    }
    if let Err(e) = sentinel_core::write_config(&state.config_path, &body.config) {
        return error_response(&e);
    }
    state.scheduler.set_config(body.config.clone()).await;
    let source = state.scheduler.config_source().await;
    let snapshot = state.scheduler.trigger_refresh().await;
    let status = state.scheduler.status().await;
    Json(json!({
        "configPath": state.config_path.display().to_string(),
        "source": source,
        "config": body.config,
        "status": status,
        "snapshot": snapshot,
    }))
    .into_response()
}

/// Rewrites axum's built-in 405 response (no body) into the
/// `{code, message}` shape the rest of this API uses.
pub async fn normalize_method_not_allowed(req: Request, next: Next) -> Response {
    let response = next.run(req).await;
    if response.status() == StatusCode::METHOD_NOT_ALLOWED {
        return error_response(&SentinelError::DashboardMethodNotAllowed(
            "method not allowed on this path".to_string(),
        ));
    }
    response
}
