use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, Uri};
use axum::response::{IntoResponse, Response};

use sentinel_core::domain::SentinelError;

use super::handlers::error_response;
use super::AppState;

/// Rejects any relative path containing a `..` component, so a request
/// can never resolve outside `assetRoot` regardless of what the
/// filesystem looks like.
fn is_contained(rel: &Path) -> bool {
    !rel.components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir))
}

fn guess_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("js") => "application/javascript; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("ico") => "image/x-icon",
        Some("woff2") => "font/woff2",
        _ => "application/octet-stream",
    }
}

pub async fn static_handler(State(state): State<Arc<AppState>>, uri: Uri) -> Response {
    let rel = PathBuf::from(uri.path().trim_start_matches('/'));

    if !is_contained(&rel) {
        return error_response(&SentinelError::DashboardAssetForbidden(format!(
            "{} escapes the asset root",
            uri.path()
        )));
    }

    let candidate = state.asset_root.join(&rel);
    let serve_path = if candidate.is_file() {
        candidate
    } else {
        state.asset_root.join("index.html")
    };

    match tokio::fs::read(&serve_path).await {
        Ok(bytes) => {
            let content_type = guess_content_type(&serve_path);
            ([(header::CONTENT_TYPE, content_type)], bytes).into_response()
        }
        Err(_) => {
            let err = SentinelError::DashboardAssetsMissing(format!(
                "{} not found under asset root",
                serve_path.display()
            ));
            error_response(&err)
        }
    }
}
