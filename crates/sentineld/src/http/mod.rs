//! HTTP surface: the dashboard's read API plus a static-asset
//! fallback for the web UI, built on `axum`/`tower-http`.

mod assets;
mod handlers;

use std::path::PathBuf;
use std::sync::Arc;

use axum::middleware;
use axum::routing::get;
use axum::Router;
use tower::ServiceBuilder;

use crate::scheduler::Scheduler;

pub struct AppState {
    pub scheduler: Arc<Scheduler>,
    pub config_path: PathBuf,
    pub asset_root: PathBuf,
}

pub fn build_router(scheduler: Arc<Scheduler>, config_path: PathBuf, asset_root: PathBuf) -> Router {
    let state = Arc::new(AppState {
        scheduler,
        config_path,
        asset_root,
    });

    let middleware_stack = ServiceBuilder::new()
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(middleware::from_fn(handlers::normalize_method_not_allowed));

    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/api/v1/dashboard/status", get(handlers::status))
        .route("/api/v1/dashboard/snapshot", get(handlers::snapshot))
        .route("/api/v1/dashboard/refresh", axum::routing::post(handlers::refresh))
        .route(
            "/api/v1/dashboard/config",
            get(handlers::get_config).put(handlers::put_config),
        )
        .fallback(assets::static_handler)
        .layer(middleware_stack)
        .with_state(state)
}
