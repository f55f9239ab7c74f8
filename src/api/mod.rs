pub mod response;
pub mod server;
pub mod storage;

pub use response::{ApiResponse, ListResponse};

use std::sync::Arc;
use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    routing::get,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::state::AppState;

/// Build the HTTP router / 构建路由
///
/// Unmatched paths fall through to the static front-end directory.
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.server.max_upload_mb.saturating_mul(1024 * 1024);
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::PUT, Method::OPTIONS]);

    Router::new()
        .route("/ping", get(server::ping))
        .route("/login", get(server::login))
        .route("/get_upload_config", get(server::get_upload_config))
        .route("/api/:backend", get(storage::storage_api).post(storage::storage_api))
        .fallback_service(ServeDir::new(&state.config.server.static_dir))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
