use axum::{Router, extract::DefaultBodyLimit, routing::get, routing::post};
use tower_http::cors::CorsLayer;
use tower_http::decompression::RequestDecompressionLayer;

use super::{
    services::{get_job, health, index, metrics, submit_download, test_progress},
    state::AppState,
    ws::ws_handler,
};

pub fn router(state: AppState) -> Router {
    let body_limit = state.config.server.max_body_bytes.as_usize();

    Router::new()
        .route("/", get(index))
        .route("/download", post(submit_download))
        .route("/jobs/{job_id}", get(get_job))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/test-progress", get(test_progress))
        .route("/ws", get(ws_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        // Browser clients connect from other origins
        .layer(CorsLayer::permissive())
        // Automatically decompress gzip request bodies
        .layer(RequestDecompressionLayer::new())
}
