use std::time::Duration;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    models::{DownloadRequest, DownloadResponse, HealthResponse, MetricsResponse, ResponseStatus},
    state::AppState,
};
use crate::api::error::ApiError;
use crate::orchestrator::SubmitRequest;
use crate::progress::HubMessage;
use crate::queue::JobOutcome;

const SERVICE_NAME: &str = "fetchcast";
const TEST_FILENAME: &str = "test_video.mp4";

/// Download submission endpoint (POST /download)
///
/// ## Flow:
/// 1. The `Json` extractor checks Content-Type and decodes the body; the
///    router's `DefaultBodyLimit` caps its size at `server.max_body_bytes`
/// 2. The download service validates, sanitizes and enqueues the request
/// 3. Without `wait`, return 202 with the job id and queue position
/// 4. With `wait`, hold the response until a worker reports the outcome
pub async fn submit_download(
    State(state): State<AppState>,
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let wait = request.wait;

    let submission = state.service.submit(
        SubmitRequest {
            url: request.url,
            filename: request.filename,
            folder: request.folder,
        },
        wait,
    )?;

    let Some(completion) = submission.completion else {
        let response = DownloadResponse {
            status: ResponseStatus::Success,
            message: format!("Download queued for '{}'", submission.filename),
            filename: submission.filename,
            job_id: submission.job_id,
            queue_position: Some(submission.queue_position),
        };
        return Ok((StatusCode::ACCEPTED, Json(response)));
    };

    // The sender is dropped without a value only if the worker thread died.
    let outcome = completion.await.unwrap_or_else(|_| {
        warn!(job_id = %submission.job_id, "Job completion channel dropped");
        JobOutcome::Failed("worker stopped".to_string())
    });

    let (status, verb) = if outcome.is_success() {
        (ResponseStatus::Success, "completed")
    } else {
        (ResponseStatus::Error, "failed")
    };
    let response = DownloadResponse {
        status,
        message: format!("Download {verb} for '{}'", submission.filename),
        filename: submission.filename,
        job_id: submission.job_id,
        queue_position: None,
    };

    Ok((StatusCode::OK, Json(response)))
}

/// Job status endpoint (GET /jobs/{job_id})
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .service
        .ledger()
        .get(&job_id)
        .ok_or_else(|| ApiError::NotFound(format!("job {job_id}")))?;

    Ok((StatusCode::OK, Json(record)))
}

/// Health check endpoint (GET /health)
///
/// Returns 503 Service Unavailable when no worker thread is alive, since
/// queued jobs would never run.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let health = state.service.health();
    let (status_code, status) = if health.worker_alive() {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let response = HealthResponse {
        status: status.to_string(),
        service: SERVICE_NAME.to_string(),
        active_connections: health.subscriber_count,
        queue_depth: health.queue_depth,
        workers_alive: health.workers_alive,
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (status_code, Json(response))
}

/// Counter snapshot plus ledger totals (GET /metrics)
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let service = &state.service;
    Json(MetricsResponse {
        counters: service.metrics().snapshot(),
        ledger: service.ledger().stats(),
        workers_alive: service.health().workers_alive,
    })
}

/// Synthetic progress run for checking subscribers (GET /test-progress)
///
/// Responds once the whole run has been broadcast.
pub async fn test_progress(State(state): State<AppState>) -> impl IntoResponse {
    let hub = state.hub();
    let metrics = state.service.metrics();
    info!(subscribers = hub.subscriber_count(), "Broadcasting test progress");

    for i in 1..=100u32 {
        let message = HubMessage::Progress {
            percent: format!("{i}%"),
            speed: format!("{} KB/s", i * 100),
            eta: format!("{} seconds", 100 - i),
            filename: TEST_FILENAME.to_string(),
        };
        let report = hub.broadcast(&message).await;
        metrics.broadcast_sent(&report);
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    let report = hub
        .broadcast(&HubMessage::Completed {
            filename: TEST_FILENAME.to_string(),
            message: "Test download completed!".to_string(),
        })
        .await;
    metrics.broadcast_sent(&report);

    Json(json!({ "status": "test_completed" }))
}

/// Endpoint index (GET /)
pub async fn index(State(state): State<AppState>) -> impl IntoResponse {
    let addr = state.config.server.bind_addr;
    Json(json!({
        "app": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "websocket": format!("ws://{addr}/ws"),
            "download": "POST /download {\"url\": URL, \"filename\": NAME}",
            "job": "GET /jobs/{job_id}",
            "health": "GET /health",
            "metrics": "GET /metrics",
            "test": "GET /test-progress",
        },
    }))
}
