mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt; // for `oneshot`

use fetchcast::api::models::{DownloadResponse, HealthResponse, ResponseStatus};
use fetchcast::ledger::JobRecord;
use fetchcast::queue::JobState;

/// Helper to build a POST /download request
fn post_download(body: Value) -> Request<Body> {
    Request::builder()
        .uri("/download")
        .method("POST")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_empty_url_is_rejected_and_nothing_queued() {
    let temp_dir = TempDir::new().unwrap();
    let service = common::start_service(temp_dir.path(), 1);

    let response = service
        .router()
        .oneshot(post_download(json!({ "url": "", "filename": "x" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "URL is required");

    let health = service.state().service.health();
    assert_eq!(health.queue_depth, 0);
    assert!(service.state().service.ledger().is_empty());

    service.shutdown().await;
}

#[tokio::test]
async fn test_missing_or_unusable_filename_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let service = common::start_service(temp_dir.path(), 1);

    for body in [
        json!({ "url": "https://example.com/v" }),
        json!({ "url": "https://example.com/v", "filename": "   " }),
        json!({ "url": "https://example.com/v", "filename": "!!!" }),
    ] {
        let response = service.router().oneshot(post_download(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Filename is required");
    }

    service.shutdown().await;
}

#[tokio::test]
async fn test_wait_returns_completion_with_sanitized_name() {
    let temp_dir = TempDir::new().unwrap();
    let service = common::start_service(temp_dir.path(), 2);

    let response = service
        .router()
        .oneshot(post_download(json!({
            "url": "https://example.com/watch?v=1",
            "filename": "Test Video!",
            "wait": true,
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let download: DownloadResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(download.status, ResponseStatus::Success);
    assert_eq!(download.filename, "Test_Video");
    assert_eq!(download.message, "Download completed for 'Test_Video'");

    // The ledger is updated before the waiter is released
    let response = service
        .router()
        .oneshot(get(&format!("/jobs/{}", download.job_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let record: JobRecord = serde_json::from_slice(&body).unwrap();
    assert_eq!(record.state, JobState::Finished);
    assert_eq!(record.filename, "Test_Video");

    service.shutdown().await;
}

#[tokio::test]
async fn test_wait_reports_failed_download() {
    let temp_dir = TempDir::new().unwrap();
    let service = common::start_service(temp_dir.path(), 1);

    let response = service
        .router()
        .oneshot(post_download(json!({
            "url": "https://example.com/fail",
            "filename": "broken",
            "wait": true,
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "Download failed for 'broken'");

    let snapshot = service.state().service.metrics().snapshot();
    assert_eq!(snapshot.jobs_failed, 1);

    service.shutdown().await;
}

#[tokio::test]
async fn test_submit_without_wait_is_accepted() {
    let temp_dir = TempDir::new().unwrap();
    let service = common::start_service(temp_dir.path(), 1);

    let response = service
        .router()
        .oneshot(post_download(json!({
            "url": "https://example.com/a",
            "filename": "clip one",
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = body_json(response).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["filename"], "clip_one");
    assert_eq!(body["message"], "Download queued for 'clip_one'");
    assert!(body["queue_position"].as_u64().unwrap() >= 1);
    assert!(body["job_id"].is_string());

    service.shutdown().await;
}

#[tokio::test]
async fn test_wrong_content_type_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let service = common::start_service(temp_dir.path(), 1);

    let request = Request::builder()
        .uri("/download")
        .method("POST")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("url=x&filename=y"))
        .unwrap();
    let response = service.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .uri("/download")
        .method("POST")
        .body(Body::from(r#"{"url": "u", "filename": "f"}"#))
        .unwrap();
    let response = service.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(service.state().service.health().queue_depth, 0);

    let request = Request::builder()
        .uri("/download")
        .method("POST")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = service.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "INVALID_PAYLOAD");

    service.shutdown().await;
}

#[tokio::test]
async fn test_json_with_charset_is_accepted() {
    let temp_dir = TempDir::new().unwrap();
    let service = common::start_service(temp_dir.path(), 1);

    let request = Request::builder()
        .uri("/download")
        .method("POST")
        .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
        .body(Body::from(r#"{"url": "https://example.com/a", "filename": "a"}"#))
        .unwrap();
    let response = service.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    service.shutdown().await;
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let service = common::start_service(temp_dir.path(), 1);

    let huge = "a".repeat(128 * 1024);
    let response = service
        .router()
        .oneshot(post_download(json!({ "url": "u", "filename": huge })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body = body_json(response).await;
    assert_eq!(body["code"], "PAYLOAD_TOO_LARGE");
    assert!(service.state().service.ledger().is_empty());

    service.shutdown().await;
}

#[tokio::test]
async fn test_get_unknown_job_returns_404() {
    let temp_dir = TempDir::new().unwrap();
    let service = common::start_service(temp_dir.path(), 1);

    let response = service
        .router()
        .oneshot(get(&format!("/jobs/{}", uuid::Uuid::now_v7())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    service.shutdown().await;
}

#[tokio::test]
async fn test_health_reports_components() {
    let temp_dir = TempDir::new().unwrap();
    let service = common::start_service(temp_dir.path(), 3);

    let response = service.router().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let health: HealthResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.workers_alive, 3);
    assert_eq!(health.active_connections, 0);
    assert_eq!(health.queue_depth, 0);

    service.shutdown().await;
}

#[tokio::test]
async fn test_index_and_metrics_respond() {
    let temp_dir = TempDir::new().unwrap();
    let service = common::start_service(temp_dir.path(), 1);

    let response = service.router().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["endpoints"]["health"], "GET /health");

    let response = service.router().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["jobs_submitted"], 0);
    assert_eq!(body["ledger"]["finished"], 0);
    assert_eq!(body["workers_alive"], 1);

    let response = service
        .router()
        .oneshot(post_download(json!({
            "url": "https://example.com/fail",
            "filename": "broken",
            "wait": true,
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = service.router().oneshot(get("/metrics")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["jobs_submitted"], 1);
    assert_eq!(body["jobs_failed"], 1);
    assert_eq!(body["ledger"]["failed"], 1);
    assert_eq!(body["ledger"]["queued"], 0);

    service.shutdown().await;
}
