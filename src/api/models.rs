//! Request and response bodies of the HTTP API.
//!
//! Submit a download:
//!
//! ```json
//! { "url": "https://www.youtube.com/watch?v=...", "filename": "Test Video!", "folder": "downloads" }
//! ```
//!
//! The reply carries the sanitized filename (`Test_Video`) that every
//! subsequent progress message for the job uses.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ledger::LedgerStats;
use crate::observability::MetricsSnapshot;

/// Body of `POST /download`. Missing strings deserialize as empty so that
/// they are reported through the regular validation messages.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DownloadRequest {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub folder: Option<String>,
    /// Hold the response until the job has finished or failed.
    #[serde(default)]
    pub wait: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadResponse {
    pub status: ResponseStatus,
    pub message: String,
    pub filename: String,
    pub job_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_position: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub active_connections: usize,
    pub queue_depth: usize,
    pub workers_alive: usize,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    #[serde(flatten)]
    pub counters: MetricsSnapshot,
    pub ledger: LedgerStats,
    pub workers_alive: usize,
}
