//! Service boundary: turns submissions into queued jobs and reports health.

mod validation;

pub use validation::{SubmitError, sanitize_filename, validate_submission};

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::oneshot;
use tracing::info;

use crate::hub::BroadcastHub;
use crate::ledger::JobLedger;
use crate::observability::Metrics;
use crate::queue::{Job, JobId, JobOutcome, JobQueue, JobState, QueuedJob};
use crate::worker::Liveness;

/// A download request as received from a client, before validation.
#[derive(Debug, Clone, Default)]
pub struct SubmitRequest {
    pub url: String,
    pub filename: String,
    pub folder: Option<String>,
}

/// An accepted submission.
#[derive(Debug)]
pub struct Submission {
    pub job_id: JobId,
    pub filename: String,
    pub queue_position: usize,
    /// Present when the caller asked to wait for the outcome.
    pub completion: Option<oneshot::Receiver<JobOutcome>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub subscriber_count: usize,
    pub queue_depth: usize,
    pub workers_alive: usize,
}

impl HealthStatus {
    pub fn worker_alive(&self) -> bool {
        self.workers_alive > 0
    }
}

pub struct DownloadService {
    queue: Arc<JobQueue>,
    hub: Arc<BroadcastHub>,
    ledger: Arc<JobLedger>,
    metrics: Arc<Metrics>,
    liveness: Liveness,
    default_folder: PathBuf,
}

impl DownloadService {
    pub fn new(
        queue: Arc<JobQueue>,
        hub: Arc<BroadcastHub>,
        ledger: Arc<JobLedger>,
        metrics: Arc<Metrics>,
        liveness: Liveness,
        default_folder: PathBuf,
    ) -> Self {
        Self {
            queue,
            hub,
            ledger,
            metrics,
            liveness,
            default_folder,
        }
    }

    /// Validate, sanitize and enqueue. Nothing is queued on error.
    pub fn submit(&self, request: SubmitRequest, wait: bool) -> Result<Submission, SubmitError> {
        let (url, filename) = validate_submission(&request.url, &request.filename)?;
        let destination = request
            .folder
            .as_deref()
            .map(str::trim)
            .filter(|folder| !folder.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| self.default_folder.clone());

        let job = Job::new(url, filename.clone(), destination);
        let job_id = job.id;
        self.ledger.insert(&job);

        let (item, completion) = if wait {
            let (item, rx) = QueuedJob::with_completion(job);
            (item, Some(rx))
        } else {
            (QueuedJob::new(job), None)
        };

        let queue_position = self.queue.push(item).map_err(|_| {
            self.ledger
                .update(job_id, JobState::Failed, Some("queue closed".to_string()));
            SubmitError::QueueClosed
        })?;

        self.metrics.job_submitted();
        info!(%job_id, filename = %filename, queue_position, "Job accepted");

        Ok(Submission {
            job_id,
            filename,
            queue_position,
            completion,
        })
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            subscriber_count: self.hub.subscriber_count(),
            queue_depth: self.queue.depth(),
            workers_alive: self.liveness.alive(),
        }
    }

    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }

    pub fn ledger(&self) -> &Arc<JobLedger> {
        &self.ledger
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }
}
