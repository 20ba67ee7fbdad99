//! Download worker pool
//!
//! Worker threads block on the job queue, run each job through the
//! configured fetcher and report progress via the bridge. One job's failure
//! never stops a worker; closing the queue is the only way to stop them.

pub mod pool;
pub mod runner;

use std::sync::Arc;

use thiserror::Error;

use crate::fetch::{FetchOptions, Fetcher};
use crate::ledger::JobLedger;
use crate::observability::Metrics;
use crate::progress::ProgressBridge;
use crate::queue::JobQueue;

pub use pool::{Liveness, WorkerPool};

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Everything a worker thread needs, shared by all workers.
pub struct WorkerContext {
    pub queue: Arc<JobQueue>,
    pub fetcher: Arc<dyn Fetcher>,
    pub bridge: ProgressBridge,
    pub ledger: Arc<JobLedger>,
    pub metrics: Arc<Metrics>,
    pub options: FetchOptions,
}
