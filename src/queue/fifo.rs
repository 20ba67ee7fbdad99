use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use super::job::{Job, JobOutcome};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Job queue is closed")]
    Closed,
}

/// A job waiting in the queue, plus an optional channel to report its outcome.
#[derive(Debug)]
pub struct QueuedJob {
    pub job: Job,
    pub completion: Option<oneshot::Sender<JobOutcome>>,
}

impl QueuedJob {
    pub fn new(job: Job) -> Self {
        Self {
            job,
            completion: None,
        }
    }

    /// Attach a completion channel and hand back its receiving end.
    pub fn with_completion(job: Job) -> (Self, oneshot::Receiver<JobOutcome>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                job,
                completion: Some(tx),
            },
            rx,
        )
    }
}

/// Unbounded FIFO shared by request handlers (producers) and worker
/// threads (consumers).
///
/// `push` never blocks. `pop` blocks the calling OS thread until a job is
/// available, and returns `None` once the queue has been closed and drained;
/// that is the only way workers are told to stop. It must not be called
/// from inside the async runtime.
pub struct JobQueue {
    sender: Mutex<Option<mpsc::UnboundedSender<QueuedJob>>>,
    receiver: Mutex<mpsc::UnboundedReceiver<QueuedJob>>,
    depth: AtomicUsize,
}

impl JobQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            sender: Mutex::new(Some(tx)),
            receiver: Mutex::new(rx),
            depth: AtomicUsize::new(0),
        }
    }

    /// Append a job; returns its 1-based position at the time of insertion.
    pub fn push(&self, item: QueuedJob) -> Result<usize, QueueError> {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = sender.as_ref() else {
            return Err(QueueError::Closed);
        };

        let job_id = item.job.id;
        let position = self.depth.fetch_add(1, Ordering::SeqCst) + 1;
        if tx.send(item).is_err() {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            return Err(QueueError::Closed);
        }

        debug!(%job_id, position, "Job enqueued");
        Ok(position)
    }

    /// Blocking dequeue for worker threads.
    pub fn pop(&self) -> Option<QueuedJob> {
        let mut rx = self.receiver.lock().unwrap_or_else(PoisonError::into_inner);
        let item = rx.blocking_recv()?;
        self.depth.fetch_sub(1, Ordering::SeqCst);
        Some(item)
    }

    /// Stop accepting jobs. Jobs already queued are still handed out; after
    /// the last one, `pop` returns `None`.
    pub fn close(&self) {
        let previous = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            info!(pending = self.depth(), "Job queue closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Jobs accepted but not yet picked up by a worker.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}
