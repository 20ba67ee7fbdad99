use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use super::{WorkerContext, WorkerError, runner};

/// Count of worker threads that have not exited yet.
#[derive(Debug, Clone, Default)]
pub struct Liveness(Arc<AtomicUsize>);

impl Liveness {
    pub fn alive(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Decrements the live count when a worker thread ends, including by panic.
struct AliveGuard(Liveness);

impl Drop for AliveGuard {
    fn drop(&mut self) {
        self.0.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Fixed set of OS threads pulling jobs from the shared queue.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    liveness: Liveness,
}

impl WorkerPool {
    pub fn spawn(size: usize, ctx: WorkerContext) -> Result<Self, WorkerError> {
        info!(size, fetcher = ctx.fetcher.name(), "Starting worker pool");

        let liveness = Liveness::default();
        let ctx = Arc::new(ctx);
        let mut handles = Vec::with_capacity(size);

        for worker_id in 0..size {
            liveness.0.fetch_add(1, Ordering::SeqCst);
            let guard = AliveGuard(liveness.clone());
            let ctx = Arc::clone(&ctx);

            let spawned = thread::Builder::new()
                .name(format!("fetch-worker-{worker_id}"))
                .spawn(move || {
                    let _guard = guard;
                    worker_loop(worker_id, &ctx);
                });

            // On failure the closure, and the guard with it, is dropped.
            let handle = spawned.map_err(WorkerError::Spawn)?;
            handles.push(handle);
        }

        Ok(Self { handles, liveness })
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    pub fn liveness(&self) -> Liveness {
        self.liveness.clone()
    }

    /// Block until every worker has exited. Only returns after the queue is
    /// closed and drained.
    pub fn join(self) {
        for handle in self.handles {
            let name = handle.thread().name().unwrap_or("worker").to_string();
            if handle.join().is_err() {
                warn!(worker = %name, "Worker thread panicked");
            }
        }
        debug!("All workers joined");
    }
}

fn worker_loop(worker_id: usize, ctx: &WorkerContext) {
    debug!(worker_id, "Worker started");
    while let Some(item) = ctx.queue.pop() {
        runner::run_job(ctx, item);
    }
    info!(worker_id, "Job queue closed, worker exiting");
}
