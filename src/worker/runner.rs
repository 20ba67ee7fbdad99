//! Job runner - takes one queued job from pickup to a terminal state

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::{error, info, warn};

use super::WorkerContext;
use crate::fetch::{FetchError, FetchRequest, output_template};
use crate::progress::ProgressTracker;
use crate::queue::{Job, JobOutcome, JobState, QueuedJob};

/// Run one job to completion on the calling worker thread.
///
/// Never panics and never returns an error: every failure becomes a
/// `Failed` outcome and an `error` broadcast.
pub fn run_job(ctx: &WorkerContext, item: QueuedJob) -> JobOutcome {
    let QueuedJob {
        mut job,
        completion,
    } = item;

    set_state(ctx, &mut job, JobState::Running, None);
    info!(job_id = %job.id, filename = %job.target_name, url = %job.url, "Processing job");

    let mut tracker = ProgressTracker::new(
        job.id,
        job.target_name.clone(),
        job.url.clone(),
        ctx.bridge.clone(),
    );
    tracker.started();

    let outcome = match execute(ctx, &job, &mut tracker) {
        Ok(()) => {
            tracker.finished();
            ctx.metrics.job_completed();
            info!(job_id = %job.id, filename = %job.target_name, "Download completed");
            JobOutcome::Finished
        }
        Err(e) => {
            let reason = e.to_string();
            tracker.failed(&reason);
            ctx.metrics.job_failed();
            error!(job_id = %job.id, filename = %job.target_name, error = %reason, "Download failed");
            JobOutcome::Failed(reason)
        }
    };

    let error = match &outcome {
        JobOutcome::Failed(reason) => Some(reason.clone()),
        JobOutcome::Finished => None,
    };
    set_state(ctx, &mut job, outcome.state(), error);

    if let Some(tx) = completion {
        // The submitter may have gone away; that is fine.
        let _ = tx.send(outcome.clone());
    }
    outcome
}

fn execute(ctx: &WorkerContext, job: &Job, tracker: &mut ProgressTracker) -> Result<(), FetchError> {
    std::fs::create_dir_all(&job.destination)?;

    let request = FetchRequest {
        url: job.url.clone(),
        output_template: output_template(&job.destination, &job.target_name),
        options: ctx.options.clone(),
    };

    let fetcher = &ctx.fetcher;
    catch_unwind(AssertUnwindSafe(|| {
        fetcher.fetch(&request, &mut |status| tracker.on_hook(status))
    }))
    .unwrap_or_else(|panic| Err(FetchError::Panicked(panic_message(panic.as_ref()))))
}

fn set_state(ctx: &WorkerContext, job: &mut Job, next: JobState, error: Option<String>) {
    if let Err(e) = job.transition(next) {
        warn!(job_id = %job.id, error = %e, "Unexpected job transition");
        return;
    }
    ctx.ledger.update(job.id, next, error);
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
