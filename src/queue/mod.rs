pub mod fifo;
pub mod job;

pub use fifo::{JobQueue, QueueError, QueuedJob};
pub use job::{InvalidTransition, Job, JobId, JobOutcome, JobState};
