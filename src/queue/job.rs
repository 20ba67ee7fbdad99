use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub type JobId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Running,
    Finished,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Finished | JobState::Failed)
    }

    pub fn can_transition_to(self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Queued, JobState::Running)
                | (JobState::Running, JobState::Finished)
                | (JobState::Running, JobState::Failed)
        )
    }
}

#[derive(Debug, Error)]
#[error("invalid job transition {from:?} -> {to:?}")]
pub struct InvalidTransition {
    pub from: JobState,
    pub to: JobState,
}

/// One requested download.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub url: String,
    pub target_name: String,
    pub destination: PathBuf,
    state: JobState,
}

impl Job {
    /// New job in the `Queued` state with a time-ordered id.
    pub fn new(
        url: impl Into<String>,
        target_name: impl Into<String>,
        destination: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            url: url.into(),
            target_name: target_name.into(),
            destination: destination.into(),
            state: JobState::Queued,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn transition(&mut self, next: JobState) -> Result<(), InvalidTransition> {
        if !self.state.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }
}

/// Terminal result of a job, reported back to a waiting submitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Finished,
    Failed(String),
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Finished)
    }

    pub fn state(&self) -> JobState {
        match self {
            JobOutcome::Finished => JobState::Finished,
            JobOutcome::Failed(_) => JobState::Failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_follows_lifecycle() {
        let mut job = Job::new("https://example.com/v", "clip", "downloads");
        assert_eq!(job.state(), JobState::Queued);

        job.transition(JobState::Running).unwrap();
        job.transition(JobState::Finished).unwrap();
        assert!(job.state().is_terminal());
    }

    #[test]
    fn terminal_state_is_final() {
        let mut job = Job::new("u", "clip", "downloads");
        job.transition(JobState::Running).unwrap();
        job.transition(JobState::Failed).unwrap();

        let err = job.transition(JobState::Running).unwrap_err();
        assert_eq!(err.from, JobState::Failed);
        assert_eq!(job.state(), JobState::Failed);
    }

    #[test]
    fn queued_cannot_skip_running() {
        let mut job = Job::new("u", "clip", "downloads");
        assert!(job.transition(JobState::Finished).is_err());
        assert!(job.transition(JobState::Queued).is_err());
    }
}
