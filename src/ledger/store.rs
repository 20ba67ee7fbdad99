use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::pruning::prune_oldest_terminal;
use crate::queue::{Job, JobId, JobState};

/// Externally visible state of one job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: JobId,
    pub url: String,
    pub filename: String,
    pub destination: String,
    pub state: JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    fn from_job(job: &Job) -> Self {
        let now = Utc::now();
        Self {
            job_id: job.id,
            url: job.url.clone(),
            filename: job.target_name.clone(),
            destination: job.destination.display().to_string(),
            state: job.state(),
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LedgerStats {
    pub queued: usize,
    pub running: usize,
    pub finished: usize,
    pub failed: usize,
}

/// In-memory job records, lost on restart.
///
/// Holds at most `max_records` entries; when full, the oldest finished or
/// failed records are dropped first. Queued and running jobs are never
/// dropped.
pub struct JobLedger {
    records: RwLock<HashMap<JobId, JobRecord>>,
    max_records: usize,
}

impl JobLedger {
    pub fn new(max_records: usize) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            max_records,
        }
    }

    pub fn insert(&self, job: &Job) {
        let mut records = self.write();
        records.insert(job.id, JobRecord::from_job(job));

        if records.len() > self.max_records {
            let pruned = prune_oldest_terminal(&mut records, self.max_records);
            debug!(pruned, "Pruned terminal job records");
        }
    }

    /// Record a state change. Unknown ids are ignored (already pruned).
    pub fn update(&self, job_id: JobId, state: JobState, error: Option<String>) {
        let mut records = self.write();
        let Some(record) = records.get_mut(&job_id) else {
            warn!(%job_id, ?state, "State update for unknown job");
            return;
        };
        record.state = state;
        record.error = error;
        record.updated_at = Utc::now();
    }

    pub fn get(&self, job_id: &JobId) -> Option<JobRecord> {
        self.read().get(job_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn stats(&self) -> LedgerStats {
        self.read()
            .values()
            .fold(LedgerStats::default(), |mut stats, record| {
                match record.state {
                    JobState::Queued => stats.queued += 1,
                    JobState::Running => stats.running += 1,
                    JobState::Finished => stats.finished += 1,
                    JobState::Failed => stats.failed += 1,
                }
                stats
            })
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<JobId, JobRecord>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<JobId, JobRecord>> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_state_changes() {
        let ledger = JobLedger::new(10);
        let job = Job::new("https://example.com/v", "clip", "downloads");
        ledger.insert(&job);

        ledger.update(job.id, JobState::Running, None);
        ledger.update(job.id, JobState::Failed, Some("boom".into()));

        let record = ledger.get(&job.id).unwrap();
        assert_eq!(record.state, JobState::Failed);
        assert_eq!(record.error.as_deref(), Some("boom"));
        assert_eq!(record.filename, "clip");
        assert!(record.updated_at >= record.created_at);
        assert_eq!(
            ledger.stats(),
            LedgerStats {
                failed: 1,
                ..Default::default()
            }
        );
    }

    #[test]
    fn update_of_unknown_job_is_ignored() {
        let ledger = JobLedger::new(10);
        ledger.update(uuid::Uuid::now_v7(), JobState::Running, None);
        assert!(ledger.is_empty());
    }
}
