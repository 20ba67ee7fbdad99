//! Capacity-based retention for the in-memory ledger.

use std::collections::HashMap;

use super::store::JobRecord;
use crate::queue::JobId;

/// Drop the oldest terminal records until at most `capacity` remain.
///
/// Returns how many records were removed. Live jobs are kept even if that
/// leaves the map above capacity.
pub fn prune_oldest_terminal(records: &mut HashMap<JobId, JobRecord>, capacity: usize) -> usize {
    let excess = records.len().saturating_sub(capacity);
    if excess == 0 {
        return 0;
    }

    let mut terminal: Vec<(JobId, chrono::DateTime<chrono::Utc>)> = records
        .values()
        .filter(|record| record.state.is_terminal())
        .map(|record| (record.job_id, record.updated_at))
        .collect();
    terminal.sort_by_key(|(_, updated_at)| *updated_at);

    let mut removed = 0;
    for (job_id, _) in terminal.into_iter().take(excess) {
        if records.remove(&job_id).is_some() {
            removed += 1;
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::JobLedger;
    use crate::queue::{Job, JobState};

    #[test]
    fn oldest_terminal_records_go_first() {
        let ledger = JobLedger::new(2);

        let first = Job::new("u1", "first", "downloads");
        ledger.insert(&first);
        ledger.update(first.id, JobState::Running, None);
        ledger.update(first.id, JobState::Finished, None);

        let running = Job::new("u2", "running", "downloads");
        ledger.insert(&running);
        ledger.update(running.id, JobState::Running, None);

        let third = Job::new("u3", "third", "downloads");
        ledger.insert(&third);

        assert_eq!(ledger.len(), 2);
        assert!(ledger.get(&first.id).is_none());
        assert!(ledger.get(&running.id).is_some());
        assert!(ledger.get(&third.id).is_some());
    }

    #[test]
    fn live_jobs_are_never_pruned() {
        let ledger = JobLedger::new(1);
        let a = Job::new("u1", "a", "downloads");
        let b = Job::new("u2", "b", "downloads");
        ledger.insert(&a);
        ledger.insert(&b);

        assert_eq!(ledger.len(), 2);
    }
}
