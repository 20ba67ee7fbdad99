//! In-memory ledger of submitted jobs and their current state.
//!
//! Backs `GET /jobs/{job_id}`. Nothing is persisted across restarts.

pub mod pruning;
pub mod store;

pub use store::{JobLedger, JobRecord, LedgerStats};
