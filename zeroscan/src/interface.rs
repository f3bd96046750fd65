//! Traits for interfacing the scan engine with the caller's persistence layer

use std::fmt::Debug;

use crate::primitives::{JobId, JobStatus, ScanSummary};

/// Job and result persistence owned by the embedding application.
///
/// The queue worker reports every status transition and outcome through this trait. Store errors
/// are logged and never stop the worker.
pub trait JobStore {
    /// Errors associated with the underlying store.
    type Error: Debug;

    /// Records a status transition for the job.
    fn update_status(&self, job_id: JobId, status: JobStatus) -> Result<(), Self::Error>;

    /// Records the structured outcome of a completed job.
    fn record_result(&self, job_id: JobId, summary: &ScanSummary) -> Result<(), Self::Error>;

    /// Marks the job failed, retaining a human-readable cause for inspection.
    fn record_failure(&self, job_id: JobId, reason: &str) -> Result<(), Self::Error>;
}
