use std::time::Duration;

use crate::{JobId, JobSource};

/// Side effects requested by [`crate::update`]; executed by the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send the job to the ingestion service.
    Submit { job_id: JobId, source: JobSource },
    /// Arm the single poll timer for `identifier`, replacing any other timer.
    StartPolling {
        job_id: JobId,
        identifier: String,
        interval: Duration,
    },
    /// Disarm the poll timer if it still belongs to `job_id`.
    StopPolling { job_id: JobId },
    /// Best-effort remote cleanup of an abandoned job.
    RequestCleanup { job_id: JobId, identifier: String },
    /// Fired once when a job reaches `Success`.
    NotifyCompleted { job_id: JobId, identifier: String },
}
