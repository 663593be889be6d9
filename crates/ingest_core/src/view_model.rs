use crate::{JobId, JobStatus};

/// Read-only snapshot of the tracked job for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusView {
    pub status: JobStatus,
    pub job_id: Option<JobId>,
    /// Service-assigned identifier, once the submission was accepted.
    pub identifier: Option<String>,
    pub source_label: Option<String>,
    pub progress_percent: u8,
    /// Last free-text status reported by the service.
    pub remote_status: Option<String>,
    pub consecutive_poll_failures: u32,
    pub last_error: Option<String>,
    pub dirty: bool,
}
