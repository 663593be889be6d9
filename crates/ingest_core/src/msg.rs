#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User asked to ingest a file or URL.
    SubmitRequested(crate::JobSource),
    /// The service accepted the submission and assigned an identifier.
    SubmitSucceeded {
        job_id: crate::JobId,
        identifier: String,
    },
    /// The submission call failed; `message` is what the user should see.
    SubmitFailed {
        job_id: crate::JobId,
        message: String,
    },
    /// A poll tick got a status report.
    PollSucceeded {
        job_id: crate::JobId,
        report: crate::ProgressReport,
    },
    /// A poll tick failed (network, timeout, non-2xx).
    PollFailed { job_id: crate::JobId },
    /// User clicked Cancel.
    CancelRequested,
    /// The cleanup request for a cancelled job finished, either way.
    CleanupFinished {
        job_id: crate::JobId,
        succeeded: bool,
    },
    /// User dismissed a finished job.
    ResetRequested,
}
