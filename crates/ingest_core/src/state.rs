use std::collections::BTreeSet;
use std::fmt;

use crate::view_model::StatusView;
use crate::ControllerConfig;

/// Local sequence number of a job. Never reused within one controller.
pub type JobId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobStatus {
    #[default]
    Idle,
    Uploading,
    Processing,
    Success,
    Error,
    Cancelled,
}

impl JobStatus {
    /// `Uploading` or `Processing`: a job the service is still working on.
    pub fn is_active(self) -> bool {
        matches!(self, JobStatus::Uploading | JobStatus::Processing)
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Success | JobStatus::Error | JobStatus::Cancelled
        )
    }
}

/// What the user asked to ingest.
#[derive(Clone, PartialEq, Eq)]
pub enum JobSource {
    LocalFile { name: String, bytes: Vec<u8> },
    RemoteUrl(String),
}

impl JobSource {
    /// Short human-readable name for status lines.
    pub fn label(&self) -> String {
        match self {
            JobSource::LocalFile { name, .. } => name.clone(),
            JobSource::RemoteUrl(raw) => match url::Url::parse(raw.trim()) {
                Ok(parsed) => match parsed.host_str() {
                    Some(host) => format!("{host}{}", parsed.path().trim_end_matches('/')),
                    None => raw.trim().to_string(),
                },
                Err(_) => raw.trim().to_string(),
            },
        }
    }
}

impl fmt::Debug for JobSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobSource::LocalFile { name, bytes } => f
                .debug_struct("LocalFile")
                .field("name", name)
                .field("len", &bytes.len())
                .finish(),
            JobSource::RemoteUrl(url) => f.debug_tuple("RemoteUrl").field(url).finish(),
        }
    }
}

/// One status report from the ingestion service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressReport {
    /// `-1` on remote failure, `100` on completion.
    pub percent: i32,
    pub status: String,
}

/// Why a job ended in `Error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobFailure {
    Submission(String),
    ConnectionLost,
    RemoteReported(String),
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobFailure::Submission(message) => write!(f, "{message}"),
            JobFailure::ConnectionLost => write!(f, "lost connection to server"),
            JobFailure::RemoteReported(message) => write!(f, "{message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TrackedJob {
    pub(crate) id: JobId,
    pub(crate) source_label: String,
    pub(crate) identifier: Option<String>,
    pub(crate) status: JobStatus,
    pub(crate) progress: u8,
    pub(crate) consecutive_poll_failures: u32,
    pub(crate) last_error: Option<JobFailure>,
    pub(crate) remote_status: Option<String>,
    pub(crate) polling: bool,
}

impl TrackedJob {
    /// Progress only moves forward and never past 100.
    pub(crate) fn raise_progress(&mut self, percent: u8) {
        self.progress = self.progress.max(percent.min(100));
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    config: ControllerConfig,
    last_job_id: JobId,
    job: Option<TrackedJob>,
    /// Jobs cancelled while their submission call was still in flight.
    abandoned_submissions: BTreeSet<JobId>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ControllerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn status(&self) -> JobStatus {
        self.job.as_ref().map_or(JobStatus::Idle, |job| job.status)
    }

    pub fn current_job_id(&self) -> Option<JobId> {
        self.job.as_ref().map(|job| job.id)
    }

    pub fn view(&self) -> StatusView {
        match &self.job {
            Some(job) => StatusView {
                status: job.status,
                job_id: Some(job.id),
                identifier: job.identifier.clone(),
                source_label: Some(job.source_label.clone()),
                progress_percent: job.progress,
                remote_status: job.remote_status.clone(),
                consecutive_poll_failures: job.consecutive_poll_failures,
                last_error: job.last_error.as_ref().map(ToString::to_string),
                dirty: self.dirty,
            },
            None => StatusView {
                dirty: self.dirty,
                ..StatusView::default()
            },
        }
    }

    /// Returns whether anything changed since the last call and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn job_mut(&mut self, job_id: JobId) -> Option<&mut TrackedJob> {
        self.job.as_mut().filter(|job| job.id == job_id)
    }

    pub(crate) fn current_mut(&mut self) -> Option<&mut TrackedJob> {
        self.job.as_mut()
    }

    /// Replaces whatever job was tracked with a fresh one in `Uploading`.
    pub(crate) fn begin_job(&mut self, source_label: String) -> JobId {
        self.last_job_id += 1;
        let id = self.last_job_id;
        let mut job = TrackedJob {
            id,
            source_label,
            identifier: None,
            status: JobStatus::Uploading,
            progress: 0,
            consecutive_poll_failures: 0,
            last_error: None,
            remote_status: None,
            polling: false,
        };
        job.raise_progress(self.config.submit_progress);
        self.job = Some(job);
        self.mark_dirty();
        id
    }

    pub(crate) fn clear_job(&mut self) {
        if self.job.take().is_some() {
            self.mark_dirty();
        }
    }

    pub(crate) fn abandon_submission(&mut self, job_id: JobId) {
        self.abandoned_submissions.insert(job_id);
    }

    /// Forgets an abandoned submission, returning whether it was one.
    pub(crate) fn take_abandoned(&mut self, job_id: JobId) -> bool {
        self.abandoned_submissions.remove(&job_id)
    }
}
