use std::fmt;

use bytes::Bytes;
use serde::Deserialize;

pub type JobId = u64;

/// Shown when a submission fails without a message from the service.
pub const GENERIC_SUBMIT_FAILURE: &str = "Upload failed. Check server connection.";

/// Payload of a submission call.
#[derive(Clone, PartialEq, Eq)]
pub enum SubmitSource {
    LocalFile { name: String, bytes: Bytes },
    RemoteUrl(String),
}

impl fmt::Debug for SubmitSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitSource::LocalFile { name, bytes } => f
                .debug_struct("LocalFile")
                .field("name", name)
                .field("len", &bytes.len())
                .finish(),
            SubmitSource::RemoteUrl(url) => f.debug_tuple("RemoteUrl").field(url).finish(),
        }
    }
}

/// Body of `GET /progress/{identifier}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProgressReport {
    pub percent: i32,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Submitted {
        job_id: JobId,
        result: Result<String, ClientError>,
    },
    Polled {
        job_id: JobId,
        identifier: String,
        result: Result<ProgressReport, ClientError>,
    },
    CleanupFinished {
        job_id: JobId,
        identifier: String,
        result: Result<(), ClientError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientError {
    pub kind: FailureKind,
    pub message: String,
}

impl ClientError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// The service's own explanation when it gave one, otherwise a generic
    /// connectivity message.
    pub fn user_message(&self) -> String {
        match self.kind {
            FailureKind::Rejected { .. } => self.message.clone(),
            _ => GENERIC_SUBMIT_FAILURE.to_string(),
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ClientError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    /// Non-2xx response that carried a `detail` message.
    Rejected { status: u16 },
    Timeout,
    Network,
    Decode,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Rejected { status } => write!(f, "rejected with status {status}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Decode => write!(f, "unexpected response body"),
        }
    }
}
