//! Ingest engine: ingestion service client and effect execution.
mod client;
mod engine;
mod types;

pub use client::{ClientSettings, IngestClient, ReqwestIngestClient};
pub use engine::{EngineError, EngineHandle};
pub use types::{
    ClientError, EngineEvent, FailureKind, JobId, ProgressReport, SubmitSource,
    GENERIC_SUBMIT_FAILURE,
};
