//! Ingest core: pure lifecycle state machine for one ingestion job.
mod config;
mod effect;
mod msg;
mod state;
mod update;
mod view_model;

pub use config::ControllerConfig;
pub use effect::Effect;
pub use msg::Msg;
pub use state::{AppState, JobFailure, JobId, JobSource, JobStatus, ProgressReport};
pub use update::update;
pub use view_model::StatusView;
