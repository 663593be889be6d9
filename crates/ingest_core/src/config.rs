use std::time::Duration;

/// Tunables for the lifecycle controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Cadence of status queries while a job is in flight.
    pub poll_interval: Duration,
    /// Consecutive failed polls after which the job is declared lost.
    pub max_consecutive_poll_failures: u32,
    /// Lowest progress shown once the service starts reporting.
    pub progress_floor: u8,
    /// Progress shown as soon as submission starts.
    pub submit_progress: u8,
    /// Status text the service uses for a worker-side cancellation.
    pub cancel_sentinel: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            max_consecutive_poll_failures: 5,
            progress_floor: 30,
            submit_progress: 10,
            cancel_sentinel: "Cancelled by User".to_string(),
        }
    }
}
