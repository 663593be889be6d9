use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use ingest_logging::{ingest_debug, ingest_info, ingest_warn};
use thiserror::Error;
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::client::{ClientSettings, IngestClient, ReqwestIngestClient};
use crate::{ClientError, EngineEvent, FailureKind, JobId, SubmitSource};

/// `tokio::time::interval` panics on a zero period.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid client settings: {0}")]
    Client(#[from] ClientError),
    #[error("failed to start async runtime: {0}")]
    Runtime(std::io::Error),
    #[error("failed to spawn engine thread: {0}")]
    Thread(std::io::Error),
    #[error("engine stopped delivering events")]
    Disconnected,
}

enum EngineCommand {
    Submit {
        job_id: JobId,
        source: SubmitSource,
    },
    StartPolling {
        job_id: JobId,
        identifier: String,
        interval: Duration,
    },
    StopPolling {
        job_id: JobId,
    },
    Cleanup {
        job_id: JobId,
        identifier: String,
    },
}

/// Runs service calls on a background runtime and reports back through events.
///
/// The engine thread owns the only poll timer. Starting a new one disarms the
/// previous one before anything else happens.
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: Arc<Mutex<mpsc::Receiver<EngineEvent>>>,
}

impl EngineHandle {
    pub fn new(settings: ClientSettings) -> Result<Self, EngineError> {
        let client = ReqwestIngestClient::new(settings)?;
        Self::with_client(Arc::new(client))
    }

    pub fn with_client(client: Arc<dyn IngestClient>) -> Result<Self, EngineError> {
        let runtime = Runtime::new().map_err(EngineError::Runtime)?;
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        thread::Builder::new()
            .name("ingest-engine".to_string())
            .spawn(move || run_engine(runtime, client, cmd_rx, event_tx))
            .map_err(EngineError::Thread)?;

        Ok(Self {
            cmd_tx,
            event_rx: Arc::new(Mutex::new(event_rx)),
        })
    }

    pub fn submit(&self, job_id: JobId, source: SubmitSource) {
        let _ = self.cmd_tx.send(EngineCommand::Submit { job_id, source });
    }

    pub fn start_polling(&self, job_id: JobId, identifier: impl Into<String>, interval: Duration) {
        let _ = self.cmd_tx.send(EngineCommand::StartPolling {
            job_id,
            identifier: identifier.into(),
            interval,
        });
    }

    /// Disarms the poll timer if it still belongs to `job_id`.
    pub fn stop_polling(&self, job_id: JobId) {
        let _ = self.cmd_tx.send(EngineCommand::StopPolling { job_id });
    }

    pub fn cleanup(&self, job_id: JobId, identifier: impl Into<String>) {
        let _ = self.cmd_tx.send(EngineCommand::Cleanup {
            job_id,
            identifier: identifier.into(),
        });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.lock().ok()?.try_recv().ok()
    }

    /// Waits up to `timeout` for the next event. `Ok(None)` means nothing
    /// arrived; an error means no event will ever arrive again.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<EngineEvent>, EngineError> {
        let event_rx = self.event_rx.lock().map_err(|_| EngineError::Disconnected)?;
        match event_rx.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(EngineError::Disconnected),
        }
    }
}

struct ActivePoller {
    job_id: JobId,
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl ActivePoller {
    fn stop(self) {
        self.token.cancel();
        self.task.abort();
        ingest_debug!("Poller stopped job_id={}", self.job_id);
    }
}

fn run_engine(
    runtime: Runtime,
    client: Arc<dyn IngestClient>,
    cmd_rx: mpsc::Receiver<EngineCommand>,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let mut poller: Option<ActivePoller> = None;

    while let Ok(command) = cmd_rx.recv() {
        match command {
            EngineCommand::Submit { job_id, source } => {
                let client = client.clone();
                let event_tx = event_tx.clone();
                runtime.spawn(async move {
                    ingest_info!("Submitting job_id={} source={:?}", job_id, source);
                    let result = client.submit(&source).await;
                    let _ = event_tx.send(EngineEvent::Submitted { job_id, result });
                });
            }
            EngineCommand::StartPolling {
                job_id,
                identifier,
                interval,
            } => {
                if let Some(previous) = poller.take() {
                    previous.stop();
                }
                ingest_info!(
                    "Polling job_id={} identifier={} every {:?}",
                    job_id,
                    identifier,
                    interval
                );
                let token = CancellationToken::new();
                let task = runtime.spawn(poll_loop(
                    client.clone(),
                    job_id,
                    identifier,
                    interval,
                    token.clone(),
                    event_tx.clone(),
                ));
                poller = Some(ActivePoller {
                    job_id,
                    token,
                    task,
                });
            }
            EngineCommand::StopPolling { job_id } => {
                if let Some(active) = poller.take_if(|active| active.job_id == job_id) {
                    active.stop();
                }
            }
            EngineCommand::Cleanup { job_id, identifier } => {
                let client = client.clone();
                let event_tx = event_tx.clone();
                runtime.spawn(async move {
                    ingest_info!("Requesting cleanup job_id={} identifier={}", job_id, identifier);
                    let result = client.cancel(&identifier).await;
                    let _ = event_tx.send(EngineEvent::CleanupFinished {
                        job_id,
                        identifier,
                        result,
                    });
                });
            }
        }
    }

    if let Some(active) = poller.take() {
        active.stop();
    }
}

async fn poll_loop(
    client: Arc<dyn IngestClient>,
    job_id: JobId,
    identifier: String,
    interval: Duration,
    token: CancellationToken,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let interval = interval.max(MIN_POLL_INTERVAL);
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; queries start one period later.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        // A stalled query counts as a failed tick, one per period.
        let query = client.poll_status(&identifier);
        let result = match tokio::time::timeout(interval, query).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::new(
                FailureKind::Timeout,
                format!("no status within {interval:?}"),
            )),
        };
        // A response that lands after the stop request is dropped here.
        if token.is_cancelled() {
            break;
        }
        match &result {
            Ok(report) => ingest_debug!(
                "Poll job_id={} percent={} status={:?}",
                job_id,
                report.percent,
                report.status
            ),
            Err(err) => ingest_warn!("Poll job_id={} failed: {}", job_id, err),
        }

        let event = EngineEvent::Polled {
            job_id,
            identifier: identifier.clone(),
            result,
        };
        if event_tx.send(event).is_err() {
            break;
        }
    }
}
