use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use ingest_core::{Effect, JobSource, Msg, ProgressReport};
use ingest_engine::{EngineEvent, EngineHandle, SubmitSource};
use ingest_logging::{ingest_error, ingest_info, ingest_warn};

const EVENT_WAIT: Duration = Duration::from_millis(100);

/// Executes core effects on the engine and feeds engine events back as messages.
pub(crate) struct EffectRunner {
    engine: EngineHandle,
    events: JoinHandle<()>,
}

impl EffectRunner {
    pub(crate) fn new(engine: EngineHandle, msg_tx: mpsc::Sender<Msg>) -> Self {
        let events = spawn_event_loop(engine.clone(), msg_tx);
        Self { engine, events }
    }

    /// False once the engine can no longer deliver events.
    pub(crate) fn is_running(&self) -> bool {
        !self.events.is_finished()
    }

    pub(crate) fn run(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Submit { job_id, source } => {
                    self.engine.submit(job_id, map_source(source));
                }
                Effect::StartPolling {
                    job_id,
                    identifier,
                    interval,
                } => {
                    self.engine.start_polling(job_id, identifier, interval);
                }
                Effect::StopPolling { job_id } => self.engine.stop_polling(job_id),
                Effect::RequestCleanup { job_id, identifier } => {
                    self.engine.cleanup(job_id, identifier);
                }
                Effect::NotifyCompleted { job_id, identifier } => {
                    ingest_info!(
                        "Job {} ingested as {}; library refresh requested",
                        job_id,
                        identifier
                    );
                }
            }
        }
    }
}

fn spawn_event_loop(engine: EngineHandle, msg_tx: mpsc::Sender<Msg>) -> JoinHandle<()> {
    thread::spawn(move || loop {
        match engine.recv_timeout(EVENT_WAIT) {
            Ok(Some(event)) => {
                if msg_tx.send(map_event(event)).is_err() {
                    break;
                }
            }
            Ok(None) => {}
            Err(err) => {
                ingest_error!("{}", err);
                break;
            }
        }
    })
}

fn map_source(source: JobSource) -> SubmitSource {
    match source {
        JobSource::LocalFile { name, bytes } => SubmitSource::LocalFile {
            name,
            bytes: Bytes::from(bytes),
        },
        JobSource::RemoteUrl(url) => SubmitSource::RemoteUrl(url),
    }
}

fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::Submitted { job_id, result } => match result {
            Ok(identifier) => Msg::SubmitSucceeded { job_id, identifier },
            Err(err) => {
                ingest_warn!("Submission for job {} failed: {}", job_id, err);
                Msg::SubmitFailed {
                    job_id,
                    message: err.user_message(),
                }
            }
        },
        EngineEvent::Polled { job_id, result, .. } => match result {
            Ok(report) => Msg::PollSucceeded {
                job_id,
                report: ProgressReport {
                    percent: report.percent,
                    status: report.status,
                },
            },
            Err(_) => Msg::PollFailed { job_id },
        },
        EngineEvent::CleanupFinished {
            job_id,
            identifier,
            result,
        } => {
            // Cleanup is best effort; a failure never changes what the user sees.
            if let Err(err) = &result {
                ingest_warn!("Cleanup of {} for job {} failed: {}", identifier, job_id, err);
            }
            Msg::CleanupFinished {
                job_id,
                succeeded: result.is_ok(),
            }
        }
    }
}
