use std::io::{self, BufRead};
use std::process::ExitCode;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use ingest_core::{update, AppState, ControllerConfig, Effect, JobStatus, Msg, StatusView};
use ingest_engine::EngineHandle;
use ingest_logging::{ingest_debug, ingest_info};

use super::cli::Cli;
use super::config::AppConfig;
use super::effects::EffectRunner;
use super::{logging, render};

const LIVENESS_CHECK: Duration = Duration::from_millis(500);

pub(crate) fn run_app() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let mut config = AppConfig::load(&cli.config)?;
    config.apply_overrides(&cli);
    config.validate()?;
    logging::initialize(config.log_destination, config.level());

    let source = cli.job_source()?;
    ingest_info!("Using ingestion service at {}", config.api_url);
    let engine =
        EngineHandle::new(config.client_settings()).context("failed to start the engine")?;

    let (msg_tx, msg_rx) = mpsc::channel::<Msg>();
    let runner = EffectRunner::new(engine, msg_tx.clone());
    spawn_stdin_reader(msg_tx);
    println!("Type `c` and Enter to cancel.");

    let mut session = Session::new(config.controller_config());
    let mut next = Some(Msg::SubmitRequested(source));
    loop {
        let msg = match next.take() {
            Some(msg) => msg,
            None => match msg_rx.recv_timeout(LIVENESS_CHECK) {
                Ok(msg) => msg,
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    if !runner.is_running() {
                        bail!("engine stopped before the job finished");
                    }
                    continue;
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => bail!("message channel closed"),
            },
        };

        let (effects, view) = session.dispatch(msg);
        if let Some(view) = view {
            println!("{}", render::status_line(&view));
        }
        runner.run(effects);

        if let Some(outcome) = session.outcome() {
            ingest_info!("Finished: {:?}", outcome);
            return Ok(outcome.exit_code());
        }
    }
}

fn spawn_stdin_reader(msg_tx: mpsc::Sender<Msg>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            match parse_command(&line) {
                Some(msg) => {
                    if msg_tx.send(msg).is_err() {
                        break;
                    }
                }
                None => ingest_debug!("Ignoring input {:?}", line),
            }
        }
    });
}

fn parse_command(line: &str) -> Option<Msg> {
    match line.trim().to_ascii_lowercase().as_str() {
        "c" | "cancel" => Some(Msg::CancelRequested),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Ingested,
    Failed,
    Cancelled,
}

impl Outcome {
    fn exit_code(self) -> ExitCode {
        match self {
            Outcome::Ingested => ExitCode::SUCCESS,
            Outcome::Failed => ExitCode::FAILURE,
            Outcome::Cancelled => ExitCode::from(130),
        }
    }
}

/// Owns the core state for one run of the binary.
struct Session {
    state: AppState,
    cancelled: bool,
}

impl Session {
    fn new(config: ControllerConfig) -> Self {
        Self {
            state: AppState::with_config(config),
            cancelled: false,
        }
    }

    /// Applies `msg`, returning effects and a fresh view if anything changed.
    fn dispatch(&mut self, msg: Msg) -> (Vec<Effect>, Option<StatusView>) {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        if state.status() == JobStatus::Cancelled {
            self.cancelled = true;
        }
        let view = state.view();
        let was_dirty = state.consume_dirty();
        self.state = state;
        (effects, was_dirty.then_some(view))
    }

    /// A cancelled job counts as finished once its cleanup has settled.
    fn outcome(&self) -> Option<Outcome> {
        match self.state.status() {
            JobStatus::Success => Some(Outcome::Ingested),
            JobStatus::Error => Some(Outcome::Failed),
            JobStatus::Idle if self.cancelled => Some(Outcome::Cancelled),
            _ => None,
        }
    }
}
