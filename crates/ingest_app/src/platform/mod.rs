//! Terminal front end: wires the core state machine to the engine.
mod app;
mod cli;
mod config;
mod effects;
mod logging;
mod render;

pub(crate) use app::run_app;
