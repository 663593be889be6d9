use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use ingest_core::JobSource;

/// Submit a media ingestion job and follow it to completion.
#[derive(Parser, Debug)]
#[command(name = "ingest", version, about, long_about = None)]
pub(crate) struct Cli {
    /// Path to the RON configuration file
    #[arg(short, long, default_value = "ingest.ron")]
    pub(crate) config: PathBuf,

    /// Base URL of the ingestion service
    #[arg(long, env = "INGEST_API_URL")]
    pub(crate) api_url: Option<String>,

    /// Milliseconds between status queries
    #[arg(long)]
    pub(crate) poll_interval_ms: Option<u64>,

    /// Consecutive failed status queries before giving up
    #[arg(long)]
    pub(crate) max_poll_failures: Option<u32>,

    /// Enable debug logging
    #[arg(short, long)]
    pub(crate) verbose: bool,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Upload a local video file
    File { path: PathBuf },
    /// Have the service fetch a remote video
    Url { url: String },
}

impl Cli {
    pub(crate) fn job_source(&self) -> anyhow::Result<JobSource> {
        match &self.command {
            Command::File { path } => read_local_file(path),
            Command::Url { url } => {
                let url = url.trim();
                if url.is_empty() {
                    bail!("url must not be empty");
                }
                Ok(JobSource::RemoteUrl(url.to_string()))
            }
        }
    }
}

fn read_local_file(path: &Path) -> anyhow::Result<JobSource> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", path.display()))?;
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(JobSource::LocalFile { name, bytes })
}
