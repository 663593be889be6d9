use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use ingest_core::ControllerConfig;
use ingest_engine::ClientSettings;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::cli::Cli;
use super::logging::LogDestination;

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Settings read from `ingest.ron`; every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct AppConfig {
    pub(crate) api_url: String,
    pub(crate) poll_interval_ms: u64,
    pub(crate) max_poll_failures: u32,
    pub(crate) request_timeout_ms: u64,
    pub(crate) upload_timeout_secs: u64,
    pub(crate) log_destination: LogDestination,
    pub(crate) log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let client = ClientSettings::default();
        let controller = ControllerConfig::default();
        Self {
            api_url: client.base_url,
            poll_interval_ms: controller.poll_interval.as_millis() as u64,
            max_poll_failures: controller.max_consecutive_poll_failures,
            request_timeout_ms: client.request_timeout.as_millis() as u64,
            upload_timeout_secs: client.upload_timeout.as_secs(),
            log_destination: LogDestination::default(),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Loads the file at `path`, or defaults when it does not exist.
    pub(crate) fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                })
            }
        };

        ron::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Command-line flags (and `INGEST_API_URL`) win over the file.
    pub(crate) fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(api_url) = &cli.api_url {
            self.api_url = api_url.clone();
        }
        if let Some(interval) = cli.poll_interval_ms {
            self.poll_interval_ms = interval;
        }
        if let Some(max) = cli.max_poll_failures {
            self.max_poll_failures = max;
        }
        if cli.verbose {
            self.log_level = "debug".to_string();
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.api_url.trim().is_empty() {
            return Err(ConfigError::Invalid("api_url must not be empty".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("poll_interval_ms must be positive".into()));
        }
        if self.max_poll_failures == 0 {
            return Err(ConfigError::Invalid("max_poll_failures must be positive".into()));
        }
        Ok(())
    }

    pub(crate) fn level(&self) -> LevelFilter {
        ingest_logging::parse_level(&self.log_level)
    }

    pub(crate) fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            max_consecutive_poll_failures: self.max_poll_failures,
            ..ControllerConfig::default()
        }
    }

    pub(crate) fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            base_url: self.api_url.trim().to_string(),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            upload_timeout: Duration::from_secs(self.upload_timeout_secs),
            ..ClientSettings::default()
        }
    }
}
