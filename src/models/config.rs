//! Run configuration model and validation

use crate::discovery::TargetSource;
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

/// Main run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Shared secret for remote execution; never logged or persisted
    #[serde(skip_serializing, default)]
    pub password: String,

    /// Output CSV path
    pub output_path: PathBuf,

    /// Explicit override target, bypassing discovery and subnet filtering
    pub override_target: Option<Ipv4Addr>,

    /// Use the OS connection table instead of the iSCSI session table
    #[serde(default)]
    pub use_connection_table: bool,

    /// Skip the stop/transfer/start agent preparation phase
    #[serde(default)]
    pub skip_setup: bool,

    /// Worker pool size for per-target phases
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Overall run timeout in seconds
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_seconds: u64,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output (JSON log lines)
    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            password: String::new(),
            output_path: PathBuf::from("latency.csv"),
            override_target: None,
            use_connection_table: false,
            skip_setup: false,
            concurrency: default_concurrency(),
            run_timeout_seconds: default_run_timeout_secs(),
            enable_color: default_enable_color(),
            verbose: false,
            debug: false,
        }
    }
}

impl Config {
    /// Get overall run timeout as Duration
    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_seconds)
    }

    /// Discovery source selected for this run
    pub fn target_source(&self) -> TargetSource {
        match self.override_target {
            Some(ip) => TargetSource::Override(ip),
            None if self.use_connection_table => TargetSource::ConnectionTable,
            None => TargetSource::SessionTable,
        }
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Result<()> {
        if self.password.is_empty() {
            return Err(AppError::config("Password cannot be empty"));
        }

        if self.output_path.as_os_str().is_empty() {
            return Err(AppError::config("Output path cannot be empty"));
        }

        if self.override_target.is_some() && self.use_connection_table {
            return Err(AppError::config(
                "Override target and connection-table discovery are mutually exclusive",
            ));
        }

        if self.concurrency == 0 {
            return Err(AppError::config("Concurrency must be greater than 0"));
        }

        if self.concurrency > 64 {
            return Err(AppError::config("Concurrency cannot exceed 64"));
        }

        if self.run_timeout_seconds == 0 {
            return Err(AppError::config("Run timeout must be greater than 0"));
        }

        Ok(())
    }
}

// Default value functions for serde
fn default_concurrency() -> usize {
    crate::defaults::default_concurrency()
}

fn default_run_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_RUN_TIMEOUT.as_secs()
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}
