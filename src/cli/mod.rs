//! Command-line interface

use clap::Parser;
use std::net::Ipv4Addr;
use std::path::PathBuf;

/// Subnet-scoped latency measurement orchestrator for qperf benchmark agents
#[derive(Parser, Debug, Clone)]
#[command(name = "sdplat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// SSH password for the remote agents
    #[arg(long, env = "SDPLAT_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Output CSV file
    #[arg(long)]
    pub output: PathBuf,

    /// Measure a single explicit target, bypassing discovery and subnet
    /// filtering
    #[arg(long, value_name = "IP")]
    pub target: Option<Ipv4Addr>,

    /// Discover targets from the established-connection table instead of
    /// the iSCSI session table
    #[arg(long)]
    pub connections: bool,

    /// Skip agent preparation (assume agents are already running)
    #[arg(long)]
    pub skip_setup: bool,

    /// Worker pool size for per-target phases
    #[arg(long, default_value_t = crate::defaults::default_concurrency())]
    pub concurrency: usize,

    /// Overall run timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = crate::defaults::DEFAULT_RUN_TIMEOUT.as_secs())]
    pub run_timeout: u64,

    /// Force colored output
    #[arg(long)]
    pub color: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug output (JSON log lines)
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Validate CLI arguments for conflicts and requirements
    pub fn validate(&self) -> Result<(), String> {
        if self.color && self.no_color {
            return Err("Cannot specify both --color and --no-color".to_string());
        }

        if self.target.is_some() && self.connections {
            return Err(
                "Cannot specify both --target and --connections; discovery sources are mutually exclusive"
                    .to_string(),
            );
        }

        Ok(())
    }

    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        if self.color {
            true
        } else if self.no_color {
            false
        } else {
            supports_color()
        }
    }
}

/// Check if the terminal supports color output
fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    // Check for NO_COLOR environment variable
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    // Check for FORCE_COLOR environment variable
    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    cfg!(unix)
}
