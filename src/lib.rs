//! sdplat
//!
//! Subnet-scoped latency measurement orchestrator. Discovers peers sharing
//! the local network segment, prepares a qperf benchmark agent on each over
//! ssh/scp, measures round-trip latency with the local qperf client, and
//! records timestamped results to a CSV sink.

pub mod agent;
pub mod app;
pub mod bench;
pub mod cli;
pub mod command;
pub mod config;
pub mod discovery;
pub mod error;
pub mod executor;
pub mod logging;
pub mod models;
pub mod net;
pub mod output;

// Re-export commonly used types
pub use error::{AppError, Result};
pub use models::{AgentLifecycleResult, Config, LatencyRecord, StepOutcome};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");

/// Build identity captured by the build script
pub const BUILD_TIME: &str = env!("BUILD_TIME");
pub const GIT_COMMIT: Option<&str> = option_env!("GIT_COMMIT");

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    /// Local measurement interface; fixed, not exposed on the CLI
    pub const DEFAULT_INTERFACE: &str = "ib0";

    /// Agent binary name, local file to transfer and remote process to manage
    pub const AGENT_BINARY: &str = "qperf";

    /// Local benchmark client binary
    pub const CLIENT_BINARY: &str = "qperf";

    /// Agent path on the remote host after transfer
    pub const AGENT_REMOTE_PATH: &str = "/root/qperf";

    /// Remote user for ssh/scp
    pub const REMOTE_USER: &str = "root";

    /// Listening port the remote agent binds
    pub const AGENT_PORT: u16 = 32111;

    /// Local client port for measurements
    pub const CLIENT_PORT: u16 = 32112;

    /// Remote port identifying session connections in the connection table
    pub const SESSION_REMOTE_PORT: u16 = 55655;

    /// Bounded duration of one tcp_lat measurement, seconds
    pub const TEST_DURATION_SECS: u32 = 2;

    /// Message size for the tcp_lat measurement, bytes
    pub const MESSAGE_SIZE: u32 = 4096;

    pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(300);
    pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);
    pub const DEFAULT_ENABLE_COLOR: bool = true;

    /// Default worker pool size, bounded so remote hosts are not flooded
    pub fn default_concurrency() -> usize {
        num_cpus::get().clamp(1, 8)
    }
}
