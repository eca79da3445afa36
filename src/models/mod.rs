//! Data models for configuration and run results

pub mod config;
pub mod record;

pub use config::Config;
pub use record::{AgentLifecycleResult, LatencyRecord, StepOutcome};
