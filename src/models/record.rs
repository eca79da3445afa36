//! Per-target run results

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// Outcome of a single agent lifecycle step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepOutcome {
    /// Step completed (including the idempotent "nothing to stop" case)
    Success,
    /// Step failed; the run continues without it
    Failed(String),
}

impl StepOutcome {
    /// Whether the step is considered successful
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Failure message, if any
    pub fn failure(&self) -> Option<&str> {
        match self {
            Self::Success => None,
            Self::Failed(message) => Some(message),
        }
    }
}

/// Per-target outcome of the stop/transfer/start preparation sequence.
///
/// Steps are independent: a failed step never blocks the next step for the
/// same target, nor any other target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentLifecycleResult {
    /// Target the agent was prepared on
    pub target: Ipv4Addr,
    /// Outcome of terminating a stale agent process
    pub stopped: StepOutcome,
    /// Outcome of copying the agent binary over
    pub transferred: StepOutcome,
    /// Outcome of launching the agent detached
    pub started: StepOutcome,
}

impl AgentLifecycleResult {
    /// Whether every step completed
    pub fn all_succeeded(&self) -> bool {
        self.stopped.is_success() && self.transferred.is_success() && self.started.is_success()
    }
}

/// One measured latency row, immutable once created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencyRecord {
    /// Run-wide timestamp (captured once per run, not per target)
    pub timestamp: DateTime<Local>,
    /// Resolved local interface IP
    pub src_ip: Ipv4Addr,
    /// Measured target IP
    pub dest_ip: Ipv4Addr,
    /// Round-trip latency in microseconds
    pub latency_us: f64,
}

impl LatencyRecord {
    /// Create a record for a successfully measured target
    pub fn new(
        timestamp: DateTime<Local>,
        src_ip: Ipv4Addr,
        dest_ip: Ipv4Addr,
        latency_us: f64,
    ) -> Self {
        Self {
            timestamp,
            src_ip,
            dest_ip,
            latency_us,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_outcome_helpers() {
        assert!(StepOutcome::Success.is_success());
        assert!(StepOutcome::Success.failure().is_none());

        let failed = StepOutcome::Failed("scp exited with 1".to_string());
        assert!(!failed.is_success());
        assert_eq!(failed.failure(), Some("scp exited with 1"));
    }

    #[test]
    fn test_lifecycle_result_aggregation() {
        let ok = AgentLifecycleResult {
            target: Ipv4Addr::new(10, 0, 0, 9),
            stopped: StepOutcome::Success,
            transferred: StepOutcome::Success,
            started: StepOutcome::Success,
        };
        assert!(ok.all_succeeded());

        let partial = AgentLifecycleResult {
            transferred: StepOutcome::Failed("connection refused".to_string()),
            ..ok
        };
        assert!(!partial.all_succeeded());
    }
}
