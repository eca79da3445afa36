//! Local benchmark client invocation and output parsing
//!
//! Runs the local qperf client against one target at a time and extracts
//! the `latency = <value> us` figure from its textual output.

use crate::command::CommandRunner;
use crate::error::{AppError, Result};
use crate::logging::Logger;
use regex::Regex;
use std::net::Ipv4Addr;
use std::sync::{Arc, LazyLock};

static LATENCY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"latency\s*=\s*([0-9.]+)\s*us").expect("static regex"));

/// Extract the latency value in microseconds from qperf output.
///
/// Returns a structured parse error naming the missing field when no
/// matching line exists.
pub fn parse_latency(stdout: &str) -> Result<f64> {
    let captures = LATENCY_RE.captures(stdout).ok_or_else(|| {
        let raw_line = stdout
            .lines()
            .find(|l| !l.trim().is_empty())
            .unwrap_or("<empty output>")
            .trim()
            .to_string();
        AppError::parse("latency", raw_line)
    })?;

    Ok(captures[1].parse::<f64>()?)
}

/// Measures round-trip latency to a single target with the local client
pub struct LatencyProbe {
    runner: Arc<dyn CommandRunner>,
    logger: Logger,
}

impl LatencyProbe {
    /// Create a probe over the given command runner
    pub fn new(runner: Arc<dyn CommandRunner>, logger: Logger) -> Self {
        Self { runner, logger }
    }

    /// Run one bounded tcp_lat measurement against the target.
    ///
    /// A failed invocation or unparsable output is an error for this target
    /// only; the caller omits the target and continues.
    pub async fn measure(&self, target: Ipv4Addr) -> Result<f64> {
        self.logger
            .info_target("bench", target, "running latency measurement");

        let args = vec![
            "-lp".to_string(),
            crate::defaults::AGENT_PORT.to_string(),
            "-ip".to_string(),
            crate::defaults::CLIENT_PORT.to_string(),
            "-t".to_string(),
            crate::defaults::TEST_DURATION_SECS.to_string(),
            "-m".to_string(),
            crate::defaults::MESSAGE_SIZE.to_string(),
            "--use_bits_per_sec".to_string(),
            target.to_string(),
            "tcp_lat".to_string(),
        ];

        let output = self
            .runner
            .run(crate::defaults::CLIENT_BINARY, &args)
            .await?;

        if !output.success() {
            return Err(AppError::measurement(format!(
                "qperf exited with {:?}: {}",
                output.status,
                output.stderr.trim()
            )));
        }

        let latency = parse_latency(&output.stdout)?;
        self.logger
            .info_target("bench", target, format!("latency {} us", latency));

        Ok(latency)
    }
}
