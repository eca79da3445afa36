//! Subprocess boundary for all external collaborators
//!
//! Every external tool this orchestrator talks to (ifconfig, iscsiadm, ss,
//! sshpass/ssh/scp, qperf) is invoked through the [`CommandRunner`] trait so
//! the phases can be exercised in tests with scripted runners. The system
//! implementation runs commands via tokio with a per-command timeout.

use crate::error::{AppError, Result};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

/// Captured outcome of a finished subprocess
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Process exit code, if the process exited normally
    pub status: Option<i32>,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl CommandOutput {
    /// Whether the process exited with code zero
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Convenience constructor for tests and scripted runners
    pub fn new(status: Option<i32>, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            status,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }
}

/// Async command execution seam
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a program with arguments, capturing output.
    ///
    /// Returns `Err` only when the process could not be spawned or timed
    /// out; a non-zero exit is a normal `Ok` outcome carried in
    /// [`CommandOutput::status`].
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput>;
}

/// Command runner backed by real subprocesses
pub struct SystemCommandRunner {
    /// Upper bound for a single command invocation
    command_timeout: Duration,
}

impl SystemCommandRunner {
    /// Create a runner with the given per-command timeout
    pub fn new(command_timeout: Duration) -> Self {
        Self { command_timeout }
    }
}

impl Default for SystemCommandRunner {
    fn default() -> Self {
        Self::new(crate::defaults::DEFAULT_COMMAND_TIMEOUT)
    }
}

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = timeout(self.command_timeout, command.output())
            .await
            .map_err(|_| {
                AppError::timeout(format!(
                    "{} did not finish within {}s",
                    program,
                    self.command_timeout.as_secs()
                ))
            })?
            .map_err(|e| AppError::io(format!("failed to spawn {}: {}", program, e)))?;

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_output_success() {
        assert!(CommandOutput::new(Some(0), "", "").success());
        assert!(!CommandOutput::new(Some(1), "", "").success());
        assert!(!CommandOutput::new(None, "", "").success());
    }

    #[tokio::test]
    async fn test_system_runner_captures_stdout() {
        let runner = SystemCommandRunner::default();
        let output = runner
            .run("echo", &["hello".to_string()])
            .await
            .expect("echo should spawn");

        assert!(output.success());
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_system_runner_times_out_stalled_command() {
        let runner = SystemCommandRunner::new(Duration::from_millis(100));
        let result = runner.run("sleep", &["5".to_string()]).await;

        match result {
            Err(AppError::Timeout(message)) => assert!(message.contains("sleep")),
            other => panic!("expected Timeout error, got {:?}", other.map(|o| o.status)),
        }
    }

    #[tokio::test]
    async fn test_system_runner_missing_program_is_io_error() {
        let runner = SystemCommandRunner::default();
        let result = runner.run("definitely-not-a-real-binary-xyz", &[]).await;

        match result {
            Err(AppError::Io(_)) => {}
            other => panic!("expected Io error, got {:?}", other.map(|o| o.status)),
        }
    }
}
