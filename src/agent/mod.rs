//! Remote agent lifecycle coordination
//!
//! Brings the qperf agent on each in-scope target to a known-running state:
//! stop a stale process, transfer the binary, start it detached. Steps run
//! in that order per target; every failure is a per-target warning, never a
//! run abort.

use crate::command::{CommandOutput, CommandRunner};
use crate::logging::Logger;
use crate::models::{AgentLifecycleResult, StepOutcome};
use std::net::Ipv4Addr;
use std::sync::Arc;

const SSH_OPTS: [&str; 2] = ["-o", "StrictHostKeyChecking=no"];

/// Exit code pkill returns when no process matched; an already-stopped
/// agent makes the stop step idempotent, not failed. This policy applies
/// to the stop step only.
const PKILL_NO_MATCH: i32 = 1;

/// Controls the benchmark agent lifecycle on remote targets
pub struct AgentController {
    runner: Arc<dyn CommandRunner>,
    logger: Logger,
    password: String,
}

impl AgentController {
    /// Create a controller authenticating with the given shared secret
    pub fn new(runner: Arc<dyn CommandRunner>, logger: Logger, password: String) -> Self {
        Self {
            runner,
            logger,
            password,
        }
    }

    /// Run the full stop → transfer → start sequence for one target.
    ///
    /// Never fails the run: each step's outcome is recorded independently
    /// and a failed step does not block the next one.
    pub async fn prepare(&self, target: Ipv4Addr) -> AgentLifecycleResult {
        let stopped = self.stop(target).await;
        let transferred = self.transfer(target).await;
        let started = self.start(target).await;

        AgentLifecycleResult {
            target,
            stopped,
            transferred,
            started,
        }
    }

    /// Terminate a stale agent process on the target
    async fn stop(&self, target: Ipv4Addr) -> StepOutcome {
        self.logger
            .info_target("agent", target, "killing existing qperf processes");

        let output = self
            .ssh(target, &format!("pkill {}", crate::defaults::AGENT_BINARY))
            .await;

        match output {
            Ok(out) if out.success() => StepOutcome::Success,
            Ok(out) if out.status == Some(PKILL_NO_MATCH) => {
                self.logger
                    .info_target("agent", target, "qperf not running yet");
                StepOutcome::Success
            }
            Ok(out) => self.step_failed(target, "stop", describe_exit(&out)),
            Err(e) => self.step_failed(target, "stop", e.to_string()),
        }
    }

    /// Copy the agent binary to the target's filesystem
    async fn transfer(&self, target: Ipv4Addr) -> StepOutcome {
        self.logger
            .info_target("agent", target, "transferring qperf binary");

        let mut args = self.sshpass_prefix();
        args.push("scp".to_string());
        args.extend(SSH_OPTS.iter().map(|s| s.to_string()));
        args.push(crate::defaults::AGENT_BINARY.to_string());
        args.push(format!("{}@{}:", crate::defaults::REMOTE_USER, target));

        match self.remote(&args).await {
            Ok(out) if out.success() => StepOutcome::Success,
            Ok(out) => self.step_failed(target, "transfer", describe_exit(&out)),
            Err(e) => self.step_failed(target, "transfer", e.to_string()),
        }
    }

    /// Launch the agent detached, bound to the fixed agent port
    async fn start(&self, target: Ipv4Addr) -> StepOutcome {
        self.logger.info_target("agent", target, "starting qperf");

        let command = format!(
            "nohup {} -lp {} </dev/null >/dev/null 2>&1 & pgrep {}",
            crate::defaults::AGENT_REMOTE_PATH,
            crate::defaults::AGENT_PORT,
            crate::defaults::AGENT_BINARY,
        );

        match self.ssh(target, &command).await {
            Ok(out) if out.success() => {
                let pids: Vec<&str> = out.stdout.split_whitespace().collect();
                if pids.len() > 1 {
                    // pgrep found more than the fresh launch; informational
                    self.logger.info_target(
                        "agent",
                        target,
                        format!("qperf already running (pids {})", pids.join(", ")),
                    );
                }
                StepOutcome::Success
            }
            Ok(out) => self.step_failed(target, "start", describe_exit(&out)),
            Err(e) => self.step_failed(target, "start", e.to_string()),
        }
    }

    /// Run a remote shell command over ssh on the target
    async fn ssh(
        &self,
        target: Ipv4Addr,
        command: &str,
    ) -> crate::error::Result<CommandOutput> {
        let mut args = self.sshpass_prefix();
        args.push("ssh".to_string());
        args.extend(SSH_OPTS.iter().map(|s| s.to_string()));
        args.push(format!("{}@{}", crate::defaults::REMOTE_USER, target));
        args.push(command.to_string());

        self.remote(&args).await
    }

    /// Invoke sshpass; a spawn or timeout failure surfaces as a remote
    /// execution error
    async fn remote(&self, args: &[String]) -> crate::error::Result<CommandOutput> {
        self.runner
            .run("sshpass", args)
            .await
            .map_err(|e| crate::error::AppError::remote(e.to_string()))
    }

    /// Common sshpass authentication prefix; the secret only ever appears
    /// in the argument vector, never in log output
    fn sshpass_prefix(&self) -> Vec<String> {
        vec!["-p".to_string(), self.password.clone()]
    }

    fn step_failed(&self, target: Ipv4Addr, operation: &str, reason: String) -> StepOutcome {
        self.logger
            .warn_target("agent", target, format!("{} failed: {}", operation, reason));
        StepOutcome::Failed(reason)
    }
}

fn describe_exit(output: &CommandOutput) -> String {
    let stderr = output.stderr.trim();
    if stderr.is_empty() {
        format!("exited with {:?}", output.status)
    } else {
        format!("exited with {:?}: {}", output.status, stderr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, Result};
    use crate::logging::{LogLevel, Logger};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Runner that answers each invocation from a scripted queue and keeps
    /// the argument vectors it saw
    struct RecordingRunner {
        responses: Mutex<Vec<Result<CommandOutput>>>,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl RecordingRunner {
        fn new(responses: Vec<Result<CommandOutput>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandRunner for RecordingRunner {
        async fn run(&self, _program: &str, args: &[String]) -> Result<CommandOutput> {
            self.calls.lock().unwrap().push(args.to_vec());
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(AppError::internal("no scripted response left"));
            }
            responses.remove(0)
        }
    }

    fn quiet_logger() -> Logger {
        Logger::new(LogLevel::Error, false, false)
    }

    fn controller(runner: Arc<RecordingRunner>) -> AgentController {
        AgentController::new(runner, quiet_logger(), "hunter2".to_string())
    }

    fn target() -> Ipv4Addr {
        Ipv4Addr::new(10, 0, 0, 9)
    }

    #[tokio::test]
    async fn test_pkill_no_match_is_success_and_later_steps_run() {
        let runner = Arc::new(RecordingRunner::new(vec![
            Ok(CommandOutput::new(Some(1), "", "")), // pkill: no process
            Ok(CommandOutput::new(Some(0), "", "")), // scp
            Ok(CommandOutput::new(Some(0), "4242", "")), // start + pgrep
        ]));
        let result = controller(Arc::clone(&runner)).prepare(target()).await;

        assert!(result.stopped.is_success());
        assert!(result.transferred.is_success());
        assert!(result.started.is_success());
        assert!(result.all_succeeded());
        assert_eq!(runner.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_stop_other_exit_codes_are_failures() {
        let runner = Arc::new(RecordingRunner::new(vec![
            Ok(CommandOutput::new(Some(255), "", "connection refused")),
            Ok(CommandOutput::new(Some(0), "", "")),
            Ok(CommandOutput::new(Some(0), "4242", "")),
        ]));
        let result = controller(runner).prepare(target()).await;

        assert!(!result.stopped.is_success());
        // transfer and start still attempted and succeeded
        assert!(result.transferred.is_success());
        assert!(result.started.is_success());
    }

    #[tokio::test]
    async fn test_transfer_failure_does_not_block_start() {
        let runner = Arc::new(RecordingRunner::new(vec![
            Ok(CommandOutput::new(Some(0), "", "")),
            Ok(CommandOutput::new(Some(1), "", "lost connection")),
            Ok(CommandOutput::new(Some(0), "4242", "")),
        ]));
        let result = controller(Arc::clone(&runner)).prepare(target()).await;

        assert_eq!(
            result.transferred.failure(),
            Some("exited with Some(1): lost connection")
        );
        assert!(result.started.is_success());
        assert_eq!(runner.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_remote_invocations_address_root_and_carry_secret() {
        let runner = Arc::new(RecordingRunner::new(vec![
            Ok(CommandOutput::new(Some(0), "", "")),
            Ok(CommandOutput::new(Some(0), "", "")),
            Ok(CommandOutput::new(Some(0), "4242", "")),
        ]));
        controller(Arc::clone(&runner)).prepare(target()).await;

        let calls = runner.calls();
        // stop: sshpass -p <pw> ssh -o StrictHostKeyChecking=no root@ip pkill qperf
        assert_eq!(calls[0][0], "-p");
        assert_eq!(calls[0][1], "hunter2");
        assert_eq!(calls[0][2], "ssh");
        assert!(calls[0].contains(&"root@10.0.0.9".to_string()));
        assert!(calls[0].last().unwrap().contains("pkill qperf"));

        // transfer: scp qperf root@ip:
        assert_eq!(calls[1][2], "scp");
        assert!(calls[1].contains(&"root@10.0.0.9:".to_string()));

        // start: detached launch on the agent port, then pgrep
        let start_cmd = calls[2].last().unwrap();
        assert!(start_cmd.contains("nohup /root/qperf -lp 32111"));
        assert!(start_cmd.contains("pgrep qperf"));
    }

    #[tokio::test]
    async fn test_spawn_error_is_contained_per_step() {
        let runner = Arc::new(RecordingRunner::new(vec![
            Err(AppError::io("failed to spawn sshpass")),
            Ok(CommandOutput::new(Some(0), "", "")),
            Ok(CommandOutput::new(Some(0), "4242", "")),
        ]));
        let result = controller(runner).prepare(target()).await;

        assert!(!result.stopped.is_success());
        // The failure is classified as a remote execution problem
        let reason = result.stopped.failure().unwrap();
        assert!(reason.contains("Remote execution error"));
        assert!(result.transferred.is_success());
        assert!(result.started.is_success());
    }
}
