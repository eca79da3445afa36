//! Main application orchestration
//!
//! Sequences the run as a phase state machine:
//! `ResolvingNetwork → DiscoveringTargets → [PreparingAgents] →
//! MeasuringLatency → RecordingResults → Done`, aborting on the first fatal
//! error. Non-fatal per-target failures are absorbed inside each phase.

use crate::{
    agent::AgentController,
    bench::LatencyProbe,
    cli::Cli,
    command::{CommandRunner, SystemCommandRunner},
    config::{load_config, validate_config},
    discovery::TargetDiscovery,
    error::{AppError, Result},
    executor::PhaseExecutor,
    logging::{LogLevel, Logger},
    models::{Config, LatencyRecord},
    net::{InterfaceInfo, InterfaceResolver, NetworkScope},
    output::CsvRecorder,
};
use chrono::Local;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::time::timeout;

/// Orchestrator phases, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    ResolvingNetwork,
    DiscoveringTargets,
    PreparingAgents,
    MeasuringLatency,
    RecordingResults,
    Done,
    Aborted,
}

impl Phase {
    /// Phase name for logging
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::ResolvingNetwork => "resolving-network",
            Phase::DiscoveringTargets => "discovering-targets",
            Phase::PreparingAgents => "preparing-agents",
            Phase::MeasuringLatency => "measuring-latency",
            Phase::RecordingResults => "recording-results",
            Phase::Done => "done",
            Phase::Aborted => "aborted",
        }
    }
}

/// One-line startup banner carrying the build identity
fn version_banner() -> String {
    match crate::GIT_COMMIT {
        Some(commit) => format!(
            "{} v{} ({}, built {})",
            crate::PKG_NAME,
            crate::VERSION,
            commit,
            crate::BUILD_TIME
        ),
        None => format!(
            "{} v{} (built {})",
            crate::PKG_NAME,
            crate::VERSION,
            crate::BUILD_TIME
        ),
    }
}

/// Main application struct that coordinates all components
pub struct App {
    config: Config,
    logger: Logger,
    runner: Arc<dyn CommandRunner>,
}

impl App {
    /// Create a new application instance with CLI configuration
    pub fn new(cli: Cli) -> Result<Self> {
        let config = load_config(cli)?;

        let min_level = if config.debug {
            LogLevel::Debug
        } else if config.verbose {
            LogLevel::Info
        } else {
            LogLevel::Warn
        };
        let logger = Logger::new(min_level, config.enable_color, config.debug);

        let runner: Arc<dyn CommandRunner> = Arc::new(SystemCommandRunner::default());

        Ok(Self {
            config,
            logger,
            runner,
        })
    }

    /// Construct an app over an explicit command runner (used by tests)
    pub fn with_runner(config: Config, logger: Logger, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            config,
            logger,
            runner,
        }
    }

    /// Run the application under the overall run timeout
    pub async fn run(&self) -> Result<usize> {
        match timeout(self.config.run_timeout(), self.execute()).await {
            Ok(result) => result,
            Err(_) => {
                let err = AppError::timeout(format!(
                    "run did not finish within {}s",
                    self.config.run_timeout_seconds
                ));
                self.enter(Phase::Aborted);
                Err(err)
            }
        }
    }

    /// Execute the phase sequence; returns the number of records written
    async fn execute(&self) -> Result<usize> {
        println!("{} (run {})", version_banner(), self.logger.run_id());

        let warnings = validate_config(&self.config)?;
        for warning in &warnings {
            println!("{}", warning.format(self.config.enable_color));
        }

        let result = self.run_phases().await;
        match &result {
            Ok(records) => {
                self.enter(Phase::Done);
                println!(
                    "Run complete: {} record(s) written to {}",
                    records,
                    self.config.output_path.display()
                );
            }
            Err(e) => {
                self.enter(Phase::Aborted);
                self.logger.error("app", format!("run aborted: {}", e));
            }
        }
        result
    }

    async fn run_phases(&self) -> Result<usize> {
        self.enter(Phase::ResolvingNetwork);
        let interface = self.resolve_network().await?;

        self.enter(Phase::DiscoveringTargets);
        let targets = self.discover_targets(&interface).await?;

        if self.config.skip_setup {
            println!("Skipping agent preparation");
        } else {
            self.enter(Phase::PreparingAgents);
            self.prepare_agents(&targets).await;
        }

        self.enter(Phase::MeasuringLatency);
        let measured = self.measure_latency(&targets).await;

        self.enter(Phase::RecordingResults);
        self.record_results(&interface, measured)
    }

    fn enter(&self, phase: Phase) {
        self.logger.debug("app", format!("entering phase {}", phase.as_str()));
        match phase {
            Phase::ResolvingNetwork => println!(
                "Getting IP address and netmask for interface {}",
                crate::defaults::DEFAULT_INTERFACE
            ),
            Phase::DiscoveringTargets => println!("Discovering target addresses"),
            Phase::PreparingAgents => println!("Preparing qperf agents on each target"),
            Phase::MeasuringLatency => println!("Running latency measurement using local qperf"),
            Phase::RecordingResults => println!("Writing latency data to CSV file"),
            Phase::Done | Phase::Aborted => {}
        }
    }

    async fn resolve_network(&self) -> Result<InterfaceInfo> {
        let resolver = InterfaceResolver::new(Arc::clone(&self.runner));
        let interface = resolver.resolve(crate::defaults::DEFAULT_INTERFACE).await?;

        self.logger.info(
            "net",
            format!(
                "interface {}: ip {}, netmask {}, network {}",
                crate::defaults::DEFAULT_INTERFACE,
                interface.ip,
                interface.netmask,
                interface.network_address()
            ),
        );

        Ok(interface)
    }

    async fn discover_targets(&self, interface: &InterfaceInfo) -> Result<Vec<Ipv4Addr>> {
        let scope = if self.config.override_target.is_some() {
            NetworkScope::Unrestricted
        } else {
            NetworkScope::from_interface(interface)
        };

        let discovery = TargetDiscovery::new(Arc::clone(&self.runner), self.logger.clone());
        let targets = discovery.discover(self.config.target_source(), scope).await?;

        println!(
            "Discovered {} in-scope target(s): {}",
            targets.len(),
            targets
                .iter()
                .map(|ip| ip.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(targets)
    }

    async fn prepare_agents(&self, targets: &[Ipv4Addr]) {
        let controller = Arc::new(AgentController::new(
            Arc::clone(&self.runner),
            self.logger.clone(),
            self.config.password.clone(),
        ));
        let executor = PhaseExecutor::new(self.config.concurrency, self.logger.clone());

        let (results, summary) = executor.prepare_agents(&controller, targets).await;
        for result in results.iter().filter(|r| !r.all_succeeded()) {
            self.logger.warn_target(
                "agent",
                result.target,
                "agent preparation incomplete; measurement will still be attempted",
            );
        }

        println!(
            "Agent preparation: {}/{} targets fully prepared",
            summary.succeeded, summary.total_targets
        );
    }

    async fn measure_latency(&self, targets: &[Ipv4Addr]) -> Vec<(Ipv4Addr, f64)> {
        let probe = Arc::new(LatencyProbe::new(
            Arc::clone(&self.runner),
            self.logger.clone(),
        ));
        let executor = PhaseExecutor::new(self.config.concurrency, self.logger.clone());

        let (measured, summary) = executor.measure_latency(&probe, targets).await;
        println!(
            "Measured {}/{} target(s)",
            summary.succeeded, summary.total_targets
        );

        measured
    }

    fn record_results(
        &self,
        interface: &InterfaceInfo,
        measured: Vec<(Ipv4Addr, f64)>,
    ) -> Result<usize> {
        // Single run-wide timestamp, captured once for all rows
        let timestamp = Local::now();
        let records: Vec<LatencyRecord> = measured
            .into_iter()
            .map(|(dest_ip, latency_us)| {
                LatencyRecord::new(timestamp, interface.ip, dest_ip, latency_us)
            })
            .collect();

        CsvRecorder::write_records(&self.config.output_path, &records)?;
        println!(
            "Latency data written to {}",
            self.config.output_path.display()
        );

        Ok(records.len())
    }
}
