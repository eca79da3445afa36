//! Bounded concurrent execution of per-target phase work
//!
//! Targets within a phase are independent; the pool runs them concurrently
//! under a semaphore so remote hosts and local file descriptors are not
//! overwhelmed. Workers return their results and the collector aggregates
//! after join; there is no shared mutable accumulator.

use crate::agent::AgentController;
use crate::bench::LatencyProbe;
use crate::logging::Logger;
use crate::models::AgentLifecycleResult;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Outcome counters for one phase across all targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseSummary {
    /// Number of targets the phase processed
    pub total_targets: usize,
    /// Targets where every step of the phase succeeded
    pub succeeded: usize,
    /// Targets with at least one failed step
    pub failed: usize,
}

impl PhaseSummary {
    fn new(total_targets: usize, succeeded: usize) -> Self {
        Self {
            total_targets,
            succeeded,
            failed: total_targets - succeeded,
        }
    }
}

/// Semaphore-bounded worker pool for per-target tasks
pub struct PhaseExecutor {
    limiter: Arc<Semaphore>,
    logger: Logger,
}

impl PhaseExecutor {
    /// Create an executor with the given concurrency bound
    pub fn new(concurrency: usize, logger: Logger) -> Self {
        Self {
            limiter: Arc::new(Semaphore::new(concurrency.max(1))),
            logger,
        }
    }

    /// Run one task per target, at most `concurrency` at a time.
    ///
    /// Results come back in target order; a task only starts once a permit
    /// is available.
    async fn run_each<T, Fut>(&self, targets: &[Ipv4Addr], task: impl Fn(Ipv4Addr) -> Fut) -> Vec<T>
    where
        Fut: Future<Output = T>,
    {
        let tasks = targets.iter().map(|&target| {
            let limiter = Arc::clone(&self.limiter);
            let work = task(target);
            async move {
                // The semaphore is never closed, so acquisition cannot fail
                let _permit = limiter.acquire_owned().await.ok();
                work.await
            }
        });

        join_all(tasks).await
    }

    /// Prepare agents on every target (stop → transfer → start per target)
    pub async fn prepare_agents(
        &self,
        controller: &Arc<AgentController>,
        targets: &[Ipv4Addr],
    ) -> (Vec<AgentLifecycleResult>, PhaseSummary) {
        let results = self
            .run_each(targets, |target| {
                let controller = Arc::clone(controller);
                async move { controller.prepare(target).await }
            })
            .await;

        let succeeded = results.iter().filter(|r| r.all_succeeded()).count();
        let summary = PhaseSummary::new(targets.len(), succeeded);

        self.logger.info(
            "executor",
            format!(
                "agent preparation finished: {}/{} targets fully prepared",
                summary.succeeded, summary.total_targets
            ),
        );

        (results, summary)
    }

    /// Measure latency to every target, keeping only successful measurements.
    ///
    /// A single target's failure is logged inside the probe/task and omitted
    /// here; it never affects other targets.
    pub async fn measure_latency(
        &self,
        probe: &Arc<LatencyProbe>,
        targets: &[Ipv4Addr],
    ) -> (Vec<(Ipv4Addr, f64)>, PhaseSummary) {
        let logger = self.logger.clone();
        let results = self
            .run_each(targets, |target| {
                let probe = Arc::clone(probe);
                let logger = logger.clone();
                async move {
                    match probe.measure(target).await {
                        Ok(latency) => Some((target, latency)),
                        Err(e) => {
                            logger.warn_target("bench", target, format!("measurement skipped: {}", e));
                            None
                        }
                    }
                }
            })
            .await;

        let measured: Vec<(Ipv4Addr, f64)> = results.into_iter().flatten().collect();
        let summary = PhaseSummary::new(targets.len(), measured.len());

        (measured, summary)
    }
}
