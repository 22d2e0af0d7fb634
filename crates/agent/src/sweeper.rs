//! Periodic recovery sweeps
//!
//! Runs a sweep over every configured app label on a fixed interval until
//! the shutdown token fires. Each cycle with a failed sweep or pod counts as
//! one sweeper failure; a clean cycle restores the component.

use healer_lib::{
    health::{Component, HealthRegistry},
    HealError, RecoverySweep, SweepMode,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct SweepLoopConfig {
    pub interval: Duration,
    pub app_labels: Vec<String>,
    pub mode: SweepMode,
}

pub struct SweepLoop {
    recovery: Arc<RecoverySweep>,
    health: HealthRegistry,
    config: SweepLoopConfig,
}

impl SweepLoop {
    pub fn new(recovery: Arc<RecoverySweep>, health: HealthRegistry, config: SweepLoopConfig) -> Self {
        Self {
            recovery,
            health,
            config,
        }
    }

    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            labels = ?self.config.app_labels,
            mode = %self.config.mode.as_str(),
            "Starting recovery sweep loop"
        );

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !self.sweep_all(&shutdown).await {
                        break;
                    }
                }
                _ = shutdown.cancelled() => break,
            }
        }

        info!("Shutting down recovery sweep loop");
    }

    /// One cycle over all labels; returns false once cancelled
    async fn sweep_all(&self, shutdown: &CancellationToken) -> bool {
        let mut problems = Vec::new();

        for label in &self.config.app_labels {
            match self.recovery.sweep(label, self.config.mode, shutdown).await {
                Ok(report) if report.failures.is_empty() => {
                    debug!(app_label = %label, deleted = report.deleted.len(), "Sweep cycle clean");
                }
                Ok(report) => problems.push(format!(
                    "app={}: {} pod failures",
                    label,
                    report.failures.len()
                )),
                Err(HealError::Cancelled) => return false,
                Err(e) => problems.push(format!("app={}: {}", label, e)),
            }
        }

        if problems.is_empty() {
            self.health.record_success(Component::Sweeper).await;
        } else {
            self.health
                .record_failure(Component::Sweeper, problems.join("; "))
                .await;
        }
        true
    }
}
