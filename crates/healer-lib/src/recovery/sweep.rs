//! Label-scoped recovery sweeps
//!
//! A sweep lists the pods behind `app=<label>`, fetches each pod's live
//! health and deletes the ones the sweep mode selects. Every cluster call is
//! bounded by the command timeout; pods are evaluated concurrently and a
//! per-pod failure is recorded without aborting the sweep. Every call's
//! outcome also feeds the `cluster_client` health component when a registry
//! is attached.

use futures::stream::{FuturesOrdered, FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{is_stuck_reason, ClusterClient};
use crate::error::{HealError, HealResult};
use crate::health::{Component, HealthRegistry};
use crate::models::PodHealth;
use crate::observability::{HealerMetrics, StructuredLogger};

/// Default bound on a single cluster call
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of pods evaluated at once
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Kubernetes label values are at most 63 characters
const MAX_LABEL_LEN: usize = 63;

/// Which pods a sweep deletes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepMode {
    /// Pods waiting on CrashLoopBackOff or an image pull failure
    Stuck,
    /// Pods with any container not ready
    Unready,
}

impl SweepMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SweepMode::Stuck => "stuck",
            SweepMode::Unready => "unready",
        }
    }

    /// Reason to delete the pod, or `None` to leave it running
    fn deletion_reason(&self, health: &PodHealth) -> Option<String> {
        match self {
            SweepMode::Stuck => health
                .waiting_reason
                .as_deref()
                .filter(|r| is_stuck_reason(r))
                .map(str::to_string),
            SweepMode::Unready if !health.ready => Some(
                health
                    .waiting_reason
                    .clone()
                    .unwrap_or_else(|| "NotReady".to_string()),
            ),
            SweepMode::Unready => None,
        }
    }
}

impl std::str::FromStr for SweepMode {
    type Err = HealError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stuck" => Ok(SweepMode::Stuck),
            "unready" => Ok(SweepMode::Unready),
            other => Err(HealError::invalid_input(format!(
                "unknown sweep mode '{}', expected stuck or unready",
                other
            ))),
        }
    }
}

/// A pod the sweep could not evaluate or delete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodFailure {
    pub pod: String,
    pub error: String,
    pub retryable: bool,
}

/// Outcome of one sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub app_label: String,
    pub mode: SweepMode,
    /// Pods returned for the selector
    pub inspected: usize,
    pub deleted: Vec<String>,
    pub failures: Vec<PodFailure>,
}

impl SweepReport {
    pub fn new(app_label: impl Into<String>, mode: SweepMode) -> Self {
        Self {
            app_label: app_label.into(),
            mode,
            inspected: 0,
            deleted: Vec::new(),
            failures: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub command_timeout: Duration,
    pub max_concurrency: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

/// Build the `app=<label>` selector, rejecting anything that could widen it
pub fn selector_for(app_label: &str) -> HealResult<String> {
    validate_name("app label", app_label)?;
    Ok(format!("app={}", app_label))
}

fn validate_name(kind: &str, value: &str) -> HealResult<()> {
    if value.is_empty() {
        return Err(HealError::invalid_input(format!("{} must not be empty", kind)));
    }
    if value.len() > MAX_LABEL_LEN {
        return Err(HealError::invalid_input(format!(
            "{} exceeds {} characters",
            kind, MAX_LABEL_LEN
        )));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(HealError::invalid_input(format!(
            "{} '{}' contains invalid characters",
            kind, value
        )));
    }
    Ok(())
}

pub struct RecoverySweep {
    client: Arc<dyn ClusterClient>,
    config: SweepConfig,
    health: Option<HealthRegistry>,
    logger: StructuredLogger,
    metrics: HealerMetrics,
}

impl RecoverySweep {
    pub fn new(
        client: Arc<dyn ClusterClient>,
        config: SweepConfig,
        logger: StructuredLogger,
        metrics: HealerMetrics,
    ) -> Self {
        Self {
            client,
            config,
            health: None,
            logger,
            metrics,
        }
    }

    /// Report cluster call outcomes to `registry`
    pub fn with_health(mut self, registry: HealthRegistry) -> Self {
        self.health = Some(registry);
        self
    }

    pub fn backend(&self) -> &'static str {
        self.client.backend()
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Live health of every pod behind the label
    pub async fn list_pod_health(&self, app_label: &str) -> HealResult<Vec<PodHealth>> {
        let selector = selector_for(app_label)?;
        let pods = self
            .bounded(format!("list pods {}", selector), self.client.list_pods(&selector))
            .await?;

        let mut pending = pods.into_iter();
        let mut in_flight = FuturesOrdered::new();
        let mut healths = Vec::with_capacity(pending.len());

        for pod in pending.by_ref().take(self.concurrency()) {
            in_flight.push_back(self.fetch_health(pod));
        }
        while let Some(health) = in_flight.next().await {
            healths.push(health?);
            if let Some(pod) = pending.next() {
                in_flight.push_back(self.fetch_health(pod));
            }
        }

        Ok(healths)
    }

    /// Delete pods stuck in CrashLoopBackOff or an image pull failure
    pub async fn check_and_heal_stuck_pods(
        &self,
        app_label: &str,
        cancel: &CancellationToken,
    ) -> HealResult<SweepReport> {
        self.sweep(app_label, SweepMode::Stuck, cancel).await
    }

    /// Delete pods that are not ready, whatever their waiting reason
    pub async fn evict_unhealthy_pods(
        &self,
        app_label: &str,
        cancel: &CancellationToken,
    ) -> HealResult<SweepReport> {
        self.sweep(app_label, SweepMode::Unready, cancel).await
    }

    pub async fn sweep(
        &self,
        app_label: &str,
        mode: SweepMode,
        cancel: &CancellationToken,
    ) -> HealResult<SweepReport> {
        let selector = selector_for(app_label)?;
        let started = Instant::now();

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(HealError::Cancelled),
            result = self.run_sweep(app_label, &selector, mode) => result,
        };

        match &result {
            Ok(report) => {
                self.metrics
                    .observe_sweep(report, started.elapsed().as_secs_f64());
                self.logger
                    .log_sweep_completed(report, started.elapsed().as_millis());
            }
            Err(e) => {
                self.metrics.inc_sweep_failure(mode.as_str());
                warn!(
                    app_label = %app_label,
                    mode = %mode.as_str(),
                    error = %e,
                    "Recovery sweep failed"
                );
            }
        }

        result
    }

    pub async fn scale_deployment(&self, name: &str, replicas: i32) -> HealResult<()> {
        validate_name("deployment name", name)?;
        if replicas < 0 {
            return Err(HealError::invalid_input("replicas must not be negative"));
        }
        self.bounded(
            format!("scale deployment {}", name),
            self.client.scale_deployment(name, replicas),
        )
        .await
    }

    pub async fn restart_deployment(&self, name: &str) -> HealResult<()> {
        validate_name("deployment name", name)?;
        self.bounded(
            format!("restart deployment {}", name),
            self.client.restart_deployment(name),
        )
        .await
    }

    async fn run_sweep(
        &self,
        app_label: &str,
        selector: &str,
        mode: SweepMode,
    ) -> HealResult<SweepReport> {
        let pods = self
            .bounded(format!("list pods {}", selector), self.client.list_pods(selector))
            .await?;

        let mut report = SweepReport::new(app_label, mode);
        report.inspected = pods.len();

        // Keep at most `concurrency` pods in flight
        let mut pending = pods.into_iter();
        let mut in_flight = FuturesUnordered::new();
        for pod in pending.by_ref().take(self.concurrency()) {
            in_flight.push(self.heal_pod(app_label, pod, mode));
        }

        while let Some((pod, outcome)) = in_flight.next().await {
            match outcome {
                Ok(true) => report.deleted.push(pod),
                Ok(false) => {}
                Err(e) => report.failures.push(PodFailure {
                    pod,
                    retryable: e.is_retryable(),
                    error: e.to_string(),
                }),
            }
            if let Some(next) = pending.next() {
                in_flight.push(self.heal_pod(app_label, next, mode));
            }
        }
        report.deleted.sort();
        report.failures.sort_by(|a, b| a.pod.cmp(&b.pod));

        Ok(report)
    }

    async fn fetch_health(&self, pod: String) -> HealResult<PodHealth> {
        self.bounded(format!("get pod {}", pod), self.client.pod_status(&pod))
            .await
    }

    /// Evaluate one pod; the flag reports whether it was deleted
    async fn heal_pod(
        &self,
        app_label: &str,
        pod: String,
        mode: SweepMode,
    ) -> (String, HealResult<bool>) {
        let outcome = self.try_heal_pod(app_label, &pod, mode).await;
        (pod, outcome)
    }

    async fn try_heal_pod(&self, app_label: &str, pod: &str, mode: SweepMode) -> HealResult<bool> {
        let health = self
            .bounded(format!("get pod {}", pod), self.client.pod_status(pod))
            .await?;

        let Some(reason) = mode.deletion_reason(&health) else {
            debug!(pod = %pod, mode = %mode.as_str(), "Pod left running");
            return Ok(false);
        };

        self.bounded(format!("delete pod {}", pod), self.client.delete_pod(pod))
            .await?;
        self.logger.log_pod_deleted(pod, app_label, &reason);
        Ok(true)
    }

    async fn bounded<T, F>(&self, operation: String, call: F) -> HealResult<T>
    where
        F: Future<Output = HealResult<T>>,
    {
        let result = match tokio::time::timeout(self.config.command_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(HealError::Timeout {
                operation,
                after: self.config.command_timeout,
            }),
        };
        if let Some(health) = &self.health {
            health.observe(Component::ClusterClient, &result).await;
        }
        result
    }

    fn concurrency(&self) -> usize {
        self.config.max_concurrency.max(1)
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    /// In-memory cluster keyed by label selector
    #[derive(Default)]
    pub struct MockCluster {
        pub pods_by_selector: HashMap<String, Vec<String>>,
        pub health: HashMap<String, PodHealth>,
        pub slow_pods: HashSet<String>,
        pub fail_list: bool,
        pub deleted: Mutex<Vec<String>>,
        pub scaled: Mutex<Vec<(String, i32)>>,
        pub restarted: Mutex<Vec<String>>,
    }

    impl MockCluster {
        pub fn with_pod(mut self, selector: &str, name: &str, ready: bool, reason: Option<&str>) -> Self {
            self.pods_by_selector
                .entry(selector.to_string())
                .or_default()
                .push(name.to_string());
            self.health.insert(
                name.to_string(),
                PodHealth {
                    name: name.to_string(),
                    waiting_reason: reason.map(str::to_string),
                    ready,
                },
            );
            self
        }

        pub fn deleted(&self) -> Vec<String> {
            let mut deleted = self.deleted.lock().unwrap().clone();
            deleted.sort();
            deleted
        }
    }

    #[async_trait]
    impl ClusterClient for MockCluster {
        async fn list_pods(&self, label_selector: &str) -> HealResult<Vec<String>> {
            if self.fail_list {
                return Err(HealError::external("list pods", "connection refused"));
            }
            Ok(self
                .pods_by_selector
                .get(label_selector)
                .cloned()
                .unwrap_or_default())
        }

        async fn pod_status(&self, pod: &str) -> HealResult<PodHealth> {
            if self.slow_pods.contains(pod) {
                tokio::time::sleep(Duration::from_secs(10)).await;
            }
            self.health
                .get(pod)
                .cloned()
                .ok_or_else(|| HealError::external(format!("get pod {}", pod), "NotFound"))
        }

        async fn delete_pod(&self, pod: &str) -> HealResult<()> {
            self.deleted.lock().unwrap().push(pod.to_string());
            Ok(())
        }

        async fn scale_deployment(&self, name: &str, replicas: i32) -> HealResult<()> {
            self.scaled.lock().unwrap().push((name.to_string(), replicas));
            Ok(())
        }

        async fn restart_deployment(&self, name: &str) -> HealResult<()> {
            self.restarted.lock().unwrap().push(name.to_string());
            Ok(())
        }

        fn backend(&self) -> &'static str {
            "mock"
        }
    }
}
