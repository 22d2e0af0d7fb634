//! Observability infrastructure for the healer
//!
//! Provides:
//! - Prometheus metrics (decisions, executed actions, ledger appends, sweeps)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge,
    HistogramVec, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

use crate::models::Action;
use crate::recovery::SweepReport;

/// Histogram buckets for sweep durations (in seconds)
const SWEEP_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<HealerMetricsInner> = OnceLock::new();

struct HealerMetricsInner {
    decisions_total: IntCounterVec,
    actions_executed_total: IntCounterVec,
    ledger_appends_total: IntCounter,
    ledger_failures_total: IntCounter,
    metric_samples: IntGauge,
    pods_deleted_total: IntCounterVec,
    sweep_failures_total: IntCounterVec,
    sweep_duration_seconds: HistogramVec,
}

impl HealerMetricsInner {
    fn new() -> Self {
        Self {
            decisions_total: register_int_counter_vec!(
                "healer_decisions_total",
                "Decisions taken, by decision path and resulting action",
                &["path", "action"]
            )
            .expect("Failed to register decisions_total"),

            actions_executed_total: register_int_counter_vec!(
                "healer_actions_executed_total",
                "Actions executed against services",
                &["action"]
            )
            .expect("Failed to register actions_executed_total"),

            ledger_appends_total: register_int_counter!(
                "healer_ledger_appends_total",
                "Healing records appended to the ledger"
            )
            .expect("Failed to register ledger_appends_total"),

            ledger_failures_total: register_int_counter!(
                "healer_ledger_failures_total",
                "Ledger appends that failed"
            )
            .expect("Failed to register ledger_failures_total"),

            metric_samples: register_int_gauge!(
                "healer_metric_samples",
                "Metric samples currently held by the metrics store"
            )
            .expect("Failed to register metric_samples"),

            pods_deleted_total: register_int_counter_vec!(
                "healer_pods_deleted_total",
                "Pods deleted by recovery sweeps",
                &["mode"]
            )
            .expect("Failed to register pods_deleted_total"),

            sweep_failures_total: register_int_counter_vec!(
                "healer_sweep_failures_total",
                "Per-pod or listing failures during recovery sweeps",
                &["mode"]
            )
            .expect("Failed to register sweep_failures_total"),

            sweep_duration_seconds: register_histogram_vec!(
                "healer_sweep_duration_seconds",
                "Wall time of a recovery sweep",
                &["mode"],
                SWEEP_BUCKETS.to_vec()
            )
            .expect("Failed to register sweep_duration_seconds"),
        }
    }
}

/// Healer metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the same
/// underlying metrics.
#[derive(Clone)]
pub struct HealerMetrics {
    _private: (),
}

impl Default for HealerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl HealerMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(HealerMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &HealerMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn inc_decision(&self, path: &str, action: Action) {
        self.inner()
            .decisions_total
            .with_label_values(&[path, action.as_str()])
            .inc();
    }

    pub fn inc_action_executed(&self, action: Action) {
        self.inner()
            .actions_executed_total
            .with_label_values(&[action.as_str()])
            .inc();
    }

    pub fn inc_ledger_appends(&self) {
        self.inner().ledger_appends_total.inc();
    }

    pub fn inc_ledger_failures(&self) {
        self.inner().ledger_failures_total.inc();
    }

    pub fn set_metric_samples(&self, count: i64) {
        self.inner().metric_samples.set(count);
    }

    /// Record the outcome of one sweep
    pub fn observe_sweep(&self, report: &SweepReport, duration_secs: f64) {
        let mode = report.mode.as_str();
        let inner = self.inner();
        inner
            .pods_deleted_total
            .with_label_values(&[mode])
            .inc_by(report.deleted.len() as u64);
        inner
            .sweep_failures_total
            .with_label_values(&[mode])
            .inc_by(report.failures.len() as u64);
        inner
            .sweep_duration_seconds
            .with_label_values(&[mode])
            .observe(duration_secs);
    }

    /// Count a sweep that failed before evaluating any pod
    pub fn inc_sweep_failure(&self, mode: &str) {
        self.inner()
            .sweep_failures_total
            .with_label_values(&[mode])
            .inc();
    }
}

/// Structured logger for healer events
///
/// Consistent JSON-formatted log lines for decisions, executed actions and
/// recovery sweeps.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    /// Log a metric-driven decision
    pub fn log_decision(&self, service: &str, prediction: &str, cpu: f64, memory: f64, action: Action) {
        info!(
            event = "decision_made",
            instance = %self.instance,
            service = %service,
            path = "metrics",
            prediction = %prediction,
            cpu = cpu,
            memory = memory,
            action = %action,
            "Healing decision made"
        );
    }

    /// Log a cluster-driven decision
    pub fn log_cluster_decision(&self, service: &str, cluster: i32, action: Action) {
        info!(
            event = "decision_made",
            instance = %self.instance,
            service = %service,
            path = "cluster",
            cluster = cluster,
            action = %action,
            "Healing decision made"
        );
    }

    /// Log an executed action
    pub fn log_action_executed(&self, service: &str, action: Action, result: &str, mode: &str) {
        match action {
            Action::RestartService => {
                warn!(
                    event = "action_executed",
                    instance = %self.instance,
                    service = %service,
                    action = %action,
                    mode = %mode,
                    result = %result,
                    "Restarting service"
                );
            }
            _ => {
                info!(
                    event = "action_executed",
                    instance = %self.instance,
                    service = %service,
                    action = %action,
                    mode = %mode,
                    result = %result,
                    "Action executed"
                );
            }
        }
    }

    /// Log an unrecognized action that was downgraded to a no-op
    pub fn log_unknown_action(&self, service: &str, raw_action: &str) {
        warn!(
            event = "unknown_action",
            instance = %self.instance,
            service = %service,
            raw_action = %raw_action,
            "Unrecognized action treated as no-op"
        );
    }

    /// Log an action whose effect happened but whose ledger append failed
    pub fn log_ledger_failure(
        &self,
        service: &str,
        cluster: i32,
        action: Action,
        result: &str,
        error: &str,
    ) {
        error!(
            event = "ledger_append_failed",
            instance = %self.instance,
            service = %service,
            cluster = cluster,
            action = %action,
            result = %result,
            error = %error,
            "Executed healing action was not recorded"
        );
    }

    /// Log a pod deleted by a sweep
    pub fn log_pod_deleted(&self, pod: &str, app_label: &str, reason: &str) {
        warn!(
            event = "pod_deleted",
            instance = %self.instance,
            pod = %pod,
            app_label = %app_label,
            reason = %reason,
            "Deleted unhealthy pod"
        );
    }

    /// Log a completed sweep
    pub fn log_sweep_completed(&self, report: &SweepReport, elapsed_ms: u128) {
        let retryable = report.failures.iter().filter(|f| f.retryable).count();
        if report.failures.is_empty() {
            info!(
                event = "sweep_completed",
                instance = %self.instance,
                app_label = %report.app_label,
                mode = %report.mode.as_str(),
                inspected = report.inspected,
                deleted = report.deleted.len(),
                elapsed_ms = elapsed_ms,
                "Recovery sweep completed"
            );
        } else {
            warn!(
                event = "sweep_completed",
                instance = %self.instance,
                app_label = %report.app_label,
                mode = %report.mode.as_str(),
                inspected = report.inspected,
                deleted = report.deleted.len(),
                failures = report.failures.len(),
                retryable_failures = retryable,
                elapsed_ms = elapsed_ms,
                "Recovery sweep completed with failures"
            );
        }
    }

    /// Log healer startup
    pub fn log_startup(&self, version: &str, cluster_backend: &str) {
        info!(
            event = "agent_started",
            instance = %self.instance,
            agent_version = %version,
            cluster_backend = %cluster_backend,
            "Healer agent started"
        );
    }

    /// Log healer shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "agent_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Healer agent shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recovery::{SweepMode, SweepReport};

    #[test]
    fn test_healer_metrics_creation() {
        let metrics = HealerMetrics::new();

        metrics.inc_decision("metrics", Action::EnergyStable);
        metrics.inc_action_executed(Action::RestartService);
        metrics.inc_ledger_appends();
        metrics.set_metric_samples(3);
        metrics.inc_sweep_failure("stuck");

        let report = SweepReport::new("payments", SweepMode::Stuck);
        metrics.observe_sweep(&report, 0.2);
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("healer-0");
        assert_eq!(logger.instance, "healer-0");
    }
}
