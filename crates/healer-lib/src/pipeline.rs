//! Decide, execute, record
//!
//! Entry points for the three healing triggers: metric-driven auto-heal,
//! cluster alerts and manual actions. Each executed action is appended to
//! the ledger exactly once; a failed append fails the request.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::decision::HealingDecisionEngine;
use crate::error::{HealError, HealResult};
use crate::executor::{ActionExecutor, ActionOutcome};
use crate::health::{Component, HealthRegistry};
use crate::ledger::HealingLedger;
use crate::metrics_store::MetricsStore;
use crate::models::{cluster, Action, HealingRecord, MetricSample, NewHealingRecord, PredictionLabel};
use crate::observability::{HealerMetrics, StructuredLogger};

/// Alert pushed by the external classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub service_name: String,
    #[serde(default)]
    pub metrics: HashMap<String, f64>,
    /// Risk bucket; absent means low
    #[serde(default)]
    pub cluster: Option<i32>,
}

impl Alert {
    /// Sample carried by the alert when it reports both cpu and memory
    fn sample(&self) -> Option<MetricSample> {
        let cpu = *self.metrics.get("cpu")?;
        let memory = *self.metrics.get("memory")?;
        let field = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| self.metrics.get(*k).copied())
                .unwrap_or(0.0)
        };

        Some(MetricSample {
            service_name: self.service_name.clone(),
            cpu,
            memory,
            network: field(&["network"]),
            disk_io: field(&["diskIO", "disk"]),
            energy: field(&["energy"]),
            latency_ms: field(&["latencyMs", "latency"]).max(0.0) as u64,
            timestamp: Utc::now(),
        })
    }
}

/// Response to an ingested alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertOutcome {
    pub status: String,
    pub cluster: i32,
    pub action: Action,
    pub result: String,
}

pub struct HealingPipeline {
    engine: HealingDecisionEngine,
    executor: Arc<ActionExecutor>,
    ledger: Arc<dyn HealingLedger>,
    metrics_store: Arc<dyn MetricsStore>,
    health: HealthRegistry,
    logger: StructuredLogger,
    metrics: HealerMetrics,
}

impl HealingPipeline {
    pub fn new(
        engine: HealingDecisionEngine,
        executor: Arc<ActionExecutor>,
        ledger: Arc<dyn HealingLedger>,
        metrics_store: Arc<dyn MetricsStore>,
        health: HealthRegistry,
        logger: StructuredLogger,
        metrics: HealerMetrics,
    ) -> Self {
        Self {
            engine,
            executor,
            ledger,
            metrics_store,
            health,
            logger,
            metrics,
        }
    }

    pub fn engine(&self) -> &HealingDecisionEngine {
        &self.engine
    }

    /// Decide from metrics and prediction, execute, record under cluster -1
    pub async fn auto_heal(
        &self,
        service: &str,
        prediction: &str,
        cpu: f64,
        memory: f64,
    ) -> HealResult<ActionOutcome> {
        require_service(service)?;
        require_metric("cpu", cpu)?;
        require_metric("memory", memory)?;

        let label = PredictionLabel::classify(prediction);
        let action = self.engine.decide(label, cpu, memory);
        self.logger.log_decision(service, prediction, cpu, memory, action);
        self.metrics.inc_decision("metrics", action);

        let outcome = self.executor.execute_action(service, action).await?;
        self.record(cluster::UNSCOPED, &outcome).await?;
        Ok(outcome)
    }

    /// Decide from the alert's risk cluster, execute, record under that cluster
    pub async fn handle_alert(&self, alert: Alert) -> HealResult<AlertOutcome> {
        require_service(&alert.service_name)?;
        let cluster_id = alert.cluster.unwrap_or(cluster::LOW);

        if let Some(sample) = alert.sample() {
            self.record_sample(sample).await?;
        }

        let action = HealingDecisionEngine::decide_cluster_action(cluster_id);
        self.logger
            .log_cluster_decision(&alert.service_name, cluster_id, action);
        self.metrics.inc_decision("cluster", action);

        let outcome = self
            .executor
            .execute_action(&alert.service_name, action)
            .await?;
        self.record(cluster_id, &outcome).await?;

        Ok(AlertOutcome {
            status: "received".to_string(),
            cluster: cluster_id,
            action,
            result: outcome.result,
        })
    }

    /// Execute an operator-chosen action; unknown names run as no-ops
    pub async fn manual_heal(&self, service: &str, raw_action: &str) -> HealResult<ActionOutcome> {
        require_service(service)?;
        let outcome = self.executor.execute_raw(service, raw_action).await?;
        self.record(cluster::UNSCOPED, &outcome).await?;
        Ok(outcome)
    }

    pub async fn record_sample(&self, sample: MetricSample) -> HealResult<()> {
        let result = self.metrics_store.record(sample).await;
        self.health.observe(Component::MetricsStore, &result).await;
        result?;

        self.metrics
            .set_metric_samples(self.metrics_store.len().await as i64);
        Ok(())
    }

    /// Append the executed action; on failure the error names what ran
    async fn record(&self, cluster_id: i32, outcome: &ActionOutcome) -> HealResult<HealingRecord> {
        let result = self
            .ledger
            .append(NewHealingRecord::new(&outcome.service, cluster_id, outcome.action))
            .await;
        self.health.observe(Component::Ledger, &result).await;

        match result {
            Ok(record) => {
                self.metrics.inc_ledger_appends();
                Ok(record)
            }
            Err(e) => {
                self.metrics.inc_ledger_failures();
                self.logger.log_ledger_failure(
                    &outcome.service,
                    cluster_id,
                    outcome.action,
                    &outcome.result,
                    &e.to_string(),
                );
                Err(match e {
                    HealError::Persistence(message) => HealError::Persistence(format!(
                        "{}; {} on {} was executed ({}) but not recorded",
                        message, outcome.action, outcome.service, outcome.result
                    )),
                    other => other,
                })
            }
        }
    }
}

fn require_service(service: &str) -> HealResult<()> {
    if service.trim().is_empty() {
        return Err(HealError::invalid_input("service must not be empty"));
    }
    Ok(())
}

fn require_metric(field: &str, value: f64) -> HealResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(HealError::invalid_input(format!(
            "{} must be a non-negative number",
            field
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{ComponentStatus, UNHEALTHY_AFTER};
    use crate::ledger::MemoryLedger;
    use crate::metrics_store::{MemoryMetricsStore, SampleTotals};
    use async_trait::async_trait;

    struct BrokenLedger;

    #[async_trait]
    impl HealingLedger for BrokenLedger {
        async fn append(&self, _record: NewHealingRecord) -> HealResult<HealingRecord> {
            Err(HealError::persistence("disk full"))
        }

        async fn recent(&self, _limit: usize) -> HealResult<Vec<HealingRecord>> {
            Ok(Vec::new())
        }

        async fn all(&self) -> HealResult<Vec<HealingRecord>> {
            Ok(Vec::new())
        }
    }

    fn pipeline_with(ledger: Arc<dyn HealingLedger>) -> (HealingPipeline, Arc<MemoryMetricsStore>, HealthRegistry) {
        let logger = StructuredLogger::new("test");
        let metrics = HealerMetrics::new();
        let store = Arc::new(MemoryMetricsStore::default());
        let health = HealthRegistry::new();
        let executor = Arc::new(ActionExecutor::simulated(logger.clone(), metrics.clone()));

        let pipeline = HealingPipeline::new(
            HealingDecisionEngine::default(),
            executor,
            ledger,
            store.clone(),
            health.clone(),
            logger,
            metrics,
        );
        (pipeline, store, health)
    }

    #[tokio::test]
    async fn test_auto_heal_records_unscoped() {
        let ledger = Arc::new(MemoryLedger::new());
        let (pipeline, _, _) = pipeline_with(ledger.clone());

        let outcome = pipeline
            .auto_heal("payment-service", "High load", 95.0, 2048.0)
            .await
            .unwrap();
        assert_eq!(outcome.action, Action::RestartService);
        assert_eq!(outcome.result, "Service restarted");

        let records = ledger.all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].cluster, cluster::UNSCOPED);
        assert_eq!(records[0].action_taken, Action::RestartService);
    }

    #[tokio::test]
    async fn test_no_action_is_still_recorded() {
        let ledger = Arc::new(MemoryLedger::new());
        let (pipeline, _, _) = pipeline_with(ledger.clone());

        let outcome = pipeline.auto_heal("api", "stable", 20.0, 100.0).await.unwrap();
        assert_eq!(outcome.action, Action::NoAction);
        assert_eq!(ledger.all().await.unwrap()[0].action_taken, Action::NoAction);
    }

    #[tokio::test]
    async fn test_auto_heal_rejects_bad_metrics() {
        let ledger = Arc::new(MemoryLedger::new());
        let (pipeline, _, _) = pipeline_with(ledger.clone());

        let err = pipeline.auto_heal("api", "low", f64::NAN, 100.0).await.unwrap_err();
        assert!(matches!(err, HealError::InvalidInput(_)));
        let err = pipeline.auto_heal("", "low", 10.0, 100.0).await.unwrap_err();
        assert!(matches!(err, HealError::InvalidInput(_)));
        assert!(ledger.is_empty().await);
    }

    #[tokio::test]
    async fn test_alert_uses_cluster_path_and_records_sample() {
        let ledger = Arc::new(MemoryLedger::new());
        let (pipeline, store, _) = pipeline_with(ledger.clone());

        let alert = Alert {
            service_name: "order-service".to_string(),
            metrics: HashMap::from([
                ("cpu".to_string(), 12.0),
                ("memory".to_string(), 300.0),
                ("disk".to_string(), 4.0),
            ]),
            cluster: Some(2),
        };
        let outcome = pipeline.handle_alert(alert).await.unwrap();
        assert_eq!(outcome.status, "received");
        assert_eq!(outcome.cluster, 2);
        assert_eq!(outcome.action, Action::RestartService);

        let samples = store.all().await.unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].disk_io, 4.0);
        assert_eq!(ledger.all().await.unwrap()[0].cluster, 2);
    }

    #[tokio::test]
    async fn test_alert_without_cluster_defaults_to_low() {
        let ledger = Arc::new(MemoryLedger::new());
        let (pipeline, store, _) = pipeline_with(ledger.clone());

        let alert = Alert {
            service_name: "order-service".to_string(),
            metrics: HashMap::from([("cpu".to_string(), 12.0)]),
            cluster: None,
        };
        let outcome = pipeline.handle_alert(alert).await.unwrap();
        assert_eq!(outcome.cluster, 0);
        assert_eq!(outcome.action, Action::EnergyScaleDown);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_unexpected_cluster_is_carried_through() {
        let ledger = Arc::new(MemoryLedger::new());
        let (pipeline, _, _) = pipeline_with(ledger.clone());

        let alert = Alert {
            service_name: "api".to_string(),
            metrics: HashMap::new(),
            cluster: Some(7),
        };
        let outcome = pipeline.handle_alert(alert).await.unwrap();
        assert_eq!(outcome.action, Action::EnergyStable);
        assert_eq!(ledger.all().await.unwrap()[0].cluster, 7);
    }

    #[tokio::test]
    async fn test_manual_unknown_action_records_no_action() {
        let ledger = Arc::new(MemoryLedger::new());
        let (pipeline, _, _) = pipeline_with(ledger.clone());

        let outcome = pipeline.manual_heal("api", "REBOOT_EVERYTHING").await.unwrap();
        assert_eq!(outcome.action, Action::NoAction);

        let records = ledger.all().await.unwrap();
        assert_eq!(records[0].action_taken, Action::NoAction);
        assert_eq!(records[0].cluster, cluster::UNSCOPED);
    }

    #[tokio::test]
    async fn test_two_identical_triggers_make_two_records() {
        let ledger = Arc::new(MemoryLedger::new());
        let (pipeline, _, _) = pipeline_with(ledger.clone());

        pipeline.manual_heal("api", "RESTART_SERVICE").await.unwrap();
        pipeline.manual_heal("api", "RESTART_SERVICE").await.unwrap();
        assert_eq!(ledger.len().await, 2);
    }

    #[tokio::test]
    async fn test_ledger_failure_fails_request_and_degrades_health() {
        let (pipeline, _, health) = pipeline_with(Arc::new(BrokenLedger));
        health.register(Component::Ledger).await;

        let err = pipeline.auto_heal("api", "high", 90.0, 100.0).await.unwrap_err();
        assert!(matches!(err, HealError::Persistence(_)));
        let message = err.to_string();
        assert!(message.contains("disk full"));
        assert!(message.contains("RESTART_SERVICE on api was executed (Service restarted)"));

        let status = health.health().await;
        assert_eq!(
            status.components[&Component::Ledger].status,
            ComponentStatus::Degraded
        );
    }

    #[tokio::test]
    async fn test_ledger_recovers_after_successful_append() {
        let ledger = Arc::new(MemoryLedger::new());
        let (pipeline, _, health) = pipeline_with(ledger);
        health.register(Component::Ledger).await;
        health
            .record_failure(Component::Ledger, "persistence failure: disk full")
            .await;

        pipeline.manual_heal("api", "ENERGY_STABLE").await.unwrap();
        assert_eq!(health.health().await.status, ComponentStatus::Healthy);
    }

    struct BrokenStore;

    #[async_trait]
    impl MetricsStore for BrokenStore {
        async fn record(&self, sample: MetricSample) -> HealResult<()> {
            sample.validate()?;
            Err(HealError::persistence("metrics volume read-only"))
        }

        async fn recent(&self, _limit: usize) -> HealResult<Vec<MetricSample>> {
            Ok(Vec::new())
        }

        async fn all(&self) -> HealResult<Vec<MetricSample>> {
            Ok(Vec::new())
        }

        async fn totals(&self) -> HealResult<SampleTotals> {
            Ok(SampleTotals::default())
        }

        async fn len(&self) -> usize {
            0
        }
    }

    fn sample(cpu: f64) -> MetricSample {
        MetricSample {
            service_name: "api".to_string(),
            cpu,
            memory: 100.0,
            network: 0.0,
            disk_io: 0.0,
            energy: 0.0,
            latency_ms: 0,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_store_failures_drive_metrics_store_health() {
        let logger = StructuredLogger::new("test");
        let metrics = HealerMetrics::new();
        let health = HealthRegistry::new();
        health.register(Component::MetricsStore).await;
        let pipeline = HealingPipeline::new(
            HealingDecisionEngine::default(),
            Arc::new(ActionExecutor::simulated(logger.clone(), metrics.clone())),
            Arc::new(MemoryLedger::new()),
            Arc::new(BrokenStore),
            health.clone(),
            logger,
            metrics,
        );

        // A rejected sample is the caller's fault
        let err = pipeline.record_sample(sample(-1.0)).await.unwrap_err();
        assert!(matches!(err, HealError::InvalidInput(_)));
        assert_eq!(health.health().await.status, ComponentStatus::Healthy);

        for _ in 0..UNHEALTHY_AFTER {
            let err = pipeline.record_sample(sample(10.0)).await.unwrap_err();
            assert!(matches!(err, HealError::Persistence(_)));
        }
        let status = health.health().await;
        let store = &status.components[&Component::MetricsStore];
        assert_eq!(store.status, ComponentStatus::Unhealthy);
        assert_eq!(store.consecutive_failures, UNHEALTHY_AFTER);
        // Not critical, so the agent stays degraded rather than unhealthy
        assert_eq!(status.status, ComponentStatus::Degraded);
    }
}
