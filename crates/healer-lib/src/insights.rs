//! Read-only summary over the healing ledger and metric samples

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::HealResult;
use crate::ledger::HealingLedger;
use crate::metrics_store::{MetricsStore, SampleTotals};
use crate::models::HealingRecord;

/// Placeholder for fields with no underlying record
pub const NOT_AVAILABLE: &str = "N/A";

/// More high-risk actions than this flags the system as unstable
const FREQUENT_HIGH_RISK_THRESHOLD: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsSummary {
    pub total_healings: usize,
    pub high_risk_actions: usize,
    pub last_failure_time: String,
    pub last_action: String,
    #[serde(rename = "averageCPU")]
    pub average_cpu: f64,
    pub average_memory: f64,
    pub summary: String,
}

pub struct InsightsAggregator {
    ledger: Arc<dyn HealingLedger>,
    metrics: Arc<dyn MetricsStore>,
}

impl InsightsAggregator {
    pub fn new(ledger: Arc<dyn HealingLedger>, metrics: Arc<dyn MetricsStore>) -> Self {
        Self { ledger, metrics }
    }

    pub async fn summarize(&self) -> HealResult<InsightsSummary> {
        let records = self.ledger.all().await?;
        let totals = self.metrics.totals().await?;
        Ok(summarize(&records, &totals))
    }
}

/// Build a summary from records in ascending order and lifetime sample totals
pub fn summarize(records: &[HealingRecord], totals: &SampleTotals) -> InsightsSummary {
    let high_risk_actions = records
        .iter()
        .filter(|r| r.action_taken.is_high_risk())
        .count();

    let (last_failure_time, last_action) = match records.last() {
        Some(last) => (last.timestamp.to_rfc3339(), last.action_taken.to_string()),
        None => (NOT_AVAILABLE.to_string(), NOT_AVAILABLE.to_string()),
    };

    let summary = if high_risk_actions > FREQUENT_HIGH_RISK_THRESHOLD {
        "System experienced frequent high-risk failures. Energy optimization recommended."
    } else if !records.is_empty() {
        "System is stable with occasional recovery actions."
    } else {
        "System running smoothly with no recovery actions."
    };

    InsightsSummary {
        total_healings: records.len(),
        high_risk_actions,
        last_failure_time,
        last_action,
        average_cpu: round2(totals.average_cpu()),
        average_memory: round2(totals.average_memory()),
        summary: summary.to_string(),
    }
}

/// Round half-up to two decimals
fn round2(value: f64) -> f64 {
    (value * 100.0 + 0.5).floor() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryLedger;
    use crate::metrics_store::{MemoryMetricsStore, DEFAULT_RETENTION};
    use crate::models::{cluster, Action, MetricSample, NewHealingRecord};
    use chrono::Utc;

    fn sample(cpu: f64, memory: f64) -> MetricSample {
        MetricSample {
            service_name: "api".to_string(),
            cpu,
            memory,
            network: 0.0,
            disk_io: 0.0,
            energy: 0.0,
            latency_ms: 0,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_empty_summary() {
        let summary = summarize(&[], &SampleTotals::default());
        assert_eq!(summary.total_healings, 0);
        assert_eq!(summary.high_risk_actions, 0);
        assert_eq!(summary.last_failure_time, NOT_AVAILABLE);
        assert_eq!(summary.last_action, NOT_AVAILABLE);
        assert_eq!(summary.average_cpu, 0.0);
        assert_eq!(summary.average_memory, 0.0);
        assert_eq!(summary.summary, "System running smoothly with no recovery actions.");
    }

    #[test]
    fn test_rounding_is_half_up() {
        assert_eq!(round2(10.125), 10.13);
        assert_eq!(round2(33.333333), 33.33);
        assert_eq!(round2(0.0), 0.0);
    }

    #[tokio::test]
    async fn test_summary_over_stores() {
        let ledger = Arc::new(MemoryLedger::new());
        let store = Arc::new(MemoryMetricsStore::default());

        for action in [
            Action::RestartService,
            Action::EnergyScaleDown,
            Action::EnergyStable,
            Action::NoAction,
        ] {
            ledger
                .append(NewHealingRecord::new("api", cluster::UNSCOPED, action))
                .await
                .unwrap();
        }
        store.record(sample(10.0, 100.0)).await.unwrap();
        store.record(sample(20.0, 200.0)).await.unwrap();
        store.record(sample(25.0, 250.5)).await.unwrap();

        let aggregator = InsightsAggregator::new(ledger.clone(), store);
        let summary = aggregator.summarize().await.unwrap();

        assert_eq!(summary.total_healings, 4);
        assert_eq!(summary.high_risk_actions, 2);
        assert_eq!(summary.last_action, "NO_ACTION");
        assert_eq!(summary.average_cpu, 18.33);
        assert_eq!(summary.average_memory, 183.5);
        assert_eq!(summary.summary, "System is stable with occasional recovery actions.");

        let newest = ledger.recent(1).await.unwrap();
        assert_eq!(summary.last_failure_time, newest[0].timestamp.to_rfc3339());
    }

    #[tokio::test]
    async fn test_averages_include_evicted_samples() {
        let ledger = Arc::new(MemoryLedger::new());
        let store = Arc::new(MemoryMetricsStore::new(DEFAULT_RETENTION, 3));
        for cpu in [10.0, 20.0, 30.0, 40.0, 50.0] {
            store.record(sample(cpu, 100.0)).await.unwrap();
        }

        let summary = InsightsAggregator::new(ledger, store.clone())
            .summarize()
            .await
            .unwrap();
        assert_eq!(store.len().await, 3);
        assert_eq!(summary.average_cpu, 30.0);
        assert_eq!(summary.average_memory, 100.0);
    }

    #[tokio::test]
    async fn test_frequent_high_risk_summary() {
        let ledger = Arc::new(MemoryLedger::new());
        for _ in 0..6 {
            ledger
                .append(NewHealingRecord::new("api", cluster::HIGH, Action::RestartService))
                .await
                .unwrap();
        }

        let aggregator = InsightsAggregator::new(ledger, Arc::new(MemoryMetricsStore::default()));
        let summary = aggregator.summarize().await.unwrap();
        assert_eq!(summary.high_risk_actions, 6);
        assert_eq!(
            summary.summary,
            "System experienced frequent high-risk failures. Energy optimization recommended."
        );
    }

    #[test]
    fn test_wire_names() {
        let value = serde_json::to_value(summarize(&[], &SampleTotals::default())).unwrap();
        assert!(value.get("averageCPU").is_some());
        assert!(value.get("averageMemory").is_some());
        assert!(value.get("totalHealings").is_some());
        assert!(value.get("lastFailureTime").is_some());
    }
}
