//! Energy-aware self-healing library
//!
//! This crate provides the core functionality for:
//! - Energy and failure-priority healing decisions
//! - Action execution (simulated or against the cluster)
//! - Kubernetes recovery sweeps for stuck and unready pods
//! - The append-only healing ledger and the metric sample store
//! - Insights and CSV reports
//! - Health checks and observability

pub mod decision;
pub mod error;
pub mod executor;
pub mod health;
pub mod insights;
pub mod ledger;
pub mod metrics_store;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod recovery;
pub mod report;

pub use decision::{EnergyRuleEngine, EnergyThresholds, HealingDecisionEngine};
pub use error::{HealError, HealResult};
pub use executor::{ActionExecutor, ActionOutcome, ExecutorConfig, ExecutorMode};
pub use health::{
    Component, ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse,
    ReadinessResponse,
};
pub use insights::{InsightsAggregator, InsightsSummary};
pub use ledger::{FileLedger, HealingLedger, MemoryLedger};
pub use metrics_store::{MemoryMetricsStore, MetricsStore, SampleTotals};
pub use models::*;
pub use observability::{HealerMetrics, StructuredLogger};
pub use pipeline::{Alert, AlertOutcome, HealingPipeline};
pub use recovery::{ClusterClient, RecoverySweep, SweepConfig, SweepMode, SweepReport};
