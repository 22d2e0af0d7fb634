//! Kubernetes recovery
//!
//! Label-scoped pod sweeps that evict crash-looping or unready pods, plus
//! scale and restart primitives for deployments. Cluster access goes through
//! the [`ClusterClient`] port; two adapters are provided:
//! - [`KubeClusterClient`]: kube-rs API client (in-cluster or kubeconfig)
//! - [`KubectlClient`]: spawns `kubectl` and parses its JSON output

mod kube_client;
mod kubectl;
mod pod;
mod sweep;

pub use kube_client::KubeClusterClient;
pub use kubectl::KubectlClient;
pub use pod::{is_stuck_reason, pod_health, STUCK_WAITING_REASONS};
#[cfg(test)]
pub(crate) use sweep::mock;
pub use sweep::{
    selector_for, PodFailure, RecoverySweep, SweepConfig, SweepMode, SweepReport,
    DEFAULT_COMMAND_TIMEOUT, DEFAULT_MAX_CONCURRENCY,
};

use async_trait::async_trait;

use crate::error::HealResult;
use crate::models::PodHealth;

/// Typed access to the cluster, scoped to one namespace
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Names of pods matching a label selector
    async fn list_pods(&self, label_selector: &str) -> HealResult<Vec<String>>;

    /// Live health of a single pod
    async fn pod_status(&self, pod: &str) -> HealResult<PodHealth>;

    async fn delete_pod(&self, pod: &str) -> HealResult<()>;

    async fn scale_deployment(&self, name: &str, replicas: i32) -> HealResult<()>;

    /// Trigger a rolling restart of a deployment
    async fn restart_deployment(&self, name: &str) -> HealResult<()>;

    /// Backend name for logs and health reporting
    fn backend(&self) -> &'static str;
}
