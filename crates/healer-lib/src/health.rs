//! Component health behind `/healthz` and `/readyz`
//!
//! Components report the outcome of the operations they perform instead of
//! setting a status by hand. One failure degrades a component,
//! [`UNHEALTHY_AFTER`] failures in a row make it unhealthy and the next
//! success restores it. Caller mistakes (invalid input, unknown actions,
//! cancellation) never count against a component.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

use crate::error::{HealError, HealResult};

/// Consecutive failures after which a component is reported unhealthy
pub const UNHEALTHY_AFTER: u32 = 3;

/// Parts of the agent that report health
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Ledger,
    MetricsStore,
    ClusterClient,
    Sweeper,
}

impl Component {
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Ledger => "ledger",
            Component::MetricsStore => "metrics_store",
            Component::ClusterClient => "cluster_client",
            Component::Sweeper => "sweeper",
        }
    }

    /// Without these the agent cannot serve healing requests
    pub fn is_critical(&self) -> bool {
        matches!(self, Component::Ledger | Component::ClusterClient)
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    /// Last failure, cleared on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub consecutive_failures: u32,
    pub last_change: DateTime<Utc>,
}

impl ComponentHealth {
    fn healthy() -> Self {
        Self {
            status: ComponentStatus::Healthy,
            message: None,
            consecutive_failures: 0,
            last_change: Utc::now(),
        }
    }

    fn fail(&mut self, message: String) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        let status = if self.consecutive_failures >= UNHEALTHY_AFTER {
            ComponentStatus::Unhealthy
        } else {
            ComponentStatus::Degraded
        };
        if status != self.status {
            self.last_change = Utc::now();
        }
        self.status = status;
        self.message = Some(message);
    }

    fn recover(&mut self) {
        if self.status != ComponentStatus::Healthy {
            self.last_change = Utc::now();
        }
        self.status = ComponentStatus::Healthy;
        self.message = None;
        self.consecutive_failures = 0;
    }
}

/// Body of `/healthz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: BTreeMap<Component, ComponentHealth>,
}

impl HealthResponse {
    /// Unhealthy only when a critical component is; any other problem degrades
    pub fn compute_status(components: &BTreeMap<Component, ComponentHealth>) -> ComponentStatus {
        let mut status = ComponentStatus::Healthy;
        for (component, health) in components {
            match health.status {
                ComponentStatus::Unhealthy if component.is_critical() => {
                    return ComponentStatus::Unhealthy
                }
                ComponentStatus::Healthy => {}
                _ => status = ComponentStatus::Degraded,
            }
        }
        status
    }
}

/// Body of `/readyz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Default)]
struct RegistryState {
    components: BTreeMap<Component, ComponentHealth>,
    ready: bool,
}

/// Shared health state; clones see the same components
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a component as healthy
    pub async fn register(&self, component: Component) {
        self.state
            .write()
            .await
            .components
            .insert(component, ComponentHealth::healthy());
    }

    pub async fn record_success(&self, component: Component) {
        if let Some(health) = self.state.write().await.components.get_mut(&component) {
            health.recover();
        }
    }

    /// Count a failure; unregistered components are ignored
    pub async fn record_failure(&self, component: Component, message: impl Into<String>) {
        let mut state = self.state.write().await;
        let Some(health) = state.components.get_mut(&component) else {
            return;
        };
        let before = health.status;
        health.fail(message.into());
        if before != ComponentStatus::Unhealthy && health.status == ComponentStatus::Unhealthy {
            warn!(
                component = %component,
                failures = health.consecutive_failures,
                error = health.message.as_deref().unwrap_or_default(),
                "Component unhealthy"
            );
        }
    }

    /// Feed an operation result into the component's health
    pub async fn observe<T>(&self, component: Component, result: &HealResult<T>) {
        match result {
            Ok(_) => self.record_success(component).await,
            Err(e) if counts_against_component(e) => {
                self.record_failure(component, e.to_string()).await
            }
            Err(_) => {}
        }
    }

    pub async fn set_ready(&self, ready: bool) {
        self.state.write().await.ready = ready;
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.state.read().await.components.clone();
        let status = HealthResponse::compute_status(&components);
        HealthResponse { status, components }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let state = self.state.read().await;
        let reason = if !state.ready {
            Some("Agent not yet initialized".to_string())
        } else {
            state
                .components
                .iter()
                .find(|(c, h)| c.is_critical() && h.status == ComponentStatus::Unhealthy)
                .map(|(c, _)| format!("Component {} unhealthy", c))
        };

        ReadinessResponse {
            ready: reason.is_none(),
            reason,
        }
    }
}

fn counts_against_component(error: &HealError) -> bool {
    !matches!(
        error,
        HealError::InvalidInput(_) | HealError::UnknownAction(_) | HealError::Cancelled
    )
}
