//! Action execution
//!
//! Turns a decided action into its side effect and a fixed human-readable
//! result. In simulate mode the effect is a log event and a counter; in
//! cluster mode restart and scale actions are also applied to the service's
//! deployment through the recovery primitives.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{HealError, HealResult};
use crate::models::Action;
use crate::observability::{HealerMetrics, StructuredLogger};
use crate::recovery::RecoverySweep;

pub const DEFAULT_SCALE_UP_REPLICAS: i32 = 3;
pub const DEFAULT_SCALE_DOWN_REPLICAS: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorMode {
    /// Log and count only
    #[default]
    Simulate,
    /// Apply restart and scale actions to deployments
    Cluster,
}

impl ExecutorMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutorMode::Simulate => "simulate",
            ExecutorMode::Cluster => "cluster",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    pub mode: ExecutorMode,
    pub scale_up_replicas: i32,
    pub scale_down_replicas: i32,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            mode: ExecutorMode::Simulate,
            scale_up_replicas: DEFAULT_SCALE_UP_REPLICAS,
            scale_down_replicas: DEFAULT_SCALE_DOWN_REPLICAS,
        }
    }
}

/// Result of executing one action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub service: String,
    pub action: Action,
    pub result: String,
}

/// Fixed result text per action
pub fn result_message(action: Action) -> &'static str {
    match action {
        Action::RestartService => "Service restarted",
        Action::EnergyScaleDown => "Scaled down to save energy",
        Action::EnergyScaleUp => "Scaled up for predicted load",
        Action::EnergyStable => "Energy stable",
        Action::NoAction => "No action required",
    }
}

pub struct ActionExecutor {
    config: ExecutorConfig,
    recovery: Option<Arc<RecoverySweep>>,
    logger: StructuredLogger,
    metrics: HealerMetrics,
}

impl ActionExecutor {
    pub fn new(
        config: ExecutorConfig,
        recovery: Option<Arc<RecoverySweep>>,
        logger: StructuredLogger,
        metrics: HealerMetrics,
    ) -> Self {
        Self {
            config,
            recovery,
            logger,
            metrics,
        }
    }

    /// Executor that only logs, with default settings
    pub fn simulated(logger: StructuredLogger, metrics: HealerMetrics) -> Self {
        Self::new(ExecutorConfig::default(), None, logger, metrics)
    }

    pub fn mode(&self) -> ExecutorMode {
        self.config.mode
    }

    /// Execute an action against a service.
    ///
    /// Not idempotent: every call performs the effect again.
    pub async fn execute_action(&self, service: &str, action: Action) -> HealResult<ActionOutcome> {
        if self.config.mode == ExecutorMode::Cluster {
            self.apply_to_cluster(service, action).await?;
        }

        let result = result_message(action);
        self.logger
            .log_action_executed(service, action, result, self.config.mode.as_str());
        self.metrics.inc_action_executed(action);

        Ok(ActionOutcome {
            service: service.to_string(),
            action,
            result: result.to_string(),
        })
    }

    /// Execute a raw action name; unrecognized names run as `NO_ACTION`
    pub async fn execute_raw(&self, service: &str, raw_action: &str) -> HealResult<ActionOutcome> {
        let action = match raw_action.parse::<Action>() {
            Ok(action) => action,
            Err(_) => {
                self.logger.log_unknown_action(service, raw_action);
                Action::NoAction
            }
        };
        self.execute_action(service, action).await
    }

    async fn apply_to_cluster(&self, service: &str, action: Action) -> HealResult<()> {
        let replicas = match action {
            Action::RestartService => None,
            Action::EnergyScaleUp => Some(self.config.scale_up_replicas),
            Action::EnergyScaleDown => Some(self.config.scale_down_replicas),
            Action::EnergyStable | Action::NoAction => return Ok(()),
        };

        let recovery = self.recovery.as_ref().ok_or(HealError::ClusterUnavailable)?;
        match replicas {
            Some(replicas) => recovery.scale_deployment(service, replicas).await,
            None => recovery.restart_deployment(service).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recovery::mock::MockCluster;
    use crate::recovery::SweepConfig;

    fn logger() -> StructuredLogger {
        StructuredLogger::new("test")
    }

    fn cluster_executor(cluster: Arc<MockCluster>) -> ActionExecutor {
        let recovery = RecoverySweep::new(
            cluster,
            SweepConfig::default(),
            logger(),
            HealerMetrics::new(),
        );
        ActionExecutor::new(
            ExecutorConfig {
                mode: ExecutorMode::Cluster,
                ..Default::default()
            },
            Some(Arc::new(recovery)),
            logger(),
            HealerMetrics::new(),
        )
    }

    #[tokio::test]
    async fn test_result_strings() {
        let executor = ActionExecutor::simulated(logger(), HealerMetrics::new());
        let expected = [
            (Action::RestartService, "Service restarted"),
            (Action::EnergyScaleDown, "Scaled down to save energy"),
            (Action::EnergyScaleUp, "Scaled up for predicted load"),
            (Action::EnergyStable, "Energy stable"),
            (Action::NoAction, "No action required"),
        ];

        for (action, result) in expected {
            let outcome = executor.execute_action("api", action).await.unwrap();
            assert_eq!(outcome.service, "api");
            assert_eq!(outcome.action, action);
            assert_eq!(outcome.result, result);
        }
    }

    #[tokio::test]
    async fn test_unknown_raw_action_is_noop() {
        let executor = ActionExecutor::simulated(logger(), HealerMetrics::new());
        let outcome = executor.execute_raw("api", "REBOOT_EVERYTHING").await.unwrap();
        assert_eq!(outcome.action, Action::NoAction);
        assert_eq!(outcome.result, "No action required");

        let outcome = executor.execute_raw("api", "energy_scale_up").await.unwrap();
        assert_eq!(outcome.action, Action::EnergyScaleUp);
    }

    #[tokio::test]
    async fn test_cluster_mode_drives_deployments() {
        let cluster = Arc::new(MockCluster::default());
        let executor = cluster_executor(cluster.clone());

        executor.execute_action("payments", Action::RestartService).await.unwrap();
        executor.execute_action("payments", Action::EnergyScaleUp).await.unwrap();
        executor.execute_action("payments", Action::EnergyScaleDown).await.unwrap();
        executor.execute_action("payments", Action::EnergyStable).await.unwrap();
        executor.execute_action("payments", Action::NoAction).await.unwrap();

        assert_eq!(*cluster.restarted.lock().unwrap(), vec!["payments".to_string()]);
        assert_eq!(
            *cluster.scaled.lock().unwrap(),
            vec![
                ("payments".to_string(), DEFAULT_SCALE_UP_REPLICAS),
                ("payments".to_string(), DEFAULT_SCALE_DOWN_REPLICAS),
            ]
        );
    }

    #[tokio::test]
    async fn test_repeated_calls_repeat_the_effect() {
        let cluster = Arc::new(MockCluster::default());
        let executor = cluster_executor(cluster.clone());

        executor.execute_action("payments", Action::RestartService).await.unwrap();
        executor.execute_action("payments", Action::RestartService).await.unwrap();
        assert_eq!(cluster.restarted.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_cluster_mode_without_backend() {
        let executor = ActionExecutor::new(
            ExecutorConfig {
                mode: ExecutorMode::Cluster,
                ..Default::default()
            },
            None,
            logger(),
            HealerMetrics::new(),
        );

        let err = executor
            .execute_action("payments", Action::RestartService)
            .await
            .unwrap_err();
        assert!(matches!(err, HealError::ClusterUnavailable));

        // Stable needs no cluster access
        assert!(executor.execute_action("payments", Action::EnergyStable).await.is_ok());
    }
}
