//! Agent configuration
//!
//! Read from an optional config file (`HEALER_CONFIG`, default
//! `healer.toml`) overlaid with `HEALER_`-prefixed environment variables.

use anyhow::{bail, Context, Result};
use config::{builder::DefaultState, ConfigBuilder, Environment, File};
use healer_lib::{
    executor::{ExecutorConfig, ExecutorMode},
    metrics_store::MetricsStoreConfig,
    recovery::{DEFAULT_COMMAND_TIMEOUT, DEFAULT_MAX_CONCURRENCY},
    EnergyThresholds, SweepConfig, SweepMode,
};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Which cluster client the agent builds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterBackend {
    Kube,
    Kubectl,
    #[default]
    Disabled,
}

impl ClusterBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterBackend::Kube => "kube",
            ClusterBackend::Kubectl => "kubectl",
            ClusterBackend::Disabled => "disabled",
        }
    }
}

/// Agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Instance name used in structured logs
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// API server port
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// JSON-lines ledger file; the ledger is kept in memory when unset
    #[serde(default)]
    pub ledger_path: Option<PathBuf>,

    #[serde(default = "default_metrics_capacity")]
    pub metrics_capacity: usize,

    #[serde(default = "default_metrics_retention")]
    pub metrics_retention_secs: u64,

    #[serde(default = "default_low_cpu")]
    pub low_cpu_percent: f64,

    #[serde(default = "default_high_cpu")]
    pub high_cpu_percent: f64,

    #[serde(default = "default_low_memory")]
    pub low_memory_mb: f64,

    #[serde(default)]
    pub executor_mode: ExecutorMode,

    #[serde(default = "default_scale_up_replicas")]
    pub scale_up_replicas: i32,

    #[serde(default = "default_scale_down_replicas")]
    pub scale_down_replicas: i32,

    #[serde(default)]
    pub cluster_backend: ClusterBackend,

    /// Namespace for pod and deployment operations
    #[serde(default)]
    pub namespace: Option<String>,

    #[serde(default = "default_kubectl_path")]
    pub kubectl_path: PathBuf,

    #[serde(default)]
    pub kubeconfig: Option<PathBuf>,

    /// Bound on a single cluster call in seconds
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    #[serde(default = "default_sweep_concurrency")]
    pub sweep_max_concurrency: usize,

    /// Periodic sweep interval in seconds; 0 disables the sweep loop
    #[serde(default)]
    pub sweep_interval_secs: u64,

    /// App labels swept by the periodic loop
    #[serde(default)]
    pub sweep_labels: Vec<String>,

    #[serde(default = "default_sweep_mode")]
    pub sweep_mode: SweepMode,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "healer".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_metrics_capacity() -> usize {
    10_000
}

fn default_metrics_retention() -> u64 {
    24 * 60 * 60
}

fn default_low_cpu() -> f64 {
    healer_lib::decision::DEFAULT_LOW_CPU_PERCENT
}

fn default_high_cpu() -> f64 {
    healer_lib::decision::DEFAULT_HIGH_CPU_PERCENT
}

fn default_low_memory() -> f64 {
    healer_lib::decision::DEFAULT_LOW_MEMORY_MB
}

fn default_scale_up_replicas() -> i32 {
    healer_lib::executor::DEFAULT_SCALE_UP_REPLICAS
}

fn default_scale_down_replicas() -> i32 {
    healer_lib::executor::DEFAULT_SCALE_DOWN_REPLICAS
}

fn default_kubectl_path() -> PathBuf {
    PathBuf::from("kubectl")
}

fn default_command_timeout() -> u64 {
    DEFAULT_COMMAND_TIMEOUT.as_secs()
}

fn default_sweep_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

fn default_sweep_mode() -> SweepMode {
    SweepMode::Stuck
}

impl AgentConfig {
    /// Load configuration from the config file and environment
    pub fn load() -> Result<Self> {
        let path = std::env::var("HEALER_CONFIG").unwrap_or_else(|_| "healer.toml".to_string());
        let builder = config::Config::builder()
            .add_source(File::with_name(&path).required(false))
            .add_source(
                Environment::with_prefix("HEALER")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("sweep_labels"),
            );
        Self::build(builder)
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let config: AgentConfig = builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.low_cpu_percent > self.high_cpu_percent {
            bail!(
                "low_cpu_percent ({}) must not exceed high_cpu_percent ({})",
                self.low_cpu_percent,
                self.high_cpu_percent
            );
        }
        if self.scale_up_replicas < 0 || self.scale_down_replicas < 0 {
            bail!("replica counts must not be negative");
        }
        if self.command_timeout_secs == 0 {
            bail!("command_timeout_secs must be at least 1");
        }
        if self.sweep_max_concurrency == 0 {
            bail!("sweep_max_concurrency must be at least 1");
        }
        if self.executor_mode == ExecutorMode::Cluster
            && self.cluster_backend == ClusterBackend::Disabled
        {
            bail!("executor_mode = cluster requires a cluster_backend");
        }
        if self.sweep_interval_secs > 0 {
            if self.cluster_backend == ClusterBackend::Disabled {
                bail!("periodic sweeps require a cluster_backend");
            }
            if self.sweep_labels.is_empty() {
                bail!("periodic sweeps require at least one entry in sweep_labels");
            }
        }
        Ok(())
    }

    pub fn thresholds(&self) -> EnergyThresholds {
        EnergyThresholds {
            low_cpu_percent: self.low_cpu_percent,
            high_cpu_percent: self.high_cpu_percent,
            low_memory_mb: self.low_memory_mb,
        }
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            mode: self.executor_mode,
            scale_up_replicas: self.scale_up_replicas,
            scale_down_replicas: self.scale_down_replicas,
        }
    }

    pub fn sweep_config(&self) -> SweepConfig {
        SweepConfig {
            command_timeout: Duration::from_secs(self.command_timeout_secs),
            max_concurrency: self.sweep_max_concurrency,
        }
    }

    pub fn metrics_store_config(&self) -> MetricsStoreConfig {
        MetricsStoreConfig {
            max_retention: Duration::from_secs(self.metrics_retention_secs),
            max_size: self.metrics_capacity,
        }
    }

    /// Sweep loop interval, when periodic sweeps are enabled
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn from_toml(toml: &str) -> Result<AgentConfig> {
        AgentConfig::build(
            config::Config::builder().add_source(File::from_str(toml, FileFormat::Toml)),
        )
    }

    #[test]
    fn test_defaults() {
        let config = from_toml("").unwrap();
        assert_eq!(config.api_port, 8080);
        assert_eq!(config.ledger_path, None);
        assert_eq!(config.metrics_capacity, 10_000);
        assert_eq!(config.thresholds(), EnergyThresholds::default());
        assert_eq!(config.executor_mode, ExecutorMode::Simulate);
        assert_eq!(config.cluster_backend, ClusterBackend::Disabled);
        assert_eq!(config.sweep_config().command_timeout, Duration::from_secs(30));
        assert_eq!(config.sweep_config().max_concurrency, 8);
        assert_eq!(config.sweep_interval(), None);
    }

    #[test]
    fn test_file_overrides() {
        let config = from_toml(
            r#"
            api_port = 9090
            ledger_path = "/var/lib/healer/ledger.jsonl"
            low_cpu_percent = 20.0
            executor_mode = "cluster"
            cluster_backend = "kubectl"
            namespace = "prod"
            sweep_interval_secs = 60
            sweep_labels = ["payments", "orders"]
            sweep_mode = "unready"
            "#,
        )
        .unwrap();

        assert_eq!(config.api_port, 9090);
        assert_eq!(config.thresholds().low_cpu_percent, 20.0);
        assert_eq!(config.executor_config().mode, ExecutorMode::Cluster);
        assert_eq!(config.cluster_backend, ClusterBackend::Kubectl);
        assert_eq!(config.namespace.as_deref(), Some("prod"));
        assert_eq!(config.sweep_interval(), Some(Duration::from_secs(60)));
        assert_eq!(config.sweep_labels, vec!["payments", "orders"]);
        assert_eq!(config.sweep_mode, SweepMode::Unready);
    }

    #[test]
    fn test_cluster_executor_needs_backend() {
        let err = from_toml(r#"executor_mode = "cluster""#).unwrap_err();
        assert!(err.to_string().contains("cluster_backend"));
    }

    #[test]
    fn test_sweeps_need_labels() {
        let err = from_toml(
            r#"
            cluster_backend = "kube"
            sweep_interval_secs = 30
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("sweep_labels"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = from_toml("command_timeout_secs = 0").unwrap_err();
        assert!(err.to_string().contains("command_timeout_secs"));
    }

    #[test]
    fn test_zero_sweep_concurrency_rejected() {
        let err = from_toml("sweep_max_concurrency = 0").unwrap_err();
        assert!(err.to_string().contains("sweep_max_concurrency"));
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        assert!(from_toml("low_cpu_percent = 80.0\nhigh_cpu_percent = 70.0").is_err());
    }
}
