//! Healer Agent - energy-aware self-healing control loop
//!
//! Serves the healing control API, executes decided actions and runs
//! periodic Kubernetes recovery sweeps.

use anyhow::{Context, Result};
use healer_agent::{
    api,
    config::{AgentConfig, ClusterBackend},
    sweeper::{SweepLoop, SweepLoopConfig},
};
use healer_lib::{
    health::{Component, HealthRegistry},
    observability::{HealerMetrics, StructuredLogger},
    recovery::{KubeClusterClient, KubectlClient},
    ActionExecutor, ClusterClient, EnergyRuleEngine, FileLedger, HealingDecisionEngine,
    HealingLedger, HealingPipeline, InsightsAggregator, MemoryLedger, MemoryMetricsStore,
    MetricsStore, RecoverySweep,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting healer-agent");

    let config = AgentConfig::load()?;
    info!(
        instance = %config.instance_name,
        executor_mode = %config.executor_mode.as_str(),
        cluster_backend = %config.cluster_backend.as_str(),
        "Agent configured"
    );

    let health_registry = HealthRegistry::new();
    let metrics = HealerMetrics::new();
    let logger = StructuredLogger::new(&config.instance_name);

    // Storage
    let ledger: Arc<dyn HealingLedger> = match &config.ledger_path {
        Some(path) => Arc::new(
            FileLedger::open(path)
                .await
                .with_context(|| format!("Failed to open ledger at {}", path.display()))?,
        ),
        None => Arc::new(MemoryLedger::new()),
    };
    health_registry.register(Component::Ledger).await;

    let metrics_store: Arc<dyn MetricsStore> =
        Arc::new(MemoryMetricsStore::with_config(config.metrics_store_config()));
    health_registry.register(Component::MetricsStore).await;

    // Cluster access
    let cluster_client: Option<Arc<dyn ClusterClient>> = match config.cluster_backend {
        ClusterBackend::Kube => Some(Arc::new(
            KubeClusterClient::connect(config.namespace.as_deref())
                .await
                .context("Failed to connect to Kubernetes")?,
        )),
        ClusterBackend::Kubectl => {
            let mut client = KubectlClient::new(&config.kubectl_path);
            if let Some(namespace) = &config.namespace {
                client = client.with_namespace(namespace);
            }
            if let Some(kubeconfig) = &config.kubeconfig {
                client = client.with_kubeconfig(kubeconfig);
            }
            Some(Arc::new(client))
        }
        ClusterBackend::Disabled => None,
    };

    if cluster_client.is_some() {
        health_registry.register(Component::ClusterClient).await;
    }
    let recovery = cluster_client.map(|client| {
        Arc::new(
            RecoverySweep::new(client, config.sweep_config(), logger.clone(), metrics.clone())
                .with_health(health_registry.clone()),
        )
    });

    // Decision and execution
    let engine = HealingDecisionEngine::new(EnergyRuleEngine::new(config.thresholds()));
    let executor = Arc::new(ActionExecutor::new(
        config.executor_config(),
        recovery.clone(),
        logger.clone(),
        metrics.clone(),
    ));
    let pipeline = Arc::new(HealingPipeline::new(
        engine,
        executor,
        ledger.clone(),
        metrics_store.clone(),
        health_registry.clone(),
        logger.clone(),
        metrics.clone(),
    ));
    let insights = Arc::new(InsightsAggregator::new(ledger.clone(), metrics_store.clone()));

    logger.log_startup(AGENT_VERSION, config.cluster_backend.as_str());

    let shutdown = CancellationToken::new();

    // Periodic recovery sweeps
    let sweep_handle = match (config.sweep_interval(), &recovery) {
        (Some(interval), Some(recovery)) => {
            health_registry.register(Component::Sweeper).await;
            let sweep_loop = SweepLoop::new(
                recovery.clone(),
                health_registry.clone(),
                SweepLoopConfig {
                    interval,
                    app_labels: config.sweep_labels.clone(),
                    mode: config.sweep_mode,
                },
            );
            Some(tokio::spawn(sweep_loop.run(shutdown.clone())))
        }
        _ => None,
    };

    let app_state = Arc::new(api::AppState {
        health_registry: health_registry.clone(),
        pipeline,
        ledger,
        metrics_store,
        insights,
        recovery,
        shutdown: shutdown.clone(),
        version: AGENT_VERSION.to_string(),
    });

    // Mark agent as ready after initialization
    health_registry.set_ready(true).await;

    let api_handle = tokio::spawn(api::serve(config.api_port, app_state, shutdown.clone()));

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");
    health_registry.set_ready(false).await;
    shutdown.cancel();

    if let Some(handle) = sweep_handle {
        if let Err(e) = handle.await {
            error!(error = %e, "Sweep loop task failed");
        }
    }
    match api_handle.await {
        Ok(Err(e)) => error!(error = %e, "API server failed"),
        Err(e) => error!(error = %e, "API server task failed"),
        Ok(Ok(())) => {}
    }

    info!("Shutdown complete");
    Ok(())
}
