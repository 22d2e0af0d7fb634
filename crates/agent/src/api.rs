//! HTTP API: healing control, reports, Kubernetes recovery, health and metrics

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use healer_lib::{
    health::{ComponentStatus, HealthRegistry},
    report, Alert, HealError, HealingLedger, HealingPipeline, InsightsAggregator, MetricSample,
    MetricsStore, RecoverySweep, SweepMode,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Default page size for list endpoints
const DEFAULT_LIMIT: usize = 10;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub pipeline: Arc<HealingPipeline>,
    pub ledger: Arc<dyn HealingLedger>,
    pub metrics_store: Arc<dyn MetricsStore>,
    pub insights: Arc<InsightsAggregator>,
    /// Absent when no cluster backend is configured
    pub recovery: Option<Arc<RecoverySweep>>,
    /// Cancels on-demand sweeps at shutdown
    pub shutdown: CancellationToken,
    pub version: String,
}

impl AppState {
    fn recovery(&self) -> Result<&RecoverySweep, ApiError> {
        self.recovery
            .as_deref()
            .ok_or(ApiError(HealError::ClusterUnavailable))
    }
}

/// `HealError` rendered as `{error, code}` with a matching status
#[derive(Debug)]
pub struct ApiError(pub HealError);

impl From<HealError> for ApiError {
    fn from(err: HealError) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(HealError::invalid_input(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError(HealError::invalid_input(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            HealError::InvalidInput(_) | HealError::UnknownAction(_) => StatusCode::BAD_REQUEST,
            HealError::ExternalCommand { .. } => StatusCode::BAD_GATEWAY,
            HealError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            HealError::Cancelled | HealError::ClusterUnavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            HealError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(code = self.0.code(), error = %self.0, "Request failed");
        }

        (
            status,
            Json(json!({ "error": self.0.to_string(), "code": self.0.code() })),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Deserialize)]
pub struct AutoHealRequest {
    pub service: String,
    pub prediction: String,
    pub cpu: f64,
    pub memory: f64,
}

#[derive(Debug, Deserialize)]
pub struct ManualHealRequest {
    pub service: String,
    pub action: String,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

/// Metric sample as pushed by agents; only the timestamp is optional
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSampleRequest {
    pub service_name: String,
    pub cpu: f64,
    pub memory: f64,
    pub network: f64,
    #[serde(rename = "diskIO")]
    pub disk_io: f64,
    pub energy: f64,
    pub latency_ms: u64,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl From<MetricSampleRequest> for MetricSample {
    fn from(req: MetricSampleRequest) -> Self {
        MetricSample {
            service_name: req.service_name,
            cpu: req.cpu,
            memory: req.memory,
            network: req.network,
            disk_io: req.disk_io,
            energy: req.energy,
            latency_ms: req.latency_ms,
            timestamp: req.timestamp.unwrap_or_else(Utc::now),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PodsQuery {
    pub app: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepRequest {
    pub app_label: String,
    pub mode: SweepMode,
}

#[derive(Debug, Deserialize)]
pub struct ScaleRequest {
    pub replicas: i32,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    status: &'static str,
    message: &'static str,
    timestamp: String,
    version: String,
}

async fn receive_alert(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Alert>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(alert) = payload?;
    Ok(Json(state.pipeline.handle_alert(alert).await?))
}

async fn auto_heal(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AutoHealRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    let outcome = state
        .pipeline
        .auto_heal(&req.service, &req.prediction, req.cpu, req.memory)
        .await?;
    Ok(Json(outcome))
}

async fn manual_heal(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ManualHealRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    let outcome = state.pipeline.manual_heal(&req.service, &req.action).await?;
    Ok(Json(outcome))
}

async fn healing_logs(
    State(state): State<Arc<AppState>>,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(query) = query?;
    let records = state
        .ledger
        .recent(query.limit.unwrap_or(DEFAULT_LIMIT))
        .await?;
    Ok(Json(records))
}

async fn ingest_metric(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MetricSampleRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    let sample = MetricSample::from(req);
    state.pipeline.record_sample(sample.clone()).await?;
    Ok((StatusCode::CREATED, Json(sample)))
}

async fn recent_metrics(
    State(state): State<Arc<AppState>>,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(query) = query?;
    let samples = state
        .metrics_store
        .recent(query.limit.unwrap_or(DEFAULT_LIMIT))
        .await?;
    Ok(Json(samples))
}

async fn insights(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.insights.summarize().await?))
}

fn csv_response(filename: &str, body: String) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", filename),
            ),
        ],
        body,
    )
        .into_response()
}

async fn healing_csv(State(state): State<Arc<AppState>>) -> ApiResult<Response> {
    let records = state.ledger.all().await?;
    Ok(csv_response(
        report::HEALING_CSV_FILENAME,
        report::healing_csv(&records),
    ))
}

async fn metrics_csv(State(state): State<Arc<AppState>>) -> ApiResult<Response> {
    let samples = state.metrics_store.all().await?;
    Ok(csv_response(
        report::METRICS_CSV_FILENAME,
        report::metrics_csv(&samples),
    ))
}

async fn list_pods(
    State(state): State<Arc<AppState>>,
    query: Result<Query<PodsQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(query) = query?;
    let pods = state.recovery()?.list_pod_health(&query.app).await?;
    Ok(Json(pods))
}

async fn sweep(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SweepRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    let cancel = state.shutdown.child_token();
    let report = state
        .recovery()?
        .sweep(&req.app_label, req.mode, &cancel)
        .await?;
    Ok(Json(report))
}

async fn scale_deployment(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    payload: Result<Json<ScaleRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    state
        .recovery()?
        .scale_deployment(&name, req.replicas)
        .await?;
    info!(deployment = %name, replicas = req.replicas, "Deployment scaled");
    Ok(Json(json!({ "deployment": name, "replicas": req.replicas })))
}

async fn restart_deployment(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.recovery()?.restart_deployment(&name).await?;
    info!(deployment = %name, "Deployment restart requested");
    Ok(Json(json!({ "deployment": name })))
}

/// Liveness of the control API itself; never consults downstream components
async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(StatusResponse {
        status: "UP",
        message: "Healer is running",
        timestamp: Utc::now().to_rfc3339(),
        version: state.version.clone(),
    })
}

/// Health check response - returns 200 if healthy, 503 if degraded/unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/alerts", post(receive_alert))
        .route("/api/healing/auto", post(auto_heal))
        .route("/api/healing/manual", post(manual_heal))
        .route("/api/healing/logs", get(healing_logs))
        .route("/api/metrics", post(ingest_metric))
        .route("/api/metrics/recent", get(recent_metrics))
        .route("/api/reports/insights", get(insights))
        .route("/api/reports/healing/csv", get(healing_csv))
        .route("/api/reports/metrics/csv", get(metrics_csv))
        .route("/api/k8s/pods", get(list_pods))
        .route("/api/k8s/sweep", post(sweep))
        .route("/api/k8s/deployments/:name/scale", post(scale_deployment))
        .route("/api/k8s/deployments/:name/restart", post(restart_deployment))
        .route("/api/status", get(status))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server; returns once `shutdown` fires and requests drain
pub async fn serve(port: u16, state: Arc<AppState>, shutdown: CancellationToken) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    Ok(())
}
