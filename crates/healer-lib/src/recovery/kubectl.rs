//! kubectl backed cluster client
//!
//! Spawns `kubectl` directly (no shell) and parses its `-o json` output into
//! `k8s-openapi` types. A non-zero exit, spawn failure or unparseable output
//! is reported as an external command failure.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use super::{pod_health, ClusterClient};
use crate::error::{HealError, HealResult};
use crate::models::PodHealth;

#[derive(Debug, Deserialize)]
struct PodList {
    #[serde(default)]
    items: Vec<Pod>,
}

#[derive(Debug, Clone)]
pub struct KubectlClient {
    program: PathBuf,
    namespace: Option<String>,
    kubeconfig: Option<PathBuf>,
}

impl Default for KubectlClient {
    fn default() -> Self {
        Self::new("kubectl")
    }
}

impl KubectlClient {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            namespace: None,
            kubeconfig: None,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_kubeconfig(mut self, path: impl Into<PathBuf>) -> Self {
        self.kubeconfig = Some(path.into());
        self
    }

    /// Run kubectl and return stdout on success
    async fn run(&self, operation: &str, args: &[&str]) -> HealResult<Vec<u8>> {
        let mut cmd = Command::new(&self.program);
        if let Some(kubeconfig) = &self.kubeconfig {
            cmd.arg("--kubeconfig").arg(kubeconfig);
        }
        if let Some(namespace) = &self.namespace {
            cmd.arg("-n").arg(namespace);
        }
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(operation = %operation, args = ?args, "Running kubectl");

        let output = cmd.output().await.map_err(|e| {
            HealError::external(
                operation,
                format!("failed to spawn {}: {}", self.program.display(), e),
            )
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(HealError::external(
                operation,
                format!("{}: {}", output.status, stderr.trim()),
            ));
        }

        Ok(output.stdout)
    }
}

fn parse_pod_list(operation: &str, stdout: &[u8]) -> HealResult<Vec<String>> {
    let list: PodList = serde_json::from_slice(stdout)
        .map_err(|e| HealError::external(operation, format!("unparseable output: {}", e)))?;
    Ok(list
        .items
        .into_iter()
        .filter_map(|p| p.metadata.name)
        .collect())
}

fn parse_pod(operation: &str, stdout: &[u8]) -> HealResult<PodHealth> {
    let pod: Pod = serde_json::from_slice(stdout)
        .map_err(|e| HealError::external(operation, format!("unparseable output: {}", e)))?;
    Ok(pod_health(&pod))
}

#[async_trait]
impl ClusterClient for KubectlClient {
    async fn list_pods(&self, label_selector: &str) -> HealResult<Vec<String>> {
        let operation = format!("list pods {}", label_selector);
        let stdout = self
            .run(&operation, &["get", "pods", "-l", label_selector, "-o", "json"])
            .await?;
        parse_pod_list(&operation, &stdout)
    }

    async fn pod_status(&self, pod: &str) -> HealResult<PodHealth> {
        let operation = format!("get pod {}", pod);
        let stdout = self.run(&operation, &["get", "pod", pod, "-o", "json"]).await?;
        parse_pod(&operation, &stdout)
    }

    async fn delete_pod(&self, pod: &str) -> HealResult<()> {
        self.run(&format!("delete pod {}", pod), &["delete", "pod", pod, "--wait=false"])
            .await?;
        Ok(())
    }

    async fn scale_deployment(&self, name: &str, replicas: i32) -> HealResult<()> {
        let replicas = format!("--replicas={}", replicas);
        self.run(
            &format!("scale deployment {}", name),
            &["scale", "deployment", name, &replicas],
        )
        .await?;
        Ok(())
    }

    async fn restart_deployment(&self, name: &str) -> HealResult<()> {
        self.run(
            &format!("restart deployment {}", name),
            &["rollout", "restart", "deployment", name],
        )
        .await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "kubectl"
    }
}
