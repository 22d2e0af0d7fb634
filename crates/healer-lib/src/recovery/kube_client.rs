//! kube-rs backed cluster client

use async_trait::async_trait;
use chrono::Utc;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, DeleteParams, ListParams, Patch, PatchParams};
use kube::Client;
use serde_json::json;
use tracing::debug;

use super::{pod_health, ClusterClient};
use crate::error::{HealError, HealResult};
use crate::models::PodHealth;

/// Annotation bumped to trigger a rolling restart
const RESTARTED_AT_ANNOTATION: &str = "kubectl.kubernetes.io/restartedAt";

pub struct KubeClusterClient {
    pods: Api<Pod>,
    deployments: Api<Deployment>,
}

impl KubeClusterClient {
    /// Connect using in-cluster config or the local kubeconfig.
    ///
    /// Without a namespace the client's default namespace is used.
    pub async fn connect(namespace: Option<&str>) -> HealResult<Self> {
        let client = Client::try_default()
            .await
            .map_err(|e| HealError::external("connect to cluster", e))?;
        Ok(Self::from_client(client, namespace))
    }

    pub fn from_client(client: Client, namespace: Option<&str>) -> Self {
        match namespace {
            Some(ns) => Self {
                pods: Api::namespaced(client.clone(), ns),
                deployments: Api::namespaced(client, ns),
            },
            None => Self {
                pods: Api::default_namespaced(client.clone()),
                deployments: Api::default_namespaced(client),
            },
        }
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn list_pods(&self, label_selector: &str) -> HealResult<Vec<String>> {
        let lp = ListParams::default().labels(label_selector);
        let pods = self
            .pods
            .list(&lp)
            .await
            .map_err(|e| HealError::external(format!("list pods {}", label_selector), e))?;

        Ok(pods
            .items
            .into_iter()
            .filter_map(|p| p.metadata.name)
            .collect())
    }

    async fn pod_status(&self, pod: &str) -> HealResult<PodHealth> {
        let pod_obj = self
            .pods
            .get(pod)
            .await
            .map_err(|e| HealError::external(format!("get pod {}", pod), e))?;
        Ok(pod_health(&pod_obj))
    }

    async fn delete_pod(&self, pod: &str) -> HealResult<()> {
        self.pods
            .delete(pod, &DeleteParams::default())
            .await
            .map_err(|e| HealError::external(format!("delete pod {}", pod), e))?;
        debug!(pod = %pod, "Pod deletion requested");
        Ok(())
    }

    async fn scale_deployment(&self, name: &str, replicas: i32) -> HealResult<()> {
        let patch = json!({ "spec": { "replicas": replicas } });
        self.deployments
            .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| HealError::external(format!("scale deployment {}", name), e))?;
        Ok(())
    }

    async fn restart_deployment(&self, name: &str) -> HealResult<()> {
        let patch = json!({
            "spec": {
                "template": {
                    "metadata": {
                        "annotations": { RESTARTED_AT_ANNOTATION: Utc::now().to_rfc3339() }
                    }
                }
            }
        });
        self.deployments
            .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| HealError::external(format!("restart deployment {}", name), e))?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "kube"
    }
}
