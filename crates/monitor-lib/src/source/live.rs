//! Live source backed by the Kubernetes API and metrics-server

use super::quantity::{parse_cpu_millicores, parse_memory_kib};
use super::{async_trait, MetricsSource};
use crate::error::{MonitorError, Result};
use crate::models::PodSnapshot;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ApiResource, DynamicObject, GroupVersionKind, ListParams};
use kube::Client;
use std::collections::HashMap;
use tracing::{debug, info, warn};

const METRICS_GROUP: &str = "metrics.k8s.io";
const METRICS_VERSION: &str = "v1beta1";

/// Current usage of one pod, summed over its containers
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct PodUsage {
    cpu_millicores: Option<u64>,
    memory_kib: Option<u64>,
}

/// Lists pods with the core API and joins them with metrics-server usage
pub struct KubeMetricsSource {
    client: Client,
}

impl KubeMetricsSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect using kubeconfig or in-cluster configuration
    pub async fn try_default() -> Result<Self> {
        let client = Client::try_default().await.map_err(MonitorError::source)?;
        Ok(Self::new(client))
    }

    /// Fetch current usage; metrics-server failures degrade to "no usage"
    async fn pod_usage(&self, namespace: &str) -> HashMap<String, PodUsage> {
        let gvk = GroupVersionKind::gvk(METRICS_GROUP, METRICS_VERSION, "PodMetrics");
        let resource = ApiResource::from_gvk_with_plural(&gvk, "pods");
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), namespace, &resource);

        match api.list(&ListParams::default()).await {
            Ok(list) => list
                .items
                .iter()
                .filter_map(|item| {
                    let name = item.metadata.name.clone()?;
                    Some((name, usage_from_metrics(&item.data)))
                })
                .collect(),
            Err(e) => {
                warn!(namespace = %namespace, error = %e, "Failed to fetch pod metrics");
                HashMap::new()
            }
        }
    }
}

#[async_trait]
impl MetricsSource for KubeMetricsSource {
    async fn snapshot(&self, namespace: &str) -> Result<Vec<PodSnapshot>> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let list = pods
            .list(&ListParams::default())
            .await
            .map_err(|e| MonitorError::source(format!("listing pods in {}: {}", namespace, e)))?;

        info!(namespace = %namespace, count = list.items.len(), "Fetched pods");
        if list.items.is_empty() {
            return Ok(Vec::new());
        }

        let usage = self.pod_usage(namespace).await;

        Ok(list
            .items
            .iter()
            .filter_map(|pod| {
                let pod_name = pod.metadata.name.clone()?;
                let phase = pod
                    .status
                    .as_ref()
                    .and_then(|s| s.phase.clone())
                    .unwrap_or_else(|| "Unknown".to_string());
                let current = usage.get(&pod_name).copied().unwrap_or_default();
                if current.cpu_millicores.is_none() {
                    debug!(pod_name = %pod_name, "No usage reported for pod");
                }

                Some(PodSnapshot {
                    deployment: owner_deployment(pod),
                    pod_name,
                    phase,
                    cpu_usage: current.cpu_millicores,
                    memory_usage: current.memory_kib,
                })
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "kubernetes"
    }
}

/// Sum container usage from a `PodMetrics` body
fn usage_from_metrics(data: &serde_json::Value) -> PodUsage {
    let containers = match data.get("containers").and_then(|c| c.as_array()) {
        Some(c) => c,
        None => return PodUsage::default(),
    };

    let mut usage = PodUsage::default();
    for container in containers {
        let Some(container_usage) = container.get("usage") else {
            continue;
        };
        if let Some(cpu) = container_usage
            .get("cpu")
            .and_then(|v| v.as_str())
            .and_then(parse_cpu_millicores)
        {
            usage.cpu_millicores = Some(usage.cpu_millicores.unwrap_or(0) + cpu);
        }
        if let Some(memory) = container_usage
            .get("memory")
            .and_then(|v| v.as_str())
            .and_then(parse_memory_kib)
        {
            usage.memory_kib = Some(usage.memory_kib.unwrap_or(0) + memory);
        }
    }
    usage
}

/// Resolve the deployment owning a pod through its ReplicaSet owner reference
pub fn owner_deployment(pod: &Pod) -> Option<String> {
    let owner = pod
        .metadata
        .owner_references
        .as_ref()?
        .iter()
        .find(|o| o.kind == "ReplicaSet")?;

    let hash = pod
        .metadata
        .labels
        .as_ref()
        .and_then(|l| l.get("pod-template-hash"));

    if let Some(hash) = hash {
        if let Some(name) = owner.name.strip_suffix(&format!("-{}", hash)) {
            return Some(name.to_string());
        }
    }

    owner
        .name
        .rsplit_once('-')
        .map(|(name, _)| name.to_string())
}
