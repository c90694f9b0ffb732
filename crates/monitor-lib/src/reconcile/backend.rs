//! Autoscaler object stores

use crate::error::{MonitorError, Result};
use async_trait::async_trait;
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use kube::api::{Api, PostParams};
use kube::Client;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::debug;

/// Read and write access to autoscaler objects by (name, namespace)
#[async_trait]
pub trait HpaBackend: Send + Sync {
    /// `Ok(None)` when the object does not exist
    async fn get(&self, name: &str, namespace: &str) -> Result<Option<HorizontalPodAutoscaler>>;

    async fn create(&self, namespace: &str, hpa: &HorizontalPodAutoscaler) -> Result<()>;

    async fn replace(&self, name: &str, namespace: &str, hpa: &HorizontalPodAutoscaler)
        -> Result<()>;

    fn name(&self) -> &'static str;
}

/// `autoscaling/v2` objects through the Kubernetes API
pub struct KubeHpaBackend {
    client: Client,
}

impl KubeHpaBackend {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn try_default() -> Result<Self> {
        let client = Client::try_default()
            .await
            .map_err(|e| MonitorError::Config(format!("kubernetes client: {}", e)))?;
        Ok(Self::new(client))
    }

    fn api(&self, namespace: &str) -> Api<HorizontalPodAutoscaler> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl HpaBackend for KubeHpaBackend {
    async fn get(&self, name: &str, namespace: &str) -> Result<Option<HorizontalPodAutoscaler>> {
        match self.api(namespace).get(name).await {
            Ok(hpa) => Ok(Some(hpa)),
            Err(kube::Error::Api(e)) if e.code == 404 => {
                debug!(name = %name, namespace = %namespace, "Autoscaler not found");
                Ok(None)
            }
            Err(e) => Err(MonitorError::reconcile(name, namespace, e)),
        }
    }

    async fn create(&self, namespace: &str, hpa: &HorizontalPodAutoscaler) -> Result<()> {
        let name = hpa.metadata.name.as_deref().unwrap_or_default();
        self.api(namespace)
            .create(&PostParams::default(), hpa)
            .await
            .map_err(|e| MonitorError::reconcile(name, namespace, e))?;
        Ok(())
    }

    async fn replace(
        &self,
        name: &str,
        namespace: &str,
        hpa: &HorizontalPodAutoscaler,
    ) -> Result<()> {
        self.api(namespace)
            .replace(name, &PostParams::default(), hpa)
            .await
            .map_err(|e| MonitorError::reconcile(name, namespace, e))?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "kubernetes"
    }
}

/// Process-local store used in mock mode and tests
#[derive(Default)]
pub struct InMemoryHpaBackend {
    objects: Mutex<HashMap<(String, String), HorizontalPodAutoscaler>>,
    creates: AtomicUsize,
    replaces: AtomicUsize,
}

impl InMemoryHpaBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_calls(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn replace_calls(&self) -> usize {
        self.replaces.load(Ordering::SeqCst)
    }

    pub fn object(&self, name: &str, namespace: &str) -> Option<HorizontalPodAutoscaler> {
        self.objects
            .lock()
            .ok()?
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    fn insert(&self, name: &str, namespace: &str, hpa: &HorizontalPodAutoscaler) -> Result<()> {
        let mut objects = self
            .objects
            .lock()
            .map_err(|e| MonitorError::reconcile(name, namespace, e))?;
        objects.insert((namespace.to_string(), name.to_string()), hpa.clone());
        Ok(())
    }
}

#[async_trait]
impl HpaBackend for InMemoryHpaBackend {
    async fn get(&self, name: &str, namespace: &str) -> Result<Option<HorizontalPodAutoscaler>> {
        let objects = self
            .objects
            .lock()
            .map_err(|e| MonitorError::reconcile(name, namespace, e))?;
        Ok(objects
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn create(&self, namespace: &str, hpa: &HorizontalPodAutoscaler) -> Result<()> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        let name = hpa.metadata.name.clone().unwrap_or_default();
        if self.get(&name, namespace).await?.is_some() {
            return Err(MonitorError::reconcile(&name, namespace, "already exists"));
        }
        self.insert(&name, namespace, hpa)
    }

    async fn replace(
        &self,
        name: &str,
        namespace: &str,
        hpa: &HorizontalPodAutoscaler,
    ) -> Result<()> {
        self.replaces.fetch_add(1, Ordering::SeqCst);
        if self.get(name, namespace).await?.is_none() {
            return Err(MonitorError::reconcile(name, namespace, "not found"));
        }
        self.insert(name, namespace, hpa)
    }

    fn name(&self) -> &'static str {
        "in-memory"
    }
}
