//! Pod and usage snapshots from the cluster
//!
//! Two interchangeable sources sit behind [`MetricsSource`]: a live adapter
//! backed by the Kubernetes API and metrics-server, and a deterministic mock
//! that returns a fixed two-pod fixture. The choice is made once, at
//! construction time.

mod live;
mod mock;
mod quantity;

pub use live::{owner_deployment, KubeMetricsSource};
pub use mock::MockMetricsSource;
pub use quantity::{parse_cpu_millicores, parse_memory_kib};

use crate::error::Result;
use crate::models::PodSnapshot;
use std::sync::Arc;

pub use async_trait::async_trait;

/// Source of per-namespace pod snapshots
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// List pods in `namespace` with their current usage
    ///
    /// An empty namespace yields an empty list, not an error.
    async fn snapshot(&self, namespace: &str) -> Result<Vec<PodSnapshot>>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Create the live or mock source depending on `use_mock`
pub async fn create_source(use_mock: bool) -> Result<Arc<dyn MetricsSource>> {
    if use_mock {
        tracing::info!("Using mock Kubernetes API");
        Ok(Arc::new(MockMetricsSource::new()))
    } else {
        tracing::info!("Using live Kubernetes API");
        Ok(Arc::new(KubeMetricsSource::try_default().await?))
    }
}
