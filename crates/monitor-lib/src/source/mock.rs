//! Deterministic stand-in for the cluster API

use super::{async_trait, MetricsSource};
use crate::error::Result;
use crate::models::PodSnapshot;
use tracing::debug;

/// Returns the same two pods for every namespace, without usage data
#[derive(Debug, Clone, Default)]
pub struct MockMetricsSource;

impl MockMetricsSource {
    pub fn new() -> Self {
        Self
    }

    /// The fixed fixture
    pub fn fixture() -> Vec<PodSnapshot> {
        vec![
            PodSnapshot {
                pod_name: "mock-pod-1".to_string(),
                phase: "Running".to_string(),
                cpu_usage: None,
                memory_usage: None,
                deployment: None,
            },
            PodSnapshot {
                pod_name: "mock-pod-2".to_string(),
                phase: "Pending".to_string(),
                cpu_usage: None,
                memory_usage: None,
                deployment: None,
            },
        ]
    }
}

#[async_trait]
impl MetricsSource for MockMetricsSource {
    async fn snapshot(&self, namespace: &str) -> Result<Vec<PodSnapshot>> {
        debug!(namespace = %namespace, "Serving mock pod fixture");
        Ok(Self::fixture())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
