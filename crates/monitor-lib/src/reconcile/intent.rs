//! Desired autoscaler shape derived from a recommendation

use crate::models::{ScalingDirection, ScalingRecommendation};
use k8s_openapi::api::autoscaling::v2::{
    CrossVersionObjectReference, HorizontalPodAutoscaler, HorizontalPodAutoscalerSpec,
    MetricSpec, MetricTarget, ResourceMetricSource,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_MIN_REPLICAS: i32 = 1;
pub const DEFAULT_MAX_REPLICAS: i32 = 10;
pub const DEFAULT_CPU_UTILIZATION: i32 = 60;
pub const SCALE_UP_CPU_UTILIZATION: i32 = 80;
pub const SCALE_DOWN_CPU_UTILIZATION: i32 = 30;

const MANAGED_BY: &str = "k8s-monitor";

/// CPU target utilization hint for a scaling direction
pub fn cpu_utilization_for(direction: ScalingDirection) -> i32 {
    match direction {
        ScalingDirection::Up => SCALE_UP_CPU_UTILIZATION,
        ScalingDirection::Down => SCALE_DOWN_CPU_UTILIZATION,
        ScalingDirection::None => DEFAULT_CPU_UTILIZATION,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleTarget {
    pub api_version: String,
    pub kind: String,
    pub name: String,
}

impl ScaleTarget {
    pub fn deployment(name: impl Into<String>) -> Self {
        Self {
            api_version: "apps/v1".to_string(),
            kind: "Deployment".to_string(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTarget {
    pub resource: String,
    pub target_utilization: i32,
}

/// Desired state of one autoscaler object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoscalerIntent {
    pub name: String,
    pub namespace: String,
    pub scale_target: ScaleTarget,
    pub min_replicas: i32,
    pub max_replicas: i32,
    /// CPU first, memory only when a memory target was supplied
    pub metrics: Vec<ResourceTarget>,
}

impl AutoscalerIntent {
    /// Intent for a deployment with the default bounds and CPU target
    pub fn new(target: &str, namespace: &str) -> Self {
        Self {
            name: format!("{}-hpa", target),
            namespace: namespace.to_string(),
            scale_target: ScaleTarget::deployment(target),
            min_replicas: DEFAULT_MIN_REPLICAS,
            max_replicas: DEFAULT_MAX_REPLICAS,
            metrics: vec![ResourceTarget {
                resource: "cpu".to_string(),
                target_utilization: DEFAULT_CPU_UTILIZATION,
            }],
        }
    }

    /// Map an actionable recommendation onto a target; `None` for direction none
    pub fn from_recommendation(recommendation: &ScalingRecommendation, target: &str) -> Option<Self> {
        if recommendation.direction == ScalingDirection::None {
            return None;
        }
        Some(
            Self::new(target, &recommendation.namespace)
                .with_cpu_target(cpu_utilization_for(recommendation.direction)),
        )
    }

    pub fn with_cpu_target(mut self, utilization: i32) -> Self {
        if let Some(cpu) = self.metrics.iter_mut().find(|m| m.resource == "cpu") {
            cpu.target_utilization = utilization;
        }
        self
    }

    pub fn with_memory_target(mut self, utilization: i32) -> Self {
        self.metrics.retain(|m| m.resource != "memory");
        self.metrics.push(ResourceTarget {
            resource: "memory".to_string(),
            target_utilization: utilization,
        });
        self
    }

    pub fn with_replica_bounds(mut self, min_replicas: i32, max_replicas: i32) -> Self {
        self.min_replicas = min_replicas;
        self.max_replicas = max_replicas.max(min_replicas);
        self
    }

    pub fn cpu_target(&self) -> Option<i32> {
        self.metrics
            .iter()
            .find(|m| m.resource == "cpu")
            .map(|m| m.target_utilization)
    }

    /// Scaling spec written on both create and replace
    pub fn spec(&self) -> HorizontalPodAutoscalerSpec {
        let metrics = self
            .metrics
            .iter()
            .map(|m| MetricSpec {
                type_: "Resource".to_string(),
                resource: Some(ResourceMetricSource {
                    name: m.resource.clone(),
                    target: MetricTarget {
                        type_: "Utilization".to_string(),
                        average_utilization: Some(m.target_utilization),
                        ..Default::default()
                    },
                }),
                ..Default::default()
            })
            .collect();

        HorizontalPodAutoscalerSpec {
            scale_target_ref: CrossVersionObjectReference {
                api_version: Some(self.scale_target.api_version.clone()),
                kind: self.scale_target.kind.clone(),
                name: self.scale_target.name.clone(),
            },
            min_replicas: Some(self.min_replicas),
            max_replicas: self.max_replicas,
            metrics: Some(metrics),
            behavior: None,
        }
    }

    /// Full object for creation
    pub fn to_hpa(&self) -> HorizontalPodAutoscaler {
        let mut labels = BTreeMap::new();
        labels.insert(
            "app.kubernetes.io/managed-by".to_string(),
            MANAGED_BY.to_string(),
        );

        HorizontalPodAutoscaler {
            metadata: ObjectMeta {
                name: Some(self.name.clone()),
                namespace: Some(self.namespace.clone()),
                labels: Some(labels),
                ..Default::default()
            },
            spec: Some(self.spec()),
            ..Default::default()
        }
    }
}
