//! Per-cycle results for operators

use crate::alert::AlertOutcome;
use crate::models::{HistoryPoint, ScalingRecommendation, UsageWindow};
use crate::reconcile::ReconcileResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What happened to a pod's autoscaler object this cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "lowercase")]
pub enum ReconcileOutcome {
    Applied(ReconcileResult),
    Skipped(String),
    Failed(String),
}

impl fmt::Display for ReconcileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileOutcome::Applied(result) => write!(f, "{}", result),
            ReconcileOutcome::Skipped(reason) => write!(f, "skipped ({})", reason),
            ReconcileOutcome::Failed(message) => write!(f, "failed: {}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodReport {
    pub pod_name: String,
    pub namespace: String,
    pub phase: String,
    pub scale_target: String,
    /// Usage reported by the source this cycle
    pub cpu_usage: Option<u64>,
    pub memory_usage: Option<u64>,
    pub current: UsageWindow,
    pub history: Vec<HistoryPoint>,
    pub recommendation: ScalingRecommendation,
    pub reconcile: ReconcileOutcome,
    pub alert: Option<AlertOutcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum NamespaceStatus {
    Ok,
    /// No pods; nothing to evaluate
    Empty,
    Failed { kind: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamespaceReport {
    pub namespace: String,
    pub status: NamespaceStatus,
    /// Pods evaluated before any failure
    pub pods: Vec<PodReport>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub namespaces: Vec<NamespaceReport>,
    pub duration_ms: u64,
}

impl CycleReport {
    pub fn pods(&self) -> impl Iterator<Item = &PodReport> {
        self.namespaces.iter().flat_map(|ns| ns.pods.iter())
    }

    pub fn pod_count(&self) -> usize {
        self.namespaces.iter().map(|ns| ns.pods.len()).sum()
    }

    pub fn failed_namespaces(&self) -> impl Iterator<Item = &NamespaceReport> {
        self.namespaces
            .iter()
            .filter(|ns| matches!(ns.status, NamespaceStatus::Failed { .. }))
    }

    pub fn reconcile_failures(&self) -> usize {
        self.pods()
            .filter(|p| matches!(p.reconcile, ReconcileOutcome::Failed(_)))
            .count()
    }

    pub fn transport_failures(&self) -> usize {
        self.pods()
            .filter_map(|p| p.alert.as_ref())
            .map(|a| a.failed.len())
            .sum()
    }
}
