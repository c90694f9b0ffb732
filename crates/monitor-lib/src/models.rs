//! Core data models for the resource monitor

use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single per-pod usage observation
///
/// Samples are immutable once written. Absent usage is kept as `None` and
/// persisted as `"N/A"`, never as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSample {
    pub pod_name: String,
    pub namespace: String,
    /// CPU usage in millicores
    pub cpu_usage: Option<f64>,
    /// Memory usage in KiB
    pub memory_usage: Option<f64>,
    /// Local wall-clock time, second precision
    pub timestamp: NaiveDateTime,
}

impl UsageSample {
    /// Create a sample stamped with the current local time
    pub fn new(
        pod_name: impl Into<String>,
        namespace: impl Into<String>,
        cpu_usage: Option<f64>,
        memory_usage: Option<f64>,
    ) -> Self {
        Self::at(pod_name, namespace, cpu_usage, memory_usage, Local::now().naive_local())
    }

    /// Create a sample with an explicit timestamp (truncated to seconds)
    pub fn at(
        pod_name: impl Into<String>,
        namespace: impl Into<String>,
        cpu_usage: Option<f64>,
        memory_usage: Option<f64>,
        timestamp: NaiveDateTime,
    ) -> Self {
        Self {
            pod_name: pod_name.into(),
            namespace: namespace.into(),
            cpu_usage,
            memory_usage,
            timestamp: timestamp.with_nanosecond(0).unwrap_or(timestamp),
        }
    }

    /// Build a sample from a source snapshot
    pub fn from_snapshot(snapshot: &PodSnapshot, namespace: &str) -> Self {
        Self::new(
            snapshot.pod_name.clone(),
            namespace,
            snapshot.cpu_usage.map(|v| v as f64),
            snapshot.memory_usage.map(|v| v as f64),
        )
    }
}

/// One point of a pod's usage history, integer-cast on read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub cpu: i64,
    pub memory: i64,
}

/// Averages over a time window; `None` when no sample falls in the window
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageWindow {
    pub average_cpu: Option<f64>,
    pub average_memory: Option<f64>,
}

/// Pod descriptor returned by a metrics source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodSnapshot {
    pub pod_name: String,
    pub phase: String,
    /// Current CPU usage in millicores
    pub cpu_usage: Option<u64>,
    /// Current memory usage in KiB
    pub memory_usage: Option<u64>,
    /// Owning deployment, when it could be resolved
    pub deployment: Option<String>,
}

impl PodSnapshot {
    /// Name of the workload the autoscaler should target
    pub fn scale_target(&self) -> &str {
        self.deployment.as_deref().unwrap_or(&self.pod_name)
    }
}

/// Direction of a scaling decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalingDirection {
    None,
    Up,
    Down,
}

impl ScalingDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalingDirection::None => "none",
            ScalingDirection::Up => "up",
            ScalingDirection::Down => "down",
        }
    }
}

impl fmt::Display for ScalingDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of the recommendation engine for one pod
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingRecommendation {
    pub pod_name: String,
    pub namespace: String,
    pub direction: ScalingDirection,
    /// Replica delta
    pub magnitude: u32,
    pub reason: String,
}

impl fmt::Display for ScalingRecommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            ScalingDirection::Up => write!(
                f,
                "Scale Up by {} replicas due to {}",
                self.magnitude, self.reason
            ),
            ScalingDirection::Down => write!(
                f,
                "Scale Down by {} replicas due to {}",
                self.magnitude, self.reason
            ),
            ScalingDirection::None => write!(f, "No Scaling Needed ({})", self.reason),
        }
    }
}

/// Format an optional usage value the way operators see it
pub fn display_usage(value: Option<u64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "N/A".to_string())
}
