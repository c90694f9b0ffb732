//! Component health for liveness and readiness probes
//!
//! The daemon folds each cycle report into per-component status: a failed
//! namespace marks the source or store unhealthy, pod-level failures only
//! degrade the reconciler or notifier.

use crate::cycle::{CycleReport, NamespaceStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Some work failed but cycles still complete
    Degraded,
    Unhealthy,
}

impl ComponentStatus {
    pub fn is_operational(&self) -> bool {
        matches!(self, ComponentStatus::Healthy | ComponentStatus::Degraded)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn with(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn healthy() -> Self {
        Self::with(ComponentStatus::Healthy, None)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::with(ComponentStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::with(ComponentStatus::Unhealthy, Some(message.into()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// Worst status across components wins
    pub fn compute_status(components: &HashMap<String, ComponentHealth>) -> ComponentStatus {
        let mut has_degraded = false;
        for health in components.values() {
            match health.status {
                ComponentStatus::Unhealthy => return ComponentStatus::Unhealthy,
                ComponentStatus::Degraded => has_degraded = true,
                ComponentStatus::Healthy => {}
            }
        }
        if has_degraded {
            ComponentStatus::Degraded
        } else {
            ComponentStatus::Healthy
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

pub mod components {
    pub const SOURCE: &str = "source";
    pub const STORE: &str = "store";
    pub const RECONCILER: &str = "reconciler";
    pub const NOTIFIER: &str = "notifier";

    pub const ALL: [&str; 4] = [SOURCE, STORE, RECONCILER, NOTIFIER];
}

#[derive(Debug, Clone)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    ready: Arc<RwLock<bool>>,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self {
            components: Arc::new(RwLock::new(HashMap::new())),
            ready: Arc::new(RwLock::new(false)),
        }
    }

    pub async fn register(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn update(&self, name: &str, health: ComponentHealth) {
        let mut components = self.components.write().await;
        components.insert(name.to_string(), health);
    }

    pub async fn set_healthy(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::degraded(message)).await;
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::unhealthy(message)).await;
    }

    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    /// Derive component status from a finished cycle
    pub async fn record_cycle(&self, report: &CycleReport) {
        let mut source_failures = Vec::new();
        let mut store_failures = Vec::new();
        for ns in &report.namespaces {
            if let NamespaceStatus::Failed { kind, message } = &ns.status {
                let line = format!("{}: {}", ns.namespace, message);
                match kind.as_str() {
                    "storage" => store_failures.push(line),
                    _ => source_failures.push(line),
                }
            }
        }

        let evaluated = report.namespaces.len();
        self.update(
            components::SOURCE,
            namespace_health(&source_failures, evaluated),
        )
        .await;
        self.update(
            components::STORE,
            namespace_health(&store_failures, evaluated),
        )
        .await;

        let reconcile_failures = report.reconcile_failures();
        self.update(
            components::RECONCILER,
            if reconcile_failures == 0 {
                ComponentHealth::healthy()
            } else {
                ComponentHealth::degraded(format!("{} reconcile failures", reconcile_failures))
            },
        )
        .await;

        let transport_failures = report.transport_failures();
        self.update(
            components::NOTIFIER,
            if transport_failures == 0 {
                ComponentHealth::healthy()
            } else {
                ComponentHealth::degraded(format!("{} failed deliveries", transport_failures))
            },
        )
        .await;
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = HealthResponse::compute_status(&components);
        HealthResponse { status, components }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let ready = *self.ready.read().await;
        let health = self.health().await;

        if !ready {
            ReadinessResponse {
                ready: false,
                reason: Some("First monitoring cycle not yet complete".to_string()),
            }
        } else if health.status == ComponentStatus::Unhealthy {
            ReadinessResponse {
                ready: false,
                reason: Some("Critical component unhealthy".to_string()),
            }
        } else {
            ReadinessResponse {
                ready: true,
                reason: None,
            }
        }
    }
}

/// Every namespace failing is unhealthy, some failing is degraded
fn namespace_health(failures: &[String], evaluated: usize) -> ComponentHealth {
    if failures.is_empty() {
        ComponentHealth::healthy()
    } else if failures.len() >= evaluated {
        ComponentHealth::unhealthy(failures.join("; "))
    } else {
        ComponentHealth::degraded(failures.join("; "))
    }
}
