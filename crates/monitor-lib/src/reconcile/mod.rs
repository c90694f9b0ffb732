//! Autoscaler reconciliation
//!
//! Create-or-replace of one autoscaler object per scale target. The protocol
//! is a plain read-modify-write: there is no resource-version precondition,
//! so a concurrent writer between `get` and `replace` is overwritten. This is
//! fine for a single controller instance.

mod backend;
mod intent;

pub use backend::{HpaBackend, InMemoryHpaBackend, KubeHpaBackend};
pub use intent::{
    cpu_utilization_for, AutoscalerIntent, ResourceTarget, ScaleTarget, DEFAULT_CPU_UTILIZATION,
    DEFAULT_MAX_REPLICAS, DEFAULT_MIN_REPLICAS, SCALE_DOWN_CPU_UTILIZATION,
    SCALE_UP_CPU_UTILIZATION,
};

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileResult {
    Created,
    Updated,
}

impl fmt::Display for ReconcileResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileResult::Created => f.write_str("created"),
            ReconcileResult::Updated => f.write_str("updated"),
        }
    }
}

/// Makes the external autoscaler object match an intent
#[derive(Clone)]
pub struct Reconciler {
    backend: Arc<dyn HpaBackend>,
}

impl Reconciler {
    pub fn new(backend: Arc<dyn HpaBackend>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub async fn reconcile(&self, intent: &AutoscalerIntent) -> Result<ReconcileResult> {
        match self.backend.get(&intent.name, &intent.namespace).await? {
            None => {
                self.backend
                    .create(&intent.namespace, &intent.to_hpa())
                    .await?;
                info!(
                    name = %intent.name,
                    namespace = %intent.namespace,
                    cpu_target = ?intent.cpu_target(),
                    "Created autoscaler"
                );
                Ok(ReconcileResult::Created)
            }
            Some(mut existing) => {
                // Only the scaling spec changes; metadata stays as read
                existing.spec = Some(intent.spec());
                self.backend
                    .replace(&intent.name, &intent.namespace, &existing)
                    .await?;
                info!(
                    name = %intent.name,
                    namespace = %intent.namespace,
                    cpu_target = ?intent.cpu_target(),
                    "Updated autoscaler"
                );
                Ok(ReconcileResult::Updated)
            }
        }
    }
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("backend", &self.backend.name())
            .finish()
    }
}
