//! Monitoring cycle orchestration
//!
//! Glue that drives source → store → recommendation → reconcile/alerts, plus
//! the periodic loop used by the daemon.

mod r#loop;
mod orchestrator;
mod report;

#[cfg(test)]
mod tests;

pub use orchestrator::MonitoringCycle;
pub use r#loop::{LoopConfig, MonitorLoop};
pub use report::{CycleReport, NamespaceReport, NamespaceStatus, PodReport, ReconcileOutcome};
