//! Periodic monitoring loop
//!
//! Runs one cycle per tick until shutdown. Cycles never overlap: a slow cycle
//! delays the next tick rather than running concurrently with it.

use super::orchestrator::MonitoringCycle;
use super::report::CycleReport;
use crate::config::NamespaceSelection;
use crate::store::UsageStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Time between cycle starts (default: 60 seconds)
    pub interval: Duration,
    /// Opt-in retention; samples older than this are compacted away after each cycle
    pub retention: Option<Duration>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            retention: None,
        }
    }
}

pub struct MonitorLoop {
    cycle: Arc<MonitoringCycle>,
    namespaces: NamespaceSelection,
    config: LoopConfig,
    reports: watch::Sender<Option<Arc<CycleReport>>>,
}

impl MonitorLoop {
    /// Create a loop; the receiver observes the most recent report
    pub fn new(
        cycle: Arc<MonitoringCycle>,
        namespaces: NamespaceSelection,
        config: LoopConfig,
    ) -> (Self, watch::Receiver<Option<Arc<CycleReport>>>) {
        let (reports, rx) = watch::channel(None);
        (
            Self {
                cycle,
                namespaces,
                config,
                reports,
            },
            rx,
        )
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            namespaces = ?self.namespaces.namespaces,
            "Starting monitoring loop"
        );

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycles = 0u64;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.run_once().await;
                    cycles += 1;
                    debug!(
                        cycle = cycles,
                        pods = report.pod_count(),
                        failed_namespaces = report.failed_namespaces().count(),
                        "Cycle published"
                    );
                    // No receivers is fine
                    let _ = self.reports.send(Some(Arc::new(report)));
                }
                _ = shutdown.recv() => {
                    info!(cycles = cycles, "Shutting down monitoring loop");
                    break;
                }
            }
        }
    }

    /// One cycle followed by optional compaction
    pub async fn run_once(&self) -> CycleReport {
        let report = self.cycle.run(&self.namespaces).await;
        if let Some(max_age) = self.config.retention {
            compact(self.cycle.store(), max_age);
        }
        report
    }
}

fn compact(store: &UsageStore, max_age: Duration) {
    match store.compact(max_age) {
        Ok(0) => {}
        Ok(removed) => info!(removed = removed, "Compacted usage store"),
        Err(e) => warn!(error = %e, "Usage store compaction failed"),
    }
}
