//! CLI subcommands

pub mod autoscale;
pub mod email;
pub mod history;
pub mod monitor;
pub mod settings;

use crate::config::Paths;
use anyhow::Result;
use monitor_lib::alert::{AlertChannels, AlertEvaluator};
use monitor_lib::config::{CycleSettings, NamespaceSelection, Settings};
use monitor_lib::cycle::MonitoringCycle;
use monitor_lib::recommend::RecommendationEngine;
use monitor_lib::reconcile::{HpaBackend, InMemoryHpaBackend, KubeHpaBackend, Reconciler};
use monitor_lib::source::create_source;
use std::sync::Arc;

/// Options shared by the cycle-running commands
#[derive(Debug, Clone)]
pub struct CycleOptions {
    pub namespace: Option<String>,
    pub use_mock: bool,
    pub reconcile: bool,
    pub alerts: bool,
}

impl CycleOptions {
    /// `--namespace` wins over namespaces.json
    pub fn namespaces(&self, settings: &Settings) -> NamespaceSelection {
        match &self.namespace {
            Some(ns) => NamespaceSelection::new(vec![ns.clone()]),
            None => settings.namespaces.clone(),
        }
    }
}

/// Wire a one-shot cycle from settings and flags
pub async fn build_cycle(
    paths: &Paths,
    settings: &Settings,
    options: &CycleOptions,
) -> Result<MonitoringCycle> {
    let source = create_source(options.use_mock).await?;
    let backend: Arc<dyn HpaBackend> = if options.use_mock {
        Arc::new(InMemoryHpaBackend::new())
    } else {
        Arc::new(KubeHpaBackend::try_default().await?)
    };
    let channels = AlertChannels::from_config(&settings.notifications)?;

    Ok(MonitoringCycle::new(
        source,
        paths.store(),
        RecommendationEngine::new(settings.policy.clone()),
        Reconciler::new(backend),
        AlertEvaluator::new(settings.thresholds.clone(), channels),
        CycleSettings {
            reconcile: options.reconcile,
            alerts: options.alerts,
            ..CycleSettings::default()
        },
    ))
}
