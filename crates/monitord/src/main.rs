//! monitord - Kubernetes pod resource monitor
//!
//! Samples pod usage on a fixed interval, keeps the usage log, reconciles
//! autoscaler objects from trend recommendations and fires threshold alerts.

use anyhow::{Context, Result};
use monitor_lib::{
    alert::{AlertChannels, AlertEvaluator},
    config::{CycleSettings, Settings},
    cycle::{LoopConfig, MonitorLoop, MonitoringCycle},
    health::{components, HealthRegistry},
    observability::{MonitorMetrics, StructuredLogger},
    recommend::RecommendationEngine,
    reconcile::{HpaBackend, InMemoryHpaBackend, KubeHpaBackend, Reconciler},
    source::create_source,
    store::UsageStore,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const MONITOR_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting monitord");

    let config = config::MonitordConfig::load()?;
    let settings = Settings::load(&config.settings_dir).with_context(|| {
        format!("Failed to load settings from {}", config.settings_dir.display())
    })?;
    let namespaces = config
        .namespace_override()
        .unwrap_or_else(|| settings.namespaces.clone());
    info!(
        instance = %config.instance,
        settings_dir = %config.settings_dir.display(),
        store = %config.store_path.display(),
        dry_run = config.dry_run,
        "Monitor configured"
    );

    let health_registry = HealthRegistry::new();
    for name in components::ALL {
        health_registry.register(name).await;
    }

    let metrics = MonitorMetrics::new();
    let logger = StructuredLogger::new(&config.instance);

    let source = create_source(config.use_mock).await?;
    let backend: Arc<dyn HpaBackend> = if config.use_mock {
        Arc::new(InMemoryHpaBackend::new())
    } else {
        Arc::new(KubeHpaBackend::try_default().await?)
    };
    let channels = AlertChannels::from_config(&settings.notifications)?;
    if channels.is_empty() {
        info!("No alert channels configured, alerts will be logged only");
    }

    let store = UsageStore::open(&config.store_path);
    store.init()?;

    logger.log_startup(MONITOR_VERSION, source.name(), &namespaces.namespaces);

    let cycle = MonitoringCycle::new(
        source,
        store,
        RecommendationEngine::new(settings.policy.clone()),
        Reconciler::new(backend),
        AlertEvaluator::new(settings.thresholds.clone(), channels),
        CycleSettings {
            reconcile: !config.dry_run,
            ..CycleSettings::default()
        },
    )
    .with_logger(logger.clone());

    let (monitor_loop, reports) = MonitorLoop::new(
        Arc::new(cycle),
        namespaces,
        LoopConfig {
            interval: config.interval(),
            retention: config.retention(),
        },
    );

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let loop_handle = tokio::spawn(monitor_loop.run(shutdown_rx));

    // Fold every report into component health; ready after the first cycle
    let mut report_rx = reports.clone();
    let registry = health_registry.clone();
    tokio::spawn(async move {
        while report_rx.changed().await.is_ok() {
            let latest = report_rx.borrow_and_update().clone();
            if let Some(report) = latest {
                registry.record_cycle(&report).await;
                registry.set_ready(true).await;
            }
        }
    });

    let app_state = Arc::new(api::AppState::new(
        health_registry.clone(),
        metrics.clone(),
        reports,
    ));
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for shutdown signal")?;
            logger.log_shutdown("SIGINT received");
        }
        result = api_handle => {
            match result {
                Ok(Err(e)) => error!(error = %e, "API server failed"),
                Err(e) => error!(error = %e, "API server task panicked"),
                Ok(Ok(())) => {}
            }
            logger.log_shutdown("API server stopped");
        }
    }

    let _ = shutdown_tx.send(());
    if let Err(e) = loop_handle.await {
        error!(error = %e, "Monitoring loop task failed");
    }
    info!("Shutdown complete");

    Ok(())
}
