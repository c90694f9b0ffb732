//! One pass over namespaces and pods
//!
//! Namespaces are evaluated in order and pods one at a time. Storage and
//! source failures abort the current namespace only; reconcile failures are
//! recorded against the single pod; alert delivery failures never surface.

use super::report::{CycleReport, NamespaceReport, NamespaceStatus, PodReport, ReconcileOutcome};
use crate::alert::{AlertEvaluator, AlertOutcome};
use crate::config::{CycleSettings, NamespaceSelection};
use crate::error::Result;
use crate::models::{PodSnapshot, ScalingDirection, ScalingRecommendation, UsageSample};
use crate::observability::{MonitorMetrics, StructuredLogger};
use crate::recommend::RecommendationEngine;
use crate::reconcile::{AutoscalerIntent, Reconciler};
use crate::source::MetricsSource;
use crate::store::UsageStore;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info};

pub struct MonitoringCycle {
    source: Arc<dyn MetricsSource>,
    store: UsageStore,
    engine: RecommendationEngine,
    reconciler: Reconciler,
    alerts: AlertEvaluator,
    settings: CycleSettings,
    metrics: MonitorMetrics,
    logger: StructuredLogger,
}

impl MonitoringCycle {
    pub fn new(
        source: Arc<dyn MetricsSource>,
        store: UsageStore,
        engine: RecommendationEngine,
        reconciler: Reconciler,
        alerts: AlertEvaluator,
        settings: CycleSettings,
    ) -> Self {
        Self {
            source,
            store,
            engine,
            reconciler,
            alerts,
            settings,
            metrics: MonitorMetrics::new(),
            logger: StructuredLogger::new("k8s-monitor"),
        }
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    pub fn store(&self) -> &UsageStore {
        &self.store
    }

    pub fn settings(&self) -> &CycleSettings {
        &self.settings
    }

    /// Evaluate every selected namespace; never fails as a whole
    pub async fn run(&self, namespaces: &NamespaceSelection) -> CycleReport {
        let start = Instant::now();
        let mut report = CycleReport::default();

        for namespace in namespaces.iter() {
            let mut pods = Vec::new();
            let status = match self.run_namespace(namespace, &mut pods).await {
                Ok(status) => status,
                Err(e) => {
                    self.metrics.inc_namespace_failures(e.kind());
                    self.logger.log_cycle_failure(namespace, None, &e.to_string());
                    NamespaceStatus::Failed {
                        kind: e.kind().to_string(),
                        message: e.to_string(),
                    }
                }
            };
            report.namespaces.push(NamespaceReport {
                namespace: namespace.to_string(),
                status,
                pods,
            });
        }

        let elapsed = start.elapsed();
        report.duration_ms = elapsed.as_millis() as u64;
        self.metrics.observe_cycle_latency(elapsed.as_secs_f64());
        self.metrics.set_pods_evaluated(report.pod_count() as i64);

        info!(
            namespaces = report.namespaces.len(),
            pods = report.pod_count(),
            elapsed_ms = report.duration_ms,
            "Monitoring cycle complete"
        );
        report
    }

    async fn run_namespace(
        &self,
        namespace: &str,
        pods: &mut Vec<PodReport>,
    ) -> Result<NamespaceStatus> {
        self.store.init()?;

        let snapshots = self.source.snapshot(namespace).await?;
        if snapshots.is_empty() {
            info!(namespace = %namespace, "No pods found");
            return Ok(NamespaceStatus::Empty);
        }

        for snapshot in &snapshots {
            pods.push(self.evaluate_pod(namespace, snapshot).await?);
        }
        Ok(NamespaceStatus::Ok)
    }

    async fn evaluate_pod(&self, namespace: &str, snapshot: &PodSnapshot) -> Result<PodReport> {
        let pod_name = snapshot.pod_name.as_str();

        self.store
            .append(&UsageSample::from_snapshot(snapshot, namespace))?;
        self.metrics.inc_samples_appended();
        self.logger
            .log_sample(pod_name, namespace, snapshot.cpu_usage, snapshot.memory_usage);

        let current = self
            .store
            .windowed_average(pod_name, namespace, self.settings.current_window)?;
        let history = self
            .store
            .history(pod_name, namespace, self.settings.trend_window)?;

        let recommendation = self.engine.recommend(pod_name, namespace, current, &history);
        self.metrics
            .inc_recommendation(recommendation.direction.as_str());
        self.logger.log_recommendation(&recommendation);

        let reconcile = if recommendation.direction == ScalingDirection::None {
            ReconcileOutcome::Skipped("no change".to_string())
        } else if !self.settings.reconcile {
            ReconcileOutcome::Skipped("dry run".to_string())
        } else {
            self.apply(&recommendation, snapshot.scale_target()).await
        };

        let alert = match (current.average_cpu, current.average_memory) {
            _ if !self.settings.alerts => None,
            (None, None) => {
                debug!(pod_name = %pod_name, "No current usage, skipping alert evaluation");
                None
            }
            // An absent value cannot breach its threshold
            (cpu, memory) => {
                let outcome = self
                    .alerts
                    .evaluate(pod_name, cpu.unwrap_or(0.0), memory.unwrap_or(0.0))
                    .await;
                self.record_alert(pod_name, namespace, &outcome);
                Some(outcome)
            }
        };

        Ok(PodReport {
            pod_name: pod_name.to_string(),
            namespace: namespace.to_string(),
            phase: snapshot.phase.clone(),
            scale_target: snapshot.scale_target().to_string(),
            cpu_usage: snapshot.cpu_usage,
            memory_usage: snapshot.memory_usage,
            current,
            history,
            recommendation,
            reconcile,
            alert,
        })
    }

    async fn apply(
        &self,
        recommendation: &ScalingRecommendation,
        target: &str,
    ) -> ReconcileOutcome {
        let Some(intent) = AutoscalerIntent::from_recommendation(recommendation, target) else {
            return ReconcileOutcome::Skipped("no change".to_string());
        };
        let intent =
            intent.with_replica_bounds(self.settings.min_replicas, self.settings.max_replicas);

        match self.reconciler.reconcile(&intent).await {
            Ok(result) => {
                self.logger.log_reconciled(&intent, result);
                ReconcileOutcome::Applied(result)
            }
            Err(e) => {
                self.metrics.inc_reconcile_errors();
                self.logger.log_cycle_failure(
                    &intent.namespace,
                    Some(&recommendation.pod_name),
                    &e.to_string(),
                );
                ReconcileOutcome::Failed(e.to_string())
            }
        }
    }

    fn record_alert(&self, pod_name: &str, namespace: &str, outcome: &AlertOutcome) {
        if !outcome.triggered() {
            return;
        }
        self.logger
            .log_alert(pod_name, namespace, outcome.sent_email, outcome.sent_chat);
        if outcome.sent_email {
            self.metrics.inc_alert_sent("email");
        }
        if outcome.sent_chat {
            self.metrics.inc_alert_sent("chat");
        }
        for channel in &outcome.failed {
            self.metrics.inc_transport_errors(channel.as_str());
        }
    }
}
