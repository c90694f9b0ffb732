//! Observability infrastructure for the resource monitor
//!
//! Provides:
//! - Prometheus metrics (cycle latency, samples, recommendations, reconcile and alert outcomes)
//! - Structured JSON logging with tracing

use crate::models::ScalingRecommendation;
use crate::reconcile::{AutoscalerIntent, ReconcileResult};
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Cycle latency buckets (in seconds); a cycle spans network round trips
const CYCLE_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<MonitorMetricsInner> = OnceLock::new();

struct MonitorMetricsInner {
    cycle_latency_seconds: Histogram,
    pods_evaluated: IntGauge,
    samples_appended: IntCounter,
    recommendations: IntCounterVec,
    reconcile_errors: IntCounter,
    alerts_sent: IntCounterVec,
    transport_errors: IntCounterVec,
    namespace_failures: IntCounterVec,
}

impl MonitorMetricsInner {
    fn new() -> Self {
        Self {
            cycle_latency_seconds: register_histogram!(
                "k8s_monitor_cycle_latency_seconds",
                "Time spent on one full monitoring cycle",
                CYCLE_BUCKETS.to_vec()
            )
            .expect("Failed to register cycle_latency_seconds"),

            pods_evaluated: register_int_gauge!(
                "k8s_monitor_pods_evaluated",
                "Pods evaluated in the most recent cycle"
            )
            .expect("Failed to register pods_evaluated"),

            samples_appended: register_int_counter!(
                "k8s_monitor_samples_appended_total",
                "Usage samples written to the store"
            )
            .expect("Failed to register samples_appended"),

            recommendations: register_int_counter_vec!(
                "k8s_monitor_recommendations_total",
                "Scaling recommendations produced, by direction",
                &["direction"]
            )
            .expect("Failed to register recommendations"),

            reconcile_errors: register_int_counter!(
                "k8s_monitor_reconcile_errors_total",
                "Autoscaler reconciliations that failed"
            )
            .expect("Failed to register reconcile_errors"),

            alerts_sent: register_int_counter_vec!(
                "k8s_monitor_alerts_sent_total",
                "Alerts delivered, by channel",
                &["channel"]
            )
            .expect("Failed to register alerts_sent"),

            transport_errors: register_int_counter_vec!(
                "k8s_monitor_transport_errors_total",
                "Alert deliveries that failed, by channel",
                &["channel"]
            )
            .expect("Failed to register transport_errors"),

            namespace_failures: register_int_counter_vec!(
                "k8s_monitor_namespace_failures_total",
                "Namespaces whose cycle was aborted, by error kind",
                &["kind"]
            )
            .expect("Failed to register namespace_failures"),
        }
    }
}

/// Monitor metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share it.
#[derive(Clone)]
pub struct MonitorMetrics {
    _private: (),
}

impl Default for MonitorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(MonitorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &MonitorMetricsInner {
        GLOBAL_METRICS.get_or_init(MonitorMetricsInner::new)
    }

    pub fn observe_cycle_latency(&self, duration_secs: f64) {
        self.inner().cycle_latency_seconds.observe(duration_secs);
    }

    pub fn set_pods_evaluated(&self, count: i64) {
        self.inner().pods_evaluated.set(count);
    }

    pub fn inc_samples_appended(&self) {
        self.inner().samples_appended.inc();
    }

    pub fn inc_recommendation(&self, direction: &str) {
        self.inner()
            .recommendations
            .with_label_values(&[direction])
            .inc();
    }

    pub fn inc_reconcile_errors(&self) {
        self.inner().reconcile_errors.inc();
    }

    pub fn inc_alert_sent(&self, channel: &str) {
        self.inner().alerts_sent.with_label_values(&[channel]).inc();
    }

    pub fn inc_transport_errors(&self, channel: &str) {
        self.inner()
            .transport_errors
            .with_label_values(&[channel])
            .inc();
    }

    pub fn inc_namespace_failures(&self, kind: &str) {
        self.inner()
            .namespace_failures
            .with_label_values(&[kind])
            .inc();
    }
}

/// Structured logger for monitor events
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn log_startup(&self, version: &str, source: &str, namespaces: &[String]) {
        info!(
            event = "monitor_started",
            instance = %self.instance,
            version = %version,
            source = %source,
            namespaces = ?namespaces,
            "Resource monitor started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "monitor_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Resource monitor shutting down"
        );
    }

    pub fn log_sample(
        &self,
        pod_name: &str,
        namespace: &str,
        cpu_usage: Option<u64>,
        memory_usage: Option<u64>,
    ) {
        info!(
            event = "sample_recorded",
            instance = %self.instance,
            pod_name = %pod_name,
            namespace = %namespace,
            cpu_millicores = ?cpu_usage,
            memory_kib = ?memory_usage,
            "Recorded usage sample"
        );
    }

    pub fn log_recommendation(&self, recommendation: &ScalingRecommendation) {
        info!(
            event = "scaling_recommendation",
            instance = %self.instance,
            pod_name = %recommendation.pod_name,
            namespace = %recommendation.namespace,
            direction = %recommendation.direction,
            magnitude = recommendation.magnitude,
            reason = %recommendation.reason,
            "{}",
            recommendation
        );
    }

    pub fn log_reconciled(&self, intent: &AutoscalerIntent, result: ReconcileResult) {
        info!(
            event = "autoscaler_reconciled",
            instance = %self.instance,
            name = %intent.name,
            namespace = %intent.namespace,
            target = %intent.scale_target.name,
            cpu_target = ?intent.cpu_target(),
            result = %result,
            "Autoscaler reconciled"
        );
    }

    pub fn log_alert(&self, pod_name: &str, namespace: &str, sent_email: bool, sent_chat: bool) {
        warn!(
            event = "alert_fired",
            instance = %self.instance,
            pod_name = %pod_name,
            namespace = %namespace,
            sent_email = sent_email,
            sent_chat = sent_chat,
            "Resource alert fired"
        );
    }

    pub fn log_cycle_failure(&self, namespace: &str, pod_name: Option<&str>, error: &str) {
        warn!(
            event = "cycle_failed",
            instance = %self.instance,
            namespace = %namespace,
            pod_name = ?pod_name,
            error = %error,
            "Monitoring cycle step failed"
        );
    }
}
