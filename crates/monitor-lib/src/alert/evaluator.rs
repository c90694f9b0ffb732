//! Threshold evaluation and alert dispatch
//!
//! One evaluation produces at most one message per channel, combining every
//! breached threshold. There is no suppression across evaluations: a pod that
//! stays above threshold is re-alerted every cycle.

use super::notifier::{AlertChannel, AlertChannels, Notifier};
use crate::config::AlertThresholds;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// KiB per Mi; stored memory values are KiB
const KIB_PER_MIB: f64 = 1024.0;

/// Which threshold was crossed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Breach {
    Cpu { value: f64, threshold: f64 },
    Memory { value_mib: f64, threshold_mib: f64 },
}

/// Rendered alert for one pod
#[derive(Debug, Clone, PartialEq)]
pub struct AlertMessage {
    pub subject: String,
    pub body: String,
    pub breaches: Vec<Breach>,
}

/// What an evaluation delivered
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertOutcome {
    pub breaches: Vec<Breach>,
    pub sent_email: bool,
    pub sent_chat: bool,
    /// Channels that were attempted and failed
    pub failed: Vec<AlertChannel>,
}

impl AlertOutcome {
    pub fn triggered(&self) -> bool {
        !self.breaches.is_empty()
    }
}

/// Compare current averages against thresholds and render a message
pub fn check_thresholds(
    pod_name: &str,
    avg_cpu: f64,
    avg_memory_kib: f64,
    thresholds: &AlertThresholds,
) -> Option<AlertMessage> {
    let mut breaches = Vec::new();
    let mut body = String::new();

    if avg_cpu > thresholds.cpu_threshold {
        body.push_str(&format!(
            "CPU usage on {} is at {}% (Threshold: {}%)\n",
            pod_name, avg_cpu, thresholds.cpu_threshold
        ));
        breaches.push(Breach::Cpu {
            value: avg_cpu,
            threshold: thresholds.cpu_threshold,
        });
    }

    let memory_mib = avg_memory_kib / KIB_PER_MIB;
    if memory_mib > thresholds.memory_threshold {
        body.push_str(&format!(
            "Memory usage on {} is at {}Mi (Threshold: {}Mi)\n",
            pod_name, memory_mib, thresholds.memory_threshold
        ));
        breaches.push(Breach::Memory {
            value_mib: memory_mib,
            threshold_mib: thresholds.memory_threshold,
        });
    }

    if breaches.is_empty() {
        return None;
    }

    Some(AlertMessage {
        subject: format!("Alert: High Resource Usage on {}", pod_name),
        body,
        breaches,
    })
}

/// Evaluates thresholds and fans alerts out to configured channels
#[derive(Debug, Clone)]
pub struct AlertEvaluator {
    thresholds: AlertThresholds,
    channels: AlertChannels,
}

impl AlertEvaluator {
    pub fn new(thresholds: AlertThresholds, channels: AlertChannels) -> Self {
        Self {
            thresholds,
            channels,
        }
    }

    pub fn thresholds(&self) -> &AlertThresholds {
        &self.thresholds
    }

    /// Evaluate one pod; delivery failures are logged, never returned
    pub async fn evaluate(&self, pod_name: &str, avg_cpu: f64, avg_memory_kib: f64) -> AlertOutcome {
        let Some(message) = check_thresholds(pod_name, avg_cpu, avg_memory_kib, &self.thresholds)
        else {
            return AlertOutcome::default();
        };

        for breach in &message.breaches {
            warn!(pod_name = %pod_name, breach = ?breach, "Resource usage above alert threshold");
        }

        let mut outcome = AlertOutcome {
            breaches: message.breaches.clone(),
            ..Default::default()
        };

        outcome.sent_email = deliver(
            self.channels.email.as_ref(),
            AlertChannel::Email,
            pod_name,
            &message,
            &mut outcome.failed,
        )
        .await;
        outcome.sent_chat = deliver(
            self.channels.chat.as_ref(),
            AlertChannel::Chat,
            pod_name,
            &message,
            &mut outcome.failed,
        )
        .await;

        outcome
    }
}

async fn deliver(
    notifier: Option<&Arc<dyn Notifier>>,
    channel: AlertChannel,
    pod_name: &str,
    message: &AlertMessage,
    failed: &mut Vec<AlertChannel>,
) -> bool {
    let Some(notifier) = notifier else {
        info!(channel = %channel, "Channel not configured, skipping alert");
        return false;
    };

    match notifier.send(&message.subject, &message.body).await {
        Ok(()) => {
            info!(pod_name = %pod_name, channel = %channel, "Alert sent");
            true
        }
        Err(e) => {
            warn!(pod_name = %pod_name, channel = %channel, error = %e, "Alert delivery failed");
            failed.push(channel);
            false
        }
    }
}
