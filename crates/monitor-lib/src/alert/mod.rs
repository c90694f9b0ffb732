//! Threshold alerts for operators
//!
//! This module provides:
//! - Threshold evaluation of current per-pod averages
//! - Email (SMTP) and chat webhook delivery
//! - Independent, best-effort dispatch per configured channel

mod evaluator;
mod notifier;

pub use evaluator::{check_thresholds, AlertEvaluator, AlertMessage, AlertOutcome, Breach};
pub use notifier::{AlertChannel, AlertChannels, EmailNotifier, Notifier, WebhookNotifier};
