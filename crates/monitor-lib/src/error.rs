//! Error taxonomy for the monitoring engine
//!
//! Every failure the core can surface maps to exactly one variant. The
//! orchestrator decides the blast radius: storage and source failures abort
//! the current namespace, reconcile failures abort a single pod, transport
//! failures are logged and dropped.

use thiserror::Error;

/// Errors produced by the monitoring engine
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Usage store could not be read or written
    #[error("storage error: {0}")]
    Storage(String),

    /// Pod listing or metrics retrieval failed
    #[error("metrics source unavailable: {0}")]
    SourceUnavailable(String),

    /// Autoscaler object lookup or write failed (other than not-found)
    #[error("reconcile error for {name} in {namespace}: {message}")]
    Reconcile {
        name: String,
        namespace: String,
        message: String,
    },

    /// Alert delivery failed
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Invalid configuration value
    #[error("configuration error: {0}")]
    Config(String),
}

/// Alert delivery failure on a single channel
#[derive(Debug, Error)]
#[error("{channel} delivery failed: {message}")]
pub struct TransportError {
    pub channel: &'static str,
    pub message: String,
}

impl TransportError {
    pub fn new(channel: &'static str, message: impl Into<String>) -> Self {
        Self {
            channel,
            message: message.into(),
        }
    }
}

impl MonitorError {
    /// Short label used in metrics and reports
    pub fn kind(&self) -> &'static str {
        match self {
            MonitorError::Storage(_) => "storage",
            MonitorError::SourceUnavailable(_) => "source",
            MonitorError::Reconcile { .. } => "reconcile",
            MonitorError::Transport(_) => "transport",
            MonitorError::Config(_) => "config",
        }
    }

    pub(crate) fn storage(err: impl std::fmt::Display) -> Self {
        MonitorError::Storage(err.to_string())
    }

    pub(crate) fn source(err: impl std::fmt::Display) -> Self {
        MonitorError::SourceUnavailable(err.to_string())
    }

    pub(crate) fn reconcile(name: &str, namespace: &str, err: impl std::fmt::Display) -> Self {
        MonitorError::Reconcile {
            name: name.to_string(),
            namespace: namespace.to_string(),
            message: err.to_string(),
        }
    }
}

pub type Result<T, E = MonitorError> = std::result::Result<T, E>;
