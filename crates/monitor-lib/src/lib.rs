//! Kubernetes pod resource monitor
//!
//! This crate provides the core functionality for:
//! - Per-pod usage sampling from the cluster (or a mock fixture)
//! - An append-only usage store with windowed queries
//! - Trend-based scaling recommendations
//! - Autoscaler (HPA) reconciliation
//! - Threshold alerts over email and chat
//! - Health checks and observability

pub mod alert;
pub mod config;
pub mod cycle;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod recommend;
pub mod reconcile;
pub mod source;
pub mod store;

pub use error::{MonitorError, Result, TransportError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{MonitorMetrics, StructuredLogger};
