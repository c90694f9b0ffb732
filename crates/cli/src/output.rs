//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use monitor_lib::cycle::{NamespaceReport, NamespaceStatus, ReconcileOutcome};
use monitor_lib::models::ScalingDirection;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print rows as a table, or `value` as JSON
pub fn print_rows<T: Tabled, V: Serialize + ?Sized>(rows: &[T], value: &V, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if rows.is_empty() {
                println!("{}", "No items found".yellow());
                return;
            }
            let table = Table::new(rows).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => print_json(value),
    }
}

pub fn print_json<V: Serialize + ?Sized>(value: &V) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => print_error(&format!("Failed to serialize output: {}", e)),
    }
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// One-line status per namespace, printed ahead of the pod table
pub fn print_namespace_status(ns: &NamespaceReport) {
    match &ns.status {
        NamespaceStatus::Ok => print_info(&format!(
            "Fetched {} pods in namespace: {}",
            ns.pods.len(),
            ns.namespace
        )),
        NamespaceStatus::Empty => {
            print_warning(&format!("No pods found in namespace: {}", ns.namespace))
        }
        NamespaceStatus::Failed { message, .. } => {
            print_error(&format!("Namespace {} failed: {}", ns.namespace, message))
        }
    }
}

/// Join a history series for a table cell
pub fn format_series(values: impl Iterator<Item = i64>) -> String {
    values.map(|v| v.to_string()).collect::<Vec<_>>().join(", ")
}

pub fn color_direction(direction: ScalingDirection, text: &str) -> String {
    match direction {
        ScalingDirection::Up => text.red().to_string(),
        ScalingDirection::Down => text.green().to_string(),
        ScalingDirection::None => text.to_string(),
    }
}

pub fn color_reconcile(outcome: &ReconcileOutcome) -> String {
    let text = outcome.to_string();
    match outcome {
        ReconcileOutcome::Applied(_) => text.green().to_string(),
        ReconcileOutcome::Skipped(_) => text.dimmed().to_string(),
        ReconcileOutcome::Failed(_) => text.red().to_string(),
    }
}

pub fn color_phase(phase: &str) -> String {
    match phase.to_lowercase().as_str() {
        "running" | "succeeded" => phase.green().to_string(),
        "pending" => phase.yellow().to_string(),
        "failed" | "unknown" => phase.red().to_string(),
        _ => phase.to_string(),
    }
}
