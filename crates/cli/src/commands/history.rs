//! `history`: recorded usage series for one pod

use anyhow::Result;
use monitor_lib::models::HistoryPoint;
use serde::Serialize;
use std::time::Duration;
use tabled::Tabled;

use crate::config::Paths;
use crate::output::{format_series, print_info, print_rows, print_warning, OutputFormat};

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "CPU")]
    cpu: i64,
    #[tabled(rename = "Memory")]
    memory: i64,
}

#[derive(Serialize)]
struct HistoryOutput<'a> {
    pod_name: &'a str,
    namespace: &'a str,
    duration_minutes: u64,
    points: &'a [HistoryPoint],
}

/// Oversized windows saturate; the store rejects what it cannot represent
fn history_window(minutes: u64) -> Duration {
    Duration::from_secs(minutes.saturating_mul(60))
}

pub fn run(
    paths: &Paths,
    namespace: &str,
    pod_name: &str,
    duration_minutes: u64,
    format: OutputFormat,
) -> Result<()> {
    let store = paths.store();
    store.init()?;
    let points = store.history(pod_name, namespace, history_window(duration_minutes))?;

    if points.is_empty() {
        if let OutputFormat::Table = format {
            print_warning(&format!(
                "No usage recorded for {} in namespace {} over the last {} minutes",
                pod_name, namespace, duration_minutes
            ));
            return Ok(());
        }
    }

    let rows: Vec<HistoryRow> = points
        .iter()
        .enumerate()
        .map(|(i, p)| HistoryRow {
            index: i + 1,
            cpu: p.cpu,
            memory: p.memory,
        })
        .collect();
    let output = HistoryOutput {
        pod_name,
        namespace,
        duration_minutes,
        points: &points,
    };

    print_rows(&rows, &output, format);
    if let OutputFormat::Table = format {
        print_info(&format!(
            "CPU: {}",
            format_series(points.iter().map(|p| p.cpu))
        ));
        print_info(&format!(
            "Memory: {}",
            format_series(points.iter().map(|p| p.memory))
        ));
    }
    Ok(())
}
