//! Append-only usage store
//!
//! Samples are written as JSON lines to a single log file and fsynced before
//! `append` returns. The log is never pruned implicitly; `compact` is an
//! explicit opt-in that rewrites it without samples older than a cutoff.
//!
//! Queries scan the log and filter by (pod, namespace, timestamp >= now - window).
//! Series with the same pod name in different namespaces are never merged.

mod record;

#[cfg(test)]
mod tests;

pub use record::{cast_integer, format_timestamp, UsageRecord, ABSENT, TIMESTAMP_FORMAT};

use crate::error::{MonitorError, Result};
use crate::models::{HistoryPoint, UsageSample, UsageWindow};
use chrono::{Local, NaiveDateTime};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default log file name
pub const DEFAULT_STORE_FILE: &str = "k8s_resource_monitor.jsonl";

/// Append-only time-series log of per-pod samples
#[derive(Debug, Clone)]
pub struct UsageStore {
    path: PathBuf,
}

impl UsageStore {
    /// Open a store at `path`; nothing is touched on disk until first use
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the log file and its parent directory if missing (idempotent)
    pub fn init(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    MonitorError::storage(format!("failed to create {}: {}", parent.display(), e))
                })?;
            }
        }

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                MonitorError::storage(format!("failed to open {}: {}", self.path.display(), e))
            })?;

        Ok(())
    }

    /// Append a sample; durable once this returns
    pub fn append(&self, sample: &UsageSample) -> Result<()> {
        self.init()?;

        let record = UsageRecord::from_sample(sample);
        let mut line = serde_json::to_vec(&record).map_err(MonitorError::storage)?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                MonitorError::storage(format!("failed to open {}: {}", self.path.display(), e))
            })?;

        file.write_all(&line).map_err(MonitorError::storage)?;
        file.sync_data().map_err(MonitorError::storage)?;

        debug!(
            pod_name = %sample.pod_name,
            namespace = %sample.namespace,
            cpu = %record.cpu_usage,
            memory = %record.memory_usage,
            "Appended usage sample"
        );
        Ok(())
    }

    /// Average CPU and memory over the last `window`
    pub fn windowed_average(
        &self,
        pod_name: &str,
        namespace: &str,
        window: Duration,
    ) -> Result<UsageWindow> {
        self.windowed_average_at(pod_name, namespace, window, Local::now().naive_local())
    }

    /// Same as `windowed_average` with an explicit reference time
    pub fn windowed_average_at(
        &self,
        pod_name: &str,
        namespace: &str,
        window: Duration,
        now: NaiveDateTime,
    ) -> Result<UsageWindow> {
        let records = self.series(pod_name, namespace, cutoff(now, window)?)?;

        Ok(UsageWindow {
            average_cpu: mean(records.iter().filter_map(UsageRecord::cpu)),
            average_memory: mean(records.iter().filter_map(UsageRecord::memory)),
        })
    }

    /// Ordered (timestamp ascending) history over the last `window`
    ///
    /// Samples with either value absent are skipped. Re-querying yields the
    /// same sequence plus any samples written since.
    pub fn history(
        &self,
        pod_name: &str,
        namespace: &str,
        window: Duration,
    ) -> Result<Vec<HistoryPoint>> {
        self.history_at(pod_name, namespace, window, Local::now().naive_local())
    }

    /// Same as `history` with an explicit reference time
    pub fn history_at(
        &self,
        pod_name: &str,
        namespace: &str,
        window: Duration,
        now: NaiveDateTime,
    ) -> Result<Vec<HistoryPoint>> {
        let mut records = self.series(pod_name, namespace, cutoff(now, window)?)?;
        // Stable: equal timestamps keep insertion order
        records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

        Ok(records
            .iter()
            .filter_map(|r| match (r.cpu(), r.memory()) {
                (Some(cpu), Some(memory)) => Some(HistoryPoint { cpu, memory }),
                _ => None,
            })
            .collect())
    }

    /// Drop samples older than `max_age`, returning how many were removed
    pub fn compact(&self, max_age: Duration) -> Result<usize> {
        self.compact_at(max_age, Local::now().naive_local())
    }

    /// Same as `compact` with an explicit reference time
    pub fn compact_at(&self, max_age: Duration, now: NaiveDateTime) -> Result<usize> {
        self.init()?;
        let threshold = cutoff(now, max_age)?;

        let records = self.read_all()?;
        let total = records.len();
        let kept: Vec<UsageRecord> = records
            .into_iter()
            .filter(|r| r.timestamp >= threshold)
            .collect();
        let removed = total - kept.len();

        if removed == 0 {
            return Ok(0);
        }

        let mut data = Vec::new();
        for record in &kept {
            serde_json::to_writer(&mut data, record).map_err(MonitorError::storage)?;
            data.push(b'\n');
        }

        // Write atomically using temp file
        let temp_path = self.path.with_extension("tmp");
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| {
                MonitorError::storage(format!("failed to create {}: {}", temp_path.display(), e))
            })?;
        file.write_all(&data).map_err(MonitorError::storage)?;
        file.sync_all().map_err(MonitorError::storage)?;

        std::fs::rename(&temp_path, &self.path).map_err(|e| {
            MonitorError::storage(format!(
                "failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        info!(
            path = %self.path.display(),
            removed,
            kept = kept.len(),
            "Compacted usage store"
        );
        Ok(removed)
    }

    /// Records of one series at or after `threshold`, in log order
    fn series(&self, pod_name: &str, namespace: &str, threshold: String) -> Result<Vec<UsageRecord>> {
        self.init()?;
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|r| r.belongs_to(pod_name, namespace) && r.timestamp >= threshold)
            .collect())
    }

    fn read_all(&self) -> Result<Vec<UsageRecord>> {
        let file = File::open(&self.path).map_err(|e| {
            MonitorError::storage(format!("failed to open {}: {}", self.path.display(), e))
        })?;

        let mut records = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(MonitorError::storage)?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<UsageRecord>(&line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(
                        path = %self.path.display(),
                        line = idx + 1,
                        error = %e,
                        "Skipping malformed usage record"
                    );
                }
            }
        }
        Ok(records)
    }
}

fn cutoff(now: NaiveDateTime, window: Duration) -> Result<String> {
    let window = chrono::Duration::from_std(window)
        .map_err(|e| MonitorError::Config(format!("window out of range: {}", e)))?;
    let start = now
        .checked_sub_signed(window)
        .unwrap_or(NaiveDateTime::MIN);
    Ok(format_timestamp(&start))
}

fn mean(values: impl Iterator<Item = i64>) -> Option<f64> {
    let (sum, count) = values.fold((0f64, 0usize), |(s, c), v| (s + v as f64, c + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}
