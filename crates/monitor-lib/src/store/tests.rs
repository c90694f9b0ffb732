//! Tests for the usage store
//!
//! Every test writes to its own temporary directory and pins the reference
//! time so window boundaries are deterministic.

use super::*;
use chrono::{NaiveDate, NaiveDateTime};
use std::time::Duration;
use tempfile::TempDir;

const TEN_MINUTES: Duration = Duration::from_secs(10 * 60);
const ONE_HOUR: Duration = Duration::from_secs(60 * 60);

fn base_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

fn minutes_ago(minutes: i64) -> NaiveDateTime {
    base_time() - chrono::Duration::minutes(minutes)
}

fn store_in(dir: &TempDir) -> UsageStore {
    UsageStore::open(dir.path().join("usage.jsonl"))
}

fn sample(pod: &str, ns: &str, cpu: f64, memory: f64, at: NaiveDateTime) -> UsageSample {
    UsageSample::at(pod, ns, Some(cpu), Some(memory), at)
}

#[test]
fn test_append_then_history_round_trip() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    store
        .append(&sample("api", "default", 42.9, 1024.5, base_time()))
        .unwrap();

    let history = store
        .history_at("api", "default", ONE_HOUR, base_time())
        .unwrap();
    assert_eq!(history, vec![HistoryPoint { cpu: 42, memory: 1024 }]);
}

#[test]
fn test_append_with_current_time_is_visible() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    store
        .append(&UsageSample::new("api", "default", Some(80.0), Some(50.0)))
        .unwrap();

    let history = store.history("api", "default", ONE_HOUR).unwrap();
    assert_eq!(history, vec![HistoryPoint { cpu: 80, memory: 50 }]);

    let window = store.windowed_average("api", "default", TEN_MINUTES).unwrap();
    assert_eq!(window.average_cpu, Some(80.0));
    assert_eq!(window.average_memory, Some(50.0));
}

#[test]
fn test_history_is_timestamp_ascending() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    // Appended out of timestamp order
    store.append(&sample("api", "default", 3.0, 30.0, minutes_ago(1))).unwrap();
    store.append(&sample("api", "default", 1.0, 10.0, minutes_ago(30))).unwrap();
    store.append(&sample("api", "default", 2.0, 20.0, minutes_ago(5))).unwrap();

    let cpus: Vec<i64> = store
        .history_at("api", "default", ONE_HOUR, base_time())
        .unwrap()
        .iter()
        .map(|p| p.cpu)
        .collect();
    assert_eq!(cpus, vec![1, 2, 3]);
}

#[test]
fn test_equal_timestamps_keep_insertion_order() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    for cpu in [5.0, 6.0, 7.0] {
        store.append(&sample("api", "default", cpu, 1.0, base_time())).unwrap();
    }

    let cpus: Vec<i64> = store
        .history_at("api", "default", ONE_HOUR, base_time())
        .unwrap()
        .iter()
        .map(|p| p.cpu)
        .collect();
    assert_eq!(cpus, vec![5, 6, 7]);
}

#[test]
fn test_history_excludes_samples_outside_window() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    store.append(&sample("api", "default", 10.0, 10.0, minutes_ago(90))).unwrap();
    store.append(&sample("api", "default", 20.0, 20.0, minutes_ago(60))).unwrap();
    store.append(&sample("api", "default", 30.0, 30.0, minutes_ago(15))).unwrap();

    let history = store
        .history_at("api", "default", ONE_HOUR, base_time())
        .unwrap();
    // The boundary sample (exactly 60 minutes old) is inside the window
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].cpu, 20);

    let window = store
        .windowed_average_at("api", "default", TEN_MINUTES, base_time())
        .unwrap();
    assert_eq!(window, UsageWindow::default());
}

#[test]
fn test_windowed_average_truncates_before_averaging() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    store.append(&sample("api", "default", 10.9, 100.9, minutes_ago(2))).unwrap();
    store.append(&sample("api", "default", 11.9, 101.9, minutes_ago(1))).unwrap();

    let window = store
        .windowed_average_at("api", "default", TEN_MINUTES, base_time())
        .unwrap();
    // (10 + 11) / 2, not (10.9 + 11.9) / 2
    assert_eq!(window.average_cpu, Some(10.5));
    assert_eq!(window.average_memory, Some(100.5));
}

#[test]
fn test_windowed_average_empty_series_is_absent() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    let window = store
        .windowed_average_at("ghost", "default", TEN_MINUTES, base_time())
        .unwrap();
    assert!(window.average_cpu.is_none());
    assert!(window.average_memory.is_none());

    let history = store
        .history_at("ghost", "default", ONE_HOUR, base_time())
        .unwrap();
    assert!(history.is_empty());
}

#[test]
fn test_series_isolated_by_namespace() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    store.append(&sample("api", "prod", 90.0, 90.0, minutes_ago(1))).unwrap();
    store.append(&sample("api", "staging", 10.0, 10.0, minutes_ago(1))).unwrap();

    let prod = store
        .windowed_average_at("api", "prod", TEN_MINUTES, base_time())
        .unwrap();
    let staging = store
        .windowed_average_at("api", "staging", TEN_MINUTES, base_time())
        .unwrap();

    assert_eq!(prod.average_cpu, Some(90.0));
    assert_eq!(staging.average_cpu, Some(10.0));
}

#[test]
fn test_absent_usage_is_persisted_and_skipped() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    store
        .append(&UsageSample::at("mock-pod-1", "default", None, None, minutes_ago(1)))
        .unwrap();

    let raw = std::fs::read_to_string(store.path()).unwrap();
    assert!(raw.contains("\"cpu_usage\":\"N/A\""));

    let window = store
        .windowed_average_at("mock-pod-1", "default", TEN_MINUTES, base_time())
        .unwrap();
    assert_eq!(window, UsageWindow::default());

    let history = store
        .history_at("mock-pod-1", "default", ONE_HOUR, base_time())
        .unwrap();
    assert!(history.is_empty());
}

#[test]
fn test_partially_absent_sample_counts_for_present_metric() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    store
        .append(&UsageSample::at("api", "default", Some(40.0), None, minutes_ago(1)))
        .unwrap();

    let window = store
        .windowed_average_at("api", "default", TEN_MINUTES, base_time())
        .unwrap();
    assert_eq!(window.average_cpu, Some(40.0));
    assert!(window.average_memory.is_none());
}

#[test]
fn test_history_is_restartable() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    store.append(&sample("api", "default", 1.0, 1.0, minutes_ago(3))).unwrap();
    let first = store.history_at("api", "default", ONE_HOUR, base_time()).unwrap();
    let second = store.history_at("api", "default", ONE_HOUR, base_time()).unwrap();
    assert_eq!(first, second);

    store.append(&sample("api", "default", 2.0, 2.0, minutes_ago(2))).unwrap();
    let third = store.history_at("api", "default", ONE_HOUR, base_time()).unwrap();
    assert_eq!(third.len(), 2);
    assert_eq!(&third[..1], &first[..]);
}

#[test]
fn test_init_is_idempotent_and_creates_parents() {
    let dir = TempDir::new().unwrap();
    let store = UsageStore::open(dir.path().join("nested").join("data").join("usage.jsonl"));

    store.init().unwrap();
    store.append(&sample("api", "default", 1.0, 1.0, base_time())).unwrap();
    store.init().unwrap();

    let history = store.history_at("api", "default", ONE_HOUR, base_time()).unwrap();
    assert_eq!(history.len(), 1);
}

#[test]
fn test_queries_on_fresh_store_create_log() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    assert!(!store.path().exists());

    store.history_at("api", "default", ONE_HOUR, base_time()).unwrap();
    assert!(store.path().exists());
}

#[test]
fn test_malformed_lines_are_skipped() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    store.append(&sample("api", "default", 5.0, 5.0, minutes_ago(1))).unwrap();
    {
        let mut file = OpenOptions::new().append(true).open(store.path()).unwrap();
        file.write_all(b"{not json\n\n").unwrap();
    }
    store.append(&sample("api", "default", 7.0, 7.0, minutes_ago(1))).unwrap();

    let history = store.history_at("api", "default", ONE_HOUR, base_time()).unwrap();
    assert_eq!(history.len(), 2);
}

#[test]
fn test_append_to_directory_path_is_storage_error() {
    let dir = TempDir::new().unwrap();
    let store = UsageStore::open(dir.path());

    let err = store
        .append(&sample("api", "default", 1.0, 1.0, base_time()))
        .unwrap_err();
    assert!(matches!(err, MonitorError::Storage(_)));
}

#[test]
fn test_compact_drops_old_samples_only() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    store.append(&sample("api", "default", 1.0, 1.0, minutes_ago(120))).unwrap();
    store.append(&sample("api", "default", 2.0, 2.0, minutes_ago(90))).unwrap();
    store.append(&sample("api", "default", 3.0, 3.0, minutes_ago(5))).unwrap();

    let removed = store.compact_at(ONE_HOUR, base_time()).unwrap();
    assert_eq!(removed, 2);

    let all = store
        .history_at("api", "default", Duration::from_secs(24 * 3600), base_time())
        .unwrap();
    assert_eq!(all, vec![HistoryPoint { cpu: 3, memory: 3 }]);

    // Nothing left to remove
    assert_eq!(store.compact_at(ONE_HOUR, base_time()).unwrap(), 0);
}
