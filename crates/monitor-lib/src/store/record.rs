//! On-disk record format for usage samples
//!
//! Numeric fields are stored as text and cast back to integers on read.
//! The cast keeps the leading numeric prefix and truncates toward zero, so
//! `"12.9"` reads as `12` and `"250m"` reads as `250`. Text without a numeric
//! prefix (`"N/A"`) reads as absent.

use crate::models::UsageSample;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Timestamp layout, local time with second precision
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Persisted text for absent usage
pub const ABSENT: &str = "N/A";

/// One line of the usage log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub pod_name: String,
    pub namespace: String,
    pub cpu_usage: String,
    pub memory_usage: String,
    pub timestamp: String,
}

impl UsageRecord {
    pub fn from_sample(sample: &UsageSample) -> Self {
        Self {
            pod_name: sample.pod_name.clone(),
            namespace: sample.namespace.clone(),
            cpu_usage: encode_usage(sample.cpu_usage),
            memory_usage: encode_usage(sample.memory_usage),
            timestamp: format_timestamp(&sample.timestamp),
        }
    }

    pub fn belongs_to(&self, pod_name: &str, namespace: &str) -> bool {
        self.pod_name == pod_name && self.namespace == namespace
    }

    pub fn cpu(&self) -> Option<i64> {
        cast_integer(&self.cpu_usage)
    }

    pub fn memory(&self) -> Option<i64> {
        cast_integer(&self.memory_usage)
    }
}

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn encode_usage(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => v.to_string(),
        _ => ABSENT.to_string(),
    }
}

/// Cast stored text to an integer, truncating any fractional part
pub fn cast_integer(text: &str) -> Option<i64> {
    let s = text.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let int_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    let frac_len = match rest.as_bytes().get(int_len) {
        Some(b'.') => rest[int_len + 1..]
            .bytes()
            .take_while(u8::is_ascii_digit)
            .count(),
        _ => 0,
    };

    if int_len == 0 && frac_len == 0 {
        return None;
    }

    let magnitude = if int_len == 0 {
        0
    } else {
        // Saturate like SQLite does on overflow
        rest[..int_len].parse::<i64>().unwrap_or(i64::MAX)
    };

    Some(if negative { -magnitude } else { magnitude })
}
