//! Kubernetes resource quantity parsing
//!
//! Metrics-server reports CPU as `"<n>n"` nanocores (sometimes `"m"` or
//! whole cores) and memory as `"<n>Ki"`. Both are normalised to integers:
//! CPU to millicores, memory to KiB.

/// Parse a CPU quantity into millicores
pub fn parse_cpu_millicores(quantity: &str) -> Option<u64> {
    let q = quantity.trim();
    if q.is_empty() {
        return None;
    }

    // (digits, multiplier, divisor) so that whole-core values stay exact
    let (number, multiplier, divisor) = if let Some(n) = q.strip_suffix('n') {
        (n, 1.0, 1_000_000.0)
    } else if let Some(n) = q.strip_suffix('u') {
        (n, 1.0, 1_000.0)
    } else if let Some(n) = q.strip_suffix('m') {
        (n, 1.0, 1.0)
    } else {
        (q, 1_000.0, 1.0)
    };

    let value: f64 = number.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some((value * multiplier / divisor) as u64)
}

/// Parse a memory quantity into KiB
pub fn parse_memory_kib(quantity: &str) -> Option<u64> {
    let q = quantity.trim();
    if q.is_empty() {
        return None;
    }

    const SUFFIXES: &[(&str, f64)] = &[
        ("Ki", 1024.0),
        ("Mi", 1024.0 * 1024.0),
        ("Gi", 1024.0 * 1024.0 * 1024.0),
        ("Ti", 1024.0 * 1024.0 * 1024.0 * 1024.0),
        ("k", 1e3),
        ("M", 1e6),
        ("G", 1e9),
        ("T", 1e12),
    ];

    let (number, multiplier) = SUFFIXES
        .iter()
        .find_map(|(suffix, mult)| q.strip_suffix(suffix).map(|n| (n, *mult)))
        .unwrap_or((q, 1.0));

    let value: f64 = number.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some((value * multiplier / 1024.0) as u64)
}
