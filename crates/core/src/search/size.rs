//! Tolerant parsing of indexer-reported sizes and counts.
//!
//! Indexers report sizes as human-readable strings ("1.5 GiB") and
//! counts as numeric-looking strings. A malformed value never fails a
//! source; it parses to 0.

/// Parse a `"<value> <unit>"` size string into bytes.
///
/// Recognized units: KiB, MiB, GiB, TiB (case-insensitive). A bare or
/// unrecognized unit keeps the multiplier at 1; anything malformed
/// parses to 0.
pub fn parse_size(size: &str) -> u64 {
    let mut parts = size.split_whitespace();
    let (Some(value), Some(unit)) = (parts.next(), parts.next()) else {
        return 0;
    };
    if parts.next().is_some() {
        return 0;
    }

    let Ok(value) = value.parse::<f64>() else {
        return 0;
    };
    if !value.is_finite() || value < 0.0 {
        return 0;
    }

    let multiplier: u64 = match unit.to_ascii_uppercase().as_str() {
        "KIB" => 1024,
        "MIB" => 1024 * 1024,
        "GIB" => 1024 * 1024 * 1024,
        "TIB" => 1024u64.pow(4),
        _ => 1,
    };

    (value * multiplier as f64) as u64
}

/// Parse a numeric-looking count, defaulting to 0.
pub fn parse_count(s: &str) -> u32 {
    s.trim().parse().unwrap_or(0)
}

/// Coerce a JSON value (number, numeric string, or anything else) into
/// a count.
pub fn count_from_json(value: &serde_json::Value) -> u32 {
    match value {
        serde_json::Value::Number(n) => n.as_u64().unwrap_or(0).min(u32::MAX as u64) as u32,
        serde_json::Value::String(s) => parse_count(s),
        _ => 0,
    }
}
