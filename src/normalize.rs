//! Source-specific normalization into time-series points.
//!
//! Only `fred` and `ecos` payloads have normalization rules; every other
//! source yields no points. Malformed observations are skipped individually.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use crate::domain::SeriesPoint;

/// Sources that have a normalizer.
pub const NORMALIZED_SOURCES: [&str; 2] = ["fred", "ecos"];

/// Normalize a fetched payload into series points sorted by `as_of`.
///
/// Accepts either the vendor body itself or an envelope of the form
/// `{"source": .., "entity_id": .., "payload": {..}}`.
pub fn normalize_payload(
    source: &str,
    payload: &Value,
    entity_id: &str,
    available_at: DateTime<Utc>,
    lineage_id: &str,
) -> Vec<SeriesPoint> {
    let body = match payload.get("payload") {
        Some(inner) if inner.is_object() => inner,
        _ => payload,
    };

    let mut points = match source {
        "fred" => normalize_fred(body, entity_id, available_at, lineage_id),
        "ecos" => normalize_ecos(body, entity_id, available_at, lineage_id),
        _ => Vec::new(),
    };
    points.sort_by_key(|p| p.as_of);
    points
}

fn normalize_fred(
    body: &Value,
    entity_id: &str,
    available_at: DateTime<Utc>,
    lineage_id: &str,
) -> Vec<SeriesPoint> {
    let Some(observations) = body.get("observations").and_then(Value::as_array) else {
        return Vec::new();
    };

    observations
        .iter()
        .filter(|obs| obs.is_object())
        .filter_map(|obs| {
            let as_of = obs.get("date").and_then(parse_period)?;
            let value = obs.get("value").and_then(parse_number)?;
            Some(SeriesPoint {
                source: "fred".to_string(),
                entity_id: entity_id.to_string(),
                metric_key: entity_id.to_string(),
                as_of,
                available_at,
                value,
                lineage_id: lineage_id.to_string(),
            })
        })
        .collect()
}

fn normalize_ecos(
    body: &Value,
    entity_id: &str,
    available_at: DateTime<Utc>,
    lineage_id: &str,
) -> Vec<SeriesPoint> {
    let Some(rows) = body
        .get("StatisticSearch")
        .and_then(|s| s.get("row"))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    rows.iter()
        .filter(|row| row.is_object())
        .filter_map(|row| {
            let metric_key = first_present(row, &["ITEM_NAME1", "ITEM_CODE1"])
                .map(display_value)
                .unwrap_or_else(|| entity_id.to_string());
            let as_of = first_present(row, &["TIME", "TRM", "date"]).and_then(parse_period)?;
            let value = first_present(row, &["DATA_VALUE", "value"]).and_then(parse_number)?;
            Some(SeriesPoint {
                source: "ecos".to_string(),
                entity_id: entity_id.to_string(),
                metric_key,
                as_of,
                available_at,
                value,
                lineage_id: lineage_id.to_string(),
            })
        })
        .collect()
}

/// First field among `keys` holding a non-empty, non-null value.
fn first_present<'a>(row: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().filter_map(|k| row.get(*k)).find(|v| is_present(v))
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parse an observation period into a UTC instant.
///
/// Supported: `YYYY-MM-DD`, `YYYYMM`, `YYYY-MM`, `YYYYMMDD`, `YYYY`,
/// quarters (`2024Q3`, `2024-Q1`), and RFC 3339 timestamps.
pub fn parse_period(value: &Value) -> Option<DateTime<Utc>> {
    let raw = value.as_str()?.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(midnight(date));
    }
    if raw.len() == 6 && raw.bytes().all(|b| b.is_ascii_digit()) {
        return month_start(&raw[..4], &raw[4..]);
    }
    if raw.len() == 7 && raw.as_bytes()[4] == b'-' {
        if let Some(dt) = month_start(&raw[..4], &raw[5..]) {
            return Some(dt);
        }
    }
    if raw.len() == 8 && raw.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y%m%d") {
            return Some(midnight(date));
        }
    }
    if raw.len() == 4 && raw.bytes().all(|b| b.is_ascii_digit()) {
        return month_start(raw, "01");
    }
    if let Some(dt) = parse_quarter(raw) {
        return Some(dt);
    }

    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_quarter(raw: &str) -> Option<DateTime<Utc>> {
    let upper = raw.to_ascii_uppercase();
    let (year, quarter) = upper.split_once('Q')?;
    let year = year.strip_suffix('-').unwrap_or(year);
    if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let quarter: u32 = match quarter {
        "1" | "2" | "3" | "4" => quarter.parse().ok()?,
        _ => return None,
    };
    let month = (quarter - 1) * 3 + 1;
    month_start(year, &format!("{month:02}"))
}

fn month_start(year: &str, month: &str) -> Option<DateTime<Utc>> {
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1).map(midnight)
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .unwrap_or_default()
}

/// Parse a numeric observation. Vendor placeholders for missing data
/// (`""`, `"."`, `"NA"`, `"NaN"`) yield `None`.
pub fn parse_number(value: &Value) -> Option<f64> {
    let v = match value {
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let cleaned = s.trim();
            if matches!(cleaned, "" | "." | "NA" | "NaN") {
                return None;
            }
            cleaned.parse::<f64>().ok()?
        }
        _ => return None,
    };
    if v.is_finite() { Some(v) } else { None }
}
