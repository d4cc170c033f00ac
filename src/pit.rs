//! Point-in-time filtering.
//!
//! A point-in-time view as of `decision_time` may only contain rows that were
//! knowable at that instant. Every consumer that reconstructs "what was known
//! then" routes candidate rows through [`filter_point_in_time`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A time-stamped fact candidate.
///
/// `as_of` is the real-world reference time of the fact; `available_at` is
/// when it became knowable. A row without a valid `available_at` can never
/// pass the filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub entity_id: String,
    #[serde(default)]
    pub as_of: Option<DateTime<Utc>>,
    #[serde(default)]
    pub available_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Row {
    pub fn new(entity_id: impl Into<String>, available_at: Option<DateTime<Utc>>) -> Self {
        Self {
            entity_id: entity_id.into(),
            as_of: None,
            available_at,
            attributes: Map::new(),
        }
    }

    /// Build a row from loosely typed JSON.
    ///
    /// Timestamps that are missing, non-string, or not RFC 3339 become `None`
    /// rather than failing the whole batch. A non-object value yields `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let mut attributes = object.clone();
        let entity_id = match attributes.remove("entity_id") {
            Some(Value::String(s)) => s,
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        let as_of = attributes.remove("as_of").as_ref().and_then(parse_timestamp);
        let available_at = attributes
            .remove("available_at")
            .as_ref()
            .and_then(parse_timestamp);
        Some(Self {
            entity_id,
            as_of,
            available_at,
            attributes,
        })
    }
}

/// Parse an RFC 3339 timestamp from a JSON value.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let raw = value.as_str()?;
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Rows knowable at `decision_time`, ordered by `(available_at, entity_id)`.
///
/// The input is not modified. Ties on both keys keep their input order, so
/// identical inputs always produce identical output.
pub fn filter_point_in_time(rows: &[Row], decision_time: DateTime<Utc>) -> Vec<Row> {
    let mut kept: Vec<Row> = rows
        .iter()
        .filter(|row| matches!(row.available_at, Some(t) if t <= decision_time))
        .cloned()
        .collect();
    kept.sort_by(|a, b| {
        a.available_at
            .cmp(&b.available_at)
            .then_with(|| a.entity_id.cmp(&b.entity_id))
    });
    kept
}
