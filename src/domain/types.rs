//! Shared domain types.
//!
//! These types cross module boundaries (job -> repository -> run history) and
//! are serializable so they can be:
//!
//! - persisted by a repository
//! - printed as the JSON summary of a run
//! - exported to disk for later inspection

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Why a batch was routed to quarantine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuarantineReason {
    SourceGateFailed,
    QualityGateFailed,
}

impl QuarantineReason {
    pub fn as_str(self) -> &'static str {
        match self {
            QuarantineReason::SourceGateFailed => "source_gate_failed",
            QuarantineReason::QualityGateFailed => "quality_gate_failed",
        }
    }
}

impl std::fmt::Display for QuarantineReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized time-series observation.
///
/// `as_of` is the real-world reference date of the value; `available_at` is
/// when the system could first have known it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub source: String,
    pub entity_id: String,
    pub metric_key: String,
    pub as_of: DateTime<Utc>,
    pub available_at: DateTime<Utc>,
    pub value: f64,
    pub lineage_id: String,
}

/// Point-in-time counters reported by a repository.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCounts {
    pub raw_events: usize,
    pub canonical_events: usize,
    pub quarantine_events: usize,
}

/// Audit counters attached to a job result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardCounts {
    pub raw_events: usize,
    pub canonical_events: usize,
    pub quarantine_events: usize,
    pub pit_rows: usize,
    pub macro_series_points_written: usize,
}

impl DashboardCounts {
    pub fn from_store(counts: StoreCounts, pit_rows: usize, macro_series_points_written: usize) -> Self {
        Self {
            raw_events: counts.raw_events,
            canonical_events: counts.canonical_events,
            quarantine_events: counts.quarantine_events,
            pit_rows,
            macro_series_points_written,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub raw_written: usize,
    pub canonical_written: usize,
    pub quarantined: usize,
    pub dashboard: DashboardCounts,
}

/// Terminal status of a manual run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Quarantine,
    Failed,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Quarantine => "quarantine",
            RunStatus::Failed => "failed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "success" => Some(RunStatus::Success),
            "quarantine" => Some(RunStatus::Quarantine),
            "failed" => Some(RunStatus::Failed),
            _ => None,
        }
    }
}

/// Immutable record of one manual run, handed to run history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub source_name: String,
    pub status: RunStatus,
    pub raw_written: usize,
    pub canonical_written: usize,
    pub quarantined: usize,
    pub error_message: Option<String>,
}
