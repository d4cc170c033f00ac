//! Ingestion orchestration.
//!
//! - `job`: one batch through both gates, the revision store, and the repository
//! - `run`: a manual run wrapping one job with an id, timestamps, and a status

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::gate::{BatchMetrics, SourceDescriptor};
use crate::pit::Row;

pub mod job;
pub mod run;

pub use job::run_ingestion_job;
pub use run::{RunOutcome, run_manual_update};

/// Everything a single ingestion needs from the caller.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub source: SourceDescriptor,
    pub metrics: BatchMetrics,
    pub idempotency_key: String,
    pub payload: Value,
    pub rows: Vec<Row>,
    pub decision_time: DateTime<Utc>,
}
