//! Shared "manual update" logic behind `ingest run-update`.
//!
//! The CLI handler does the fetching and printing; this module turns a fetched
//! payload into a `JobRequest` and runs it against the configured store:
//! request -> repository/revisions/history -> run record

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::config::DatabaseTarget;
use crate::data::SourceKind;
use crate::domain::RunRecord;
use crate::error::{AppError, EXIT_CONFIG};
use crate::gate::{BatchMetrics, BudgetGuard, SourceDescriptor};
use crate::ingest::{JobRequest, run_manual_update};
use crate::pit::Row;
use crate::store::{MemoryRepository, Repository, RevisionStore, RunHistory, SqliteStore};

/// Descriptor used for manual runs of the built-in public sources.
pub fn default_descriptor(kind: SourceKind) -> SourceDescriptor {
    SourceDescriptor {
        name: kind.name().to_string(),
        utility: 5,
        reliability: 4,
        legal: 4,
        cost: 3,
        maintenance: 3,
    }
}

/// `"{source}|{entity}|{YYYY-MM-DD}|manual"`: one revision chain per entity per day.
pub fn manual_idempotency_key(kind: SourceKind, entity_id: &str, now: DateTime<Utc>) -> String {
    format!("{}|{}|{}|manual", kind.name(), entity_id, now.format("%Y-%m-%d"))
}

/// Charge `cost` against a guard capped at `monthly_cap`.
///
/// A frozen guard is a configuration error: the fetch must not happen.
pub fn check_budget(monthly_cap: f64, cost: f64) -> Result<BudgetGuard, AppError> {
    if !cost.is_finite() || cost < 0.0 {
        return Err(AppError::new(EXIT_CONFIG, format!("Invalid fetch cost {cost}.")));
    }
    let mut guard = BudgetGuard::new(monthly_cap);
    guard.record_spend(cost);
    if guard.is_frozen() {
        return Err(AppError::new(
            EXIT_CONFIG,
            format!(
                "Budget frozen: fetch cost {cost} exceeds the monthly cap {monthly_cap} \
                 (INGEST_MONTHLY_COST_CAP)."
            ),
        ));
    }
    Ok(guard)
}

/// Build the job for one fetched payload.
///
/// Without explicit rows the entity itself is the single candidate row,
/// available as of `now`.
pub fn build_request(
    kind: SourceKind,
    entity_id: &str,
    payload: Value,
    rows: Option<Vec<Row>>,
    now: DateTime<Utc>,
) -> JobRequest {
    let rows = rows.unwrap_or_else(|| vec![Row::new(entity_id, Some(now))]);
    JobRequest {
        source: default_descriptor(kind),
        metrics: BatchMetrics::PASSING,
        idempotency_key: manual_idempotency_key(kind, entity_id, now),
        payload,
        rows,
        decision_time: now,
    }
}

/// Run `request` against the configured database.
///
/// SQLite backs the repository, the revision history, and the run history.
/// Without a database everything lives in memory and the run is not recorded.
pub fn execute(request: &JobRequest, target: &DatabaseTarget) -> Result<RunRecord, AppError> {
    match target {
        DatabaseTarget::Memory => {
            let repository = MemoryRepository::new();
            let revisions = RevisionStore::in_memory();
            Ok(run_manual_update(request, &repository, &revisions, None)?)
        }
        DatabaseTarget::Sqlite(path) => {
            let store = Arc::new(SqliteStore::open(path)?);
            let revisions = RevisionStore::new(Box::new(Arc::clone(&store)));
            let repository: &dyn Repository = store.as_ref();
            let history: &dyn RunHistory = store.as_ref();
            Ok(run_manual_update(request, repository, &revisions, Some(history))?)
        }
    }
}
