//! In-memory repository for dry runs and tests.

use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use serde_json::Value;

use crate::domain::{QuarantineReason, RunRecord, SeriesPoint, StoreCounts};
use crate::error::StoreError;
use crate::store::{MacroSeriesSink, Repository, RunHistory};

/// A quarantined payload together with its reason code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuarantineEvent {
    pub reason: QuarantineReason,
    pub payload: Value,
}

#[derive(Debug, Default)]
struct Tables {
    raw_events: Vec<Value>,
    canonical_events: Vec<Value>,
    quarantine_events: Vec<QuarantineEvent>,
    macro_series_points: Vec<SeriesPoint>,
    runs: Vec<RunRecord>,
}

/// Repository, series sink, and run history backed by plain vectors.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    tables: Mutex<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Poisoned("memory repository"))
    }

    pub fn raw_events(&self) -> Result<Vec<Value>, StoreError> {
        Ok(self.tables()?.raw_events.clone())
    }

    pub fn canonical_events(&self) -> Result<Vec<Value>, StoreError> {
        Ok(self.tables()?.canonical_events.clone())
    }

    pub fn quarantine_events(&self) -> Result<Vec<QuarantineEvent>, StoreError> {
        Ok(self.tables()?.quarantine_events.clone())
    }

    pub fn macro_series_points(&self) -> Result<Vec<SeriesPoint>, StoreError> {
        Ok(self.tables()?.macro_series_points.clone())
    }

    pub fn runs(&self) -> Result<Vec<RunRecord>, StoreError> {
        Ok(self.tables()?.runs.clone())
    }

    /// Most recent canonical facts for `source` / `metric_name`, oldest first.
    pub fn read_canonical_facts(
        &self,
        source: &str,
        metric_name: &str,
        limit: usize,
    ) -> Result<Vec<Value>, StoreError> {
        let tables = self.tables()?;
        let matching: Vec<&Value> = tables
            .canonical_events
            .iter()
            .filter(|row| {
                row.get("source").and_then(Value::as_str) == Some(source)
                    && row.get("metric_name").and_then(Value::as_str) == Some(metric_name)
            })
            .collect();
        let skip = matching.len().saturating_sub(limit);
        Ok(matching.into_iter().skip(skip).cloned().collect())
    }
}

impl Repository for MemoryRepository {
    fn write_raw(&self, row: &Value) -> Result<(), StoreError> {
        self.tables()?.raw_events.push(row.clone());
        Ok(())
    }

    fn write_canonical(&self, row: &Value) -> Result<(), StoreError> {
        self.tables()?.canonical_events.push(row.clone());
        Ok(())
    }

    fn write_quarantine(&self, reason: QuarantineReason, payload: &Value) -> Result<(), StoreError> {
        self.tables()?.quarantine_events.push(QuarantineEvent {
            reason,
            payload: payload.clone(),
        });
        Ok(())
    }

    fn snapshot_counts(&self) -> Result<StoreCounts, StoreError> {
        let tables = self.tables()?;
        Ok(StoreCounts {
            raw_events: tables.raw_events.len(),
            canonical_events: tables.canonical_events.len(),
            quarantine_events: tables.quarantine_events.len(),
        })
    }

    fn macro_series(&self) -> Option<&dyn MacroSeriesSink> {
        Some(self)
    }
}

impl MacroSeriesSink for MemoryRepository {
    fn write_macro_series_points(&self, points: &[SeriesPoint]) -> Result<usize, StoreError> {
        self.tables()?.macro_series_points.extend_from_slice(points);
        Ok(points.len())
    }
}

impl RunHistory for MemoryRepository {
    fn write_run_history(&self, run: &RunRecord) -> Result<(), StoreError> {
        self.tables()?.runs.push(run.clone());
        Ok(())
    }
}
