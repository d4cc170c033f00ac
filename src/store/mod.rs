//! Storage collaborators consumed by the ingestion core.
//!
//! - `Repository`: raw / canonical / quarantine writes plus counters
//! - `MacroSeriesSink`: optional capability for normalized series points
//! - `RunHistory`: durable run records
//! - `revision`: content-addressed revision tracking with injectable backends
//! - `retention`: TTLs per data tier
//!
//! Two implementations ship with the crate: `MemoryRepository` for dry runs and
//! tests, and `SqliteStore` for persistent use.

use serde_json::Value;

use crate::domain::{QuarantineReason, RunRecord, SeriesPoint, StoreCounts};
use crate::error::StoreError;

pub mod memory;
pub mod retention;
pub mod revision;
pub mod sqlite;

pub use memory::MemoryRepository;
pub use retention::DataTier;
pub use revision::{MemoryRevisionBackend, PutResult, PutStatus, RevisionBackend, RevisionStore};
pub use sqlite::SqliteStore;

/// Write path for ingested payloads.
///
/// `write_raw` must be insert-only: implementations never update or delete a
/// raw row once written.
pub trait Repository {
    fn write_raw(&self, row: &Value) -> Result<(), StoreError>;

    fn write_canonical(&self, row: &Value) -> Result<(), StoreError>;

    fn write_quarantine(&self, reason: QuarantineReason, payload: &Value) -> Result<(), StoreError>;

    fn snapshot_counts(&self) -> Result<StoreCounts, StoreError>;

    /// Series-point capability, if this repository supports it.
    fn macro_series(&self) -> Option<&dyn MacroSeriesSink> {
        None
    }
}

pub trait MacroSeriesSink {
    /// Bulk insert; returns the number of points written.
    fn write_macro_series_points(&self, points: &[SeriesPoint]) -> Result<usize, StoreError>;
}

pub trait RunHistory {
    fn write_run_history(&self, run: &RunRecord) -> Result<(), StoreError>;
}
