//! SQLite-backed persistence.
//!
//! One `SqliteStore` serves every storage role the pipeline needs:
//!
//! - `Repository` + `MacroSeriesSink` for payload routing
//! - `RunHistory` for run records
//! - `RevisionBackend` for revision hashes that survive restarts
//!
//! The raw event table is insert-only; triggers abort any UPDATE or DELETE.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::{QuarantineReason, RunRecord, RunStatus, SeriesPoint, StoreCounts};
use crate::error::StoreError;
use crate::store::revision::{PutResult, RevisionBackend};
use crate::store::{MacroSeriesSink, Repository, RunHistory};

/// How long a writer waits for another connection's lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS raw_event_store (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source TEXT NOT NULL,
    entity_id TEXT NOT NULL,
    lineage_id TEXT,
    ingested_at TEXT NOT NULL,
    payload TEXT NOT NULL
);
CREATE TRIGGER IF NOT EXISTS raw_event_store_no_update
BEFORE UPDATE ON raw_event_store
BEGIN
    SELECT RAISE(ABORT, 'raw_event_store is insert-only');
END;
CREATE TRIGGER IF NOT EXISTS raw_event_store_no_delete
BEFORE DELETE ON raw_event_store
BEGIN
    SELECT RAISE(ABORT, 'raw_event_store is insert-only');
END;
CREATE TABLE IF NOT EXISTS canonical_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source TEXT NOT NULL,
    entity_id TEXT NOT NULL,
    written_at TEXT NOT NULL,
    payload TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS quarantine_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    reason TEXT NOT NULL,
    written_at TEXT NOT NULL,
    payload TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS macro_series_points (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source TEXT NOT NULL,
    entity_id TEXT NOT NULL,
    metric_key TEXT NOT NULL,
    as_of TEXT NOT NULL,
    available_at TEXT NOT NULL,
    value REAL NOT NULL,
    lineage_id TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS macro_series_points_metric
    ON macro_series_points (metric_key, as_of);
CREATE TABLE IF NOT EXISTS ingestion_runs (
    run_id TEXT PRIMARY KEY,
    started_at TEXT NOT NULL,
    finished_at TEXT NOT NULL,
    source_name TEXT NOT NULL,
    status TEXT NOT NULL,
    raw_written INTEGER NOT NULL,
    canonical_written INTEGER NOT NULL,
    quarantined INTEGER NOT NULL,
    error_message TEXT
);
CREATE TABLE IF NOT EXISTS payload_revisions (
    idempotency_key TEXT NOT NULL,
    seq INTEGER NOT NULL,
    hash TEXT NOT NULL,
    PRIMARY KEY (idempotency_key, seq)
);
"#;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned("sqlite connection"))
    }

    /// Latest runs, newest first.
    pub fn read_latest_runs(&self, limit: usize) -> Result<Vec<RunRecord>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT run_id, started_at, finished_at, source_name, status,
                    raw_written, canonical_written, quarantined, error_message
             FROM ingestion_runs
             ORDER BY started_at DESC, rowid DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], read_run_columns)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(run_from_columns(row?)?);
        }
        Ok(out)
    }

    /// Series points for one metric, ordered by `as_of`.
    pub fn read_macro_series_points(
        &self,
        metric_key: &str,
        limit: usize,
    ) -> Result<Vec<SeriesPoint>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT source, entity_id, metric_key, as_of, available_at, value, lineage_id
             FROM macro_series_points
             WHERE metric_key = ?1
             ORDER BY as_of ASC, id ASC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![metric_key, limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, f64>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (source, entity_id, metric_key, as_of, available_at, value, lineage_id) = row?;
            out.push(SeriesPoint {
                source,
                entity_id,
                metric_key,
                as_of: parse_timestamp(&as_of)?,
                available_at: parse_timestamp(&available_at)?,
                value,
                lineage_id,
            });
        }
        Ok(out)
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl Repository for SqliteStore {
    fn write_raw(&self, row: &Value) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO raw_event_store (source, entity_id, lineage_id, ingested_at, payload)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                text_field(row, "source"),
                text_field(row, "entity_id"),
                row.get("lineage_id").and_then(Value::as_str),
                format_timestamp(Utc::now()),
                serde_json::to_string(row)?,
            ],
        )?;
        Ok(())
    }

    fn write_canonical(&self, row: &Value) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO canonical_events (source, entity_id, written_at, payload)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                text_field(row, "source"),
                text_field(row, "entity_id"),
                format_timestamp(Utc::now()),
                serde_json::to_string(row)?,
            ],
        )?;
        Ok(())
    }

    fn write_quarantine(&self, reason: QuarantineReason, payload: &Value) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO quarantine_events (reason, written_at, payload) VALUES (?1, ?2, ?3)",
            params![
                reason.as_str(),
                format_timestamp(Utc::now()),
                serde_json::to_string(payload)?
            ],
        )?;
        Ok(())
    }

    fn snapshot_counts(&self) -> Result<StoreCounts, StoreError> {
        let conn = self.conn()?;
        let count = |table: &str| -> Result<usize, StoreError> {
            let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?;
            Ok(n as usize)
        };
        Ok(StoreCounts {
            raw_events: count("raw_event_store")?,
            canonical_events: count("canonical_events")?,
            quarantine_events: count("quarantine_events")?,
        })
    }

    fn macro_series(&self) -> Option<&dyn MacroSeriesSink> {
        Some(self)
    }
}

impl MacroSeriesSink for SqliteStore {
    fn write_macro_series_points(&self, points: &[SeriesPoint]) -> Result<usize, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO macro_series_points
                    (source, entity_id, metric_key, as_of, available_at, value, lineage_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for p in points {
                written += stmt.execute(params![
                    p.source,
                    p.entity_id,
                    p.metric_key,
                    format_timestamp(p.as_of),
                    format_timestamp(p.available_at),
                    p.value,
                    p.lineage_id,
                ])?;
            }
        }
        tx.commit()?;
        Ok(written)
    }
}

impl RunHistory for SqliteStore {
    fn write_run_history(&self, run: &RunRecord) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO ingestion_runs (
                run_id, started_at, finished_at, source_name, status,
                raw_written, canonical_written, quarantined, error_message
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                run.run_id.to_string(),
                format_timestamp(run.started_at),
                format_timestamp(run.finished_at),
                run.source_name,
                run.status.as_str(),
                run.raw_written as i64,
                run.canonical_written as i64,
                run.quarantined as i64,
                run.error_message,
            ],
        )?;
        Ok(())
    }
}

impl RevisionBackend for SqliteStore {
    fn append_if_changed(&self, key: &str, hash: &str) -> Result<PutResult, StoreError> {
        let mut conn = self.conn()?;
        // Take the write lock before reading so concurrent puts from other
        // connections queue on the busy timeout instead of failing the upgrade.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let count: i64 = tx.query_row(
            "SELECT COUNT(*) FROM payload_revisions WHERE idempotency_key = ?1",
            params![key],
            |r| r.get(0),
        )?;
        let last: Option<String> = tx
            .query_row(
                "SELECT hash FROM payload_revisions WHERE idempotency_key = ?1
                 ORDER BY seq DESC LIMIT 1",
                params![key],
                |r| r.get(0),
            )
            .optional()?;

        let (result, append) = PutResult::decide(count as usize, last.as_deref(), hash);
        if append {
            tx.execute(
                "INSERT INTO payload_revisions (idempotency_key, seq, hash) VALUES (?1, ?2, ?3)",
                params![key, result.revision_number as i64, hash],
            )?;
        }
        tx.commit()?;
        Ok(result)
    }

    fn history(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT hash FROM payload_revisions WHERE idempotency_key = ?1 ORDER BY seq ASC",
        )?;
        let hashes = stmt
            .query_map(params![key], |r| r.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(hashes)
    }
}

type RunColumns = (
    String,
    String,
    String,
    String,
    String,
    i64,
    i64,
    i64,
    Option<String>,
);

fn read_run_columns(row: &Row<'_>) -> rusqlite::Result<RunColumns> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
    ))
}

fn run_from_columns(cols: RunColumns) -> Result<RunRecord, StoreError> {
    let (run_id, started_at, finished_at, source_name, status, raw, canonical, quarantined, error_message) =
        cols;
    Ok(RunRecord {
        run_id: Uuid::parse_str(&run_id)
            .map_err(|e| StoreError::Corrupt(format!("run_id '{run_id}': {e}")))?,
        started_at: parse_timestamp(&started_at)?,
        finished_at: parse_timestamp(&finished_at)?,
        source_name,
        status: RunStatus::parse(&status)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown run status '{status}'")))?,
        raw_written: raw as usize,
        canonical_written: canonical as usize,
        quarantined: quarantined as usize,
        error_message,
    })
}

fn text_field<'a>(row: &'a Value, key: &str) -> &'a str {
    row.get(key).and_then(Value::as_str).unwrap_or("unknown")
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("timestamp '{raw}': {e}")))
}
