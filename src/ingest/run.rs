//! Manual run orchestration.
//!
//! A run wraps exactly one ingestion job. This is the single place where a job
//! error is turned into a value: the run ends as `failed`, its message is
//! preserved verbatim, and every count is reported as zero.

use chrono::Utc;
use tracing::{error, info};
use uuid::Uuid;

use crate::domain::{JobResult, RunRecord, RunStatus};
use crate::error::{IngestError, StoreError};
use crate::ingest::{JobRequest, run_ingestion_job};
use crate::store::{Repository, RevisionStore, RunHistory};

/// Terminal state of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Success(JobResult),
    Quarantine(JobResult),
    Failed { message: String },
}

impl RunOutcome {
    pub fn classify(result: Result<JobResult, IngestError>) -> Self {
        match result {
            Ok(job) if job.quarantined == 0 => RunOutcome::Success(job),
            Ok(job) => RunOutcome::Quarantine(job),
            Err(err) => RunOutcome::Failed {
                message: err.to_string(),
            },
        }
    }

    pub fn status(&self) -> RunStatus {
        match self {
            RunOutcome::Success(_) => RunStatus::Success,
            RunOutcome::Quarantine(_) => RunStatus::Quarantine,
            RunOutcome::Failed { .. } => RunStatus::Failed,
        }
    }

    fn job(&self) -> Option<&JobResult> {
        match self {
            RunOutcome::Success(job) | RunOutcome::Quarantine(job) => Some(job),
            RunOutcome::Failed { .. } => None,
        }
    }

    fn error_message(&self) -> Option<String> {
        match self {
            RunOutcome::Failed { message } => Some(message.clone()),
            _ => None,
        }
    }
}

/// Execute one job and record the run.
///
/// The record is always built. It is written to `history` when one is given;
/// otherwise it is only returned (dry runs). Only a failure to persist the
/// record itself is returned as `Err`.
#[tracing::instrument(
    skip_all,
    fields(source = %request.source.name, key = %request.idempotency_key)
)]
pub fn run_manual_update(
    request: &JobRequest,
    repository: &dyn Repository,
    revisions: &RevisionStore,
    history: Option<&dyn RunHistory>,
) -> Result<RunRecord, StoreError> {
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();

    let outcome = RunOutcome::classify(run_ingestion_job(request, repository, revisions));
    let finished_at = Utc::now();

    let (raw_written, canonical_written, quarantined) = outcome
        .job()
        .map(|job| (job.raw_written, job.canonical_written, job.quarantined))
        .unwrap_or((0, 0, 0));

    let record = RunRecord {
        run_id,
        started_at,
        finished_at,
        source_name: request.source.name.clone(),
        status: outcome.status(),
        raw_written,
        canonical_written,
        quarantined,
        error_message: outcome.error_message(),
    };

    match &outcome {
        RunOutcome::Failed { message } => error!(%run_id, %message, "run failed"),
        _ => info!(%run_id, status = record.status.as_str(), "run finished"),
    }

    if let Some(history) = history {
        history.write_run_history(&record)?;
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone};
    use serde_json::{Value, json};

    use super::*;
    use crate::domain::{QuarantineReason, StoreCounts};
    use crate::gate::{BatchMetrics, SourceDescriptor};
    use crate::pit::Row;
    use crate::store::MemoryRepository;

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 18, hour, 0, 0).unwrap()
    }

    fn request(legal: u8, metrics: BatchMetrics) -> JobRequest {
        JobRequest {
            source: SourceDescriptor {
                name: "sec_edgar".to_string(),
                utility: 5,
                reliability: 5,
                legal,
                cost: 3,
                maintenance: 3,
            },
            metrics,
            idempotency_key: "sec|AAPL|2026-02-18|r1".to_string(),
            payload: json!({"entity_id": "AAPL", "eps": 1.2}),
            rows: vec![Row::new("AAPL", Some(ts(0)))],
            decision_time: ts(1),
        }
    }

    #[test]
    fn successful_run_is_recorded() {
        let data = MemoryRepository::new();
        let history = MemoryRepository::new();

        let record = run_manual_update(
            &request(5, BatchMetrics::PASSING),
            &data,
            &RevisionStore::in_memory(),
            Some(&history),
        )
        .unwrap();

        assert_eq!(record.status, RunStatus::Success);
        assert_eq!(record.raw_written, 1);
        assert_eq!(record.canonical_written, 1);
        assert_eq!(record.quarantined, 0);
        assert_eq!(record.error_message, None);
        assert_eq!(record.source_name, "sec_edgar");
        assert!(record.finished_at >= record.started_at);

        let runs = history.runs().unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0], record);
    }

    #[test]
    fn quarantined_run_is_not_a_failure() {
        let data = MemoryRepository::new();
        let record = run_manual_update(
            &request(2, BatchMetrics::PASSING),
            &data,
            &RevisionStore::in_memory(),
            None,
        )
        .unwrap();

        assert_eq!(record.status, RunStatus::Quarantine);
        assert_eq!(record.quarantined, 1);
        assert_eq!(record.error_message, None);
    }

    #[test]
    fn run_ids_are_unique() {
        let data = MemoryRepository::new();
        let revisions = RevisionStore::in_memory();
        let req = request(5, BatchMetrics::PASSING);
        let a = run_manual_update(&req, &data, &revisions, None).unwrap();
        let b = run_manual_update(&req, &data, &revisions, None).unwrap();
        assert_ne!(a.run_id, b.run_id);
    }

    struct FailingCanonical(MemoryRepository);

    impl Repository for FailingCanonical {
        fn write_raw(&self, row: &Value) -> Result<(), StoreError> {
            self.0.write_raw(row)
        }
        fn write_canonical(&self, _: &Value) -> Result<(), StoreError> {
            Err(StoreError::Rejected("connection reset by peer".to_string()))
        }
        fn write_quarantine(&self, reason: QuarantineReason, payload: &Value) -> Result<(), StoreError> {
            self.0.write_quarantine(reason, payload)
        }
        fn snapshot_counts(&self) -> Result<StoreCounts, StoreError> {
            self.0.snapshot_counts()
        }
    }

    #[test]
    fn repository_failure_becomes_failed_record_with_zero_counts() {
        let data = FailingCanonical(MemoryRepository::new());
        let history = MemoryRepository::new();

        let record = run_manual_update(
            &request(5, BatchMetrics::PASSING),
            &data,
            &RevisionStore::in_memory(),
            Some(&history),
        )
        .unwrap();

        assert_eq!(record.status, RunStatus::Failed);
        assert_eq!(record.raw_written, 0);
        assert_eq!(record.canonical_written, 0);
        assert_eq!(record.quarantined, 0);
        assert!(
            record
                .error_message
                .as_deref()
                .is_some_and(|m| m.contains("connection reset by peer"))
        );
        assert_eq!(history.runs().unwrap()[0].status, RunStatus::Failed);
    }

    struct RejectingHistory;

    impl RunHistory for RejectingHistory {
        fn write_run_history(&self, _: &RunRecord) -> Result<(), StoreError> {
            Err(StoreError::Rejected("history table missing".to_string()))
        }
    }

    #[test]
    fn history_write_failure_propagates() {
        let data = MemoryRepository::new();
        let err = run_manual_update(
            &request(5, BatchMetrics::PASSING),
            &data,
            &RevisionStore::in_memory(),
            Some(&RejectingHistory),
        )
        .unwrap_err();
        assert!(err.to_string().contains("history table missing"));
    }

    #[test]
    fn record_serializes_with_status_codes() {
        let data = MemoryRepository::new();
        let record = run_manual_update(
            &request(2, BatchMetrics::PASSING),
            &data,
            &RevisionStore::in_memory(),
            None,
        )
        .unwrap();

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["status"], json!("quarantine"));
        assert_eq!(value["error_message"], Value::Null);
        assert!(value["run_id"].as_str().is_some_and(|id| id.len() == 36));
    }
}
