//! The ingestion job.
//!
//! Order of operations matters here:
//!
//! 1. both gates are evaluated before anything is written
//! 2. the raw payload is written unconditionally
//! 3. the revision store records the payload under its idempotency key
//! 4. the payload is routed to canonical storage or quarantine
//! 5. the caller's rows are point-in-time filtered for the audit counters
//!
//! Repository errors propagate unchanged; nothing is swallowed at this layer.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::domain::{DashboardCounts, JobResult, QuarantineReason};
use crate::error::IngestError;
use crate::gate::{SourceEvaluation, evaluate_quality, evaluate_source};
use crate::ingest::JobRequest;
use crate::normalize::{NORMALIZED_SOURCES, normalize_payload};
use crate::pit::filter_point_in_time;
use crate::store::{PutStatus, Repository, RevisionStore};

/// Run one batch through the gates and into storage.
pub fn run_ingestion_job(
    request: &JobRequest,
    repository: &dyn Repository,
    revisions: &RevisionStore,
) -> Result<JobResult, IngestError> {
    let source_eval = evaluate_source(&request.source);
    let quality_eval = evaluate_quality(&request.metrics);
    debug!(
        source = %request.source.name,
        admitted = source_eval.admitted,
        score = source_eval.score,
        promote = quality_eval.promote,
        "gates evaluated"
    );

    repository.write_raw(&request.payload)?;

    let put = revisions.put(&request.idempotency_key, &request.payload)?;
    match put.status {
        PutStatus::Revision => info!(
            key = %request.idempotency_key,
            revision = put.revision_number,
            "payload changed under existing idempotency key"
        ),
        _ => debug!(key = %request.idempotency_key, status = ?put.status, "revision recorded"),
    }

    let (canonical_written, quarantined, points_written) = if source_eval.admitted
        && quality_eval.promote
    {
        repository.write_canonical(&request.payload)?;
        let points = write_series_points(request, repository)?;
        (1, 0, points)
    } else {
        let reason = quarantine_reason(&source_eval);
        warn!(
            source = %request.source.name,
            %reason,
            failed_checks = ?request.metrics.failed_checks(),
            "batch quarantined"
        );
        repository.write_quarantine(reason, &request.payload)?;
        (0, 1, 0)
    };

    let pit_rows = filter_point_in_time(&request.rows, request.decision_time).len();
    let counts = repository.snapshot_counts()?;

    Ok(JobResult {
        raw_written: 1,
        canonical_written,
        quarantined,
        dashboard: DashboardCounts::from_store(counts, pit_rows, points_written),
    })
}

/// The source gate outranks the quality gate when both fail.
fn quarantine_reason(source_eval: &SourceEvaluation) -> QuarantineReason {
    if source_eval.admitted {
        QuarantineReason::QualityGateFailed
    } else {
        QuarantineReason::SourceGateFailed
    }
}

fn write_series_points(request: &JobRequest, repository: &dyn Repository) -> Result<usize, IngestError> {
    if !NORMALIZED_SOURCES.contains(&request.source.name.as_str()) {
        debug!(source = %request.source.name, "no series normalizer for source");
        return Ok(0);
    }

    let entity_id = request
        .payload
        .get("entity_id")
        .and_then(Value::as_str)
        .unwrap_or(&request.idempotency_key);

    let points = normalize_payload(
        &request.source.name,
        &request.payload,
        entity_id,
        request.decision_time,
        &request.idempotency_key,
    );
    if points.is_empty() {
        return Ok(0);
    }

    match repository.macro_series() {
        Some(sink) => Ok(sink.write_macro_series_points(&points)?),
        None => {
            debug!(
                source = %request.source.name,
                points = points.len(),
                "repository has no series capability; skipping series points"
            );
            Ok(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::json;

    use super::*;
    use crate::domain::StoreCounts;
    use crate::error::StoreError;
    use crate::gate::{BatchMetrics, SourceDescriptor};
    use crate::pit::Row;
    use crate::store::MemoryRepository;

    fn source(name: &str, legal: u8, reliability: u8) -> SourceDescriptor {
        SourceDescriptor {
            name: name.to_string(),
            utility: 5,
            reliability,
            legal,
            cost: 3,
            maintenance: 3,
        }
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, d, 0, 0, 0).unwrap()
    }

    fn request(source: SourceDescriptor, metrics: BatchMetrics, payload: Value) -> JobRequest {
        JobRequest {
            source,
            metrics,
            idempotency_key: "edgar|AAPL|2026-01-01|r1".to_string(),
            payload,
            rows: vec![Row::new("AAPL", Some(day(1)))],
            decision_time: day(2),
        }
    }

    #[test]
    fn promotes_when_all_checks_pass() {
        let repo = MemoryRepository::new();
        let req = request(source("edgar", 5, 5), BatchMetrics::PASSING, json!({"eps": 1.2}));

        let result = run_ingestion_job(&req, &repo, &RevisionStore::in_memory()).unwrap();

        assert_eq!(result.raw_written, 1);
        assert_eq!(result.canonical_written, 1);
        assert_eq!(result.quarantined, 0);
        assert_eq!(result.dashboard.raw_events, 1);
        assert_eq!(result.dashboard.canonical_events, 1);
        assert_eq!(result.dashboard.pit_rows, 1);
        assert!(repo.quarantine_events().unwrap().is_empty());
    }

    #[test]
    fn quality_failure_quarantines_with_quality_reason() {
        let repo = MemoryRepository::new();
        let metrics = BatchMetrics {
            freshness: false,
            ..BatchMetrics::PASSING
        };
        let req = request(source("edgar", 5, 5), metrics, json!({"eps": 1.2}));

        let result = run_ingestion_job(&req, &repo, &RevisionStore::in_memory()).unwrap();

        assert_eq!(result.canonical_written, 0);
        assert_eq!(result.quarantined, 1);
        assert_eq!(result.dashboard.quarantine_events, 1);
        assert_eq!(result.dashboard.macro_series_points_written, 0);
        assert_eq!(
            repo.quarantine_events().unwrap()[0].reason,
            QuarantineReason::QualityGateFailed
        );
        assert_eq!(repo.raw_events().unwrap().len(), 1);
    }

    #[test]
    fn source_failure_wins_over_quality_failure() {
        let metrics = BatchMetrics {
            license_ok: false,
            ..BatchMetrics::PASSING
        };
        for (src, m) in [
            (source("edgar", 2, 5), BatchMetrics::PASSING),
            (source("edgar", 2, 5), metrics),
            (source("edgar", 5, 1), metrics),
        ] {
            let repo = MemoryRepository::new();
            let req = request(src, m, json!({"eps": 1.2}));
            let result = run_ingestion_job(&req, &repo, &RevisionStore::in_memory()).unwrap();

            assert_eq!(result.quarantined, 1);
            assert_eq!(
                repo.quarantine_events().unwrap()[0].reason,
                QuarantineReason::SourceGateFailed
            );
        }
    }

    #[test]
    fn exactly_one_route_per_call_and_raw_always_written() {
        for bits in 0u8..8 {
            let repo = MemoryRepository::new();
            let src = source("edgar", if bits & 1 != 0 { 5 } else { 1 }, 5);
            let metrics = BatchMetrics {
                freshness: bits & 2 != 0,
                schema_drift: bits & 4 != 0,
                ..BatchMetrics::PASSING
            };
            let req = request(src, metrics, json!({"bits": bits}));
            let result = run_ingestion_job(&req, &repo, &RevisionStore::in_memory()).unwrap();

            assert_eq!(result.raw_written, 1);
            assert_eq!(result.canonical_written + result.quarantined, 1);
            assert_eq!(repo.raw_events().unwrap().len(), 1);
        }
    }

    #[test]
    fn fred_payload_writes_series_points() {
        let repo = MemoryRepository::new();
        let mut req = request(
            source("fred", 5, 5),
            BatchMetrics::PASSING,
            json!({
                "payload": {
                    "observations": [
                        {"date": "2025-12-01", "value": "4.4"},
                        {"date": "2026-01-01", "value": "4.3"}
                    ]
                }
            }),
        );
        req.idempotency_key = "fred|UNRATE|2026-01-01|r1".to_string();
        req.rows = vec![Row::new("UNRATE", Some(day(2)))];

        let result = run_ingestion_job(&req, &repo, &RevisionStore::in_memory()).unwrap();

        assert_eq!(result.canonical_written, 1);
        assert_eq!(result.dashboard.macro_series_points_written, 2);
        let points = repo.macro_series_points().unwrap();
        assert_eq!(points.len(), 2);
        // No entity_id in the envelope: the idempotency key stands in.
        assert_eq!(points[1].metric_key, "fred|UNRATE|2026-01-01|r1");
        assert_eq!(points[1].lineage_id, req.idempotency_key);
        assert_eq!(points[1].available_at, req.decision_time);
    }

    #[test]
    fn envelope_entity_id_names_series_points() {
        let repo = MemoryRepository::new();
        let req = request(
            source("fred", 5, 5),
            BatchMetrics::PASSING,
            json!({
                "source": "fred",
                "entity_id": "UNRATE",
                "payload": {"observations": [{"date": "2026-01-01", "value": "4.3"}]}
            }),
        );

        run_ingestion_job(&req, &repo, &RevisionStore::in_memory()).unwrap();

        assert_eq!(repo.macro_series_points().unwrap()[0].metric_key, "UNRATE");
    }

    #[test]
    fn other_sources_skip_normalization() {
        let repo = MemoryRepository::new();
        let req = request(
            source("sec_edgar", 5, 5),
            BatchMetrics::PASSING,
            json!({"payload": {"observations": [{"date": "2026-01-01", "value": "1"}]}}),
        );
        let result = run_ingestion_job(&req, &repo, &RevisionStore::in_memory()).unwrap();
        assert!(!NORMALIZED_SOURCES.contains(&"sec_edgar"));
        assert_eq!(result.dashboard.macro_series_points_written, 0);
        assert!(repo.macro_series_points().unwrap().is_empty());
    }

    #[test]
    fn revision_store_sees_every_payload_even_when_quarantined() {
        let repo = MemoryRepository::new();
        let revisions = RevisionStore::in_memory();
        let req = request(source("edgar", 1, 1), BatchMetrics::PASSING, json!({"eps": 1.2}));

        run_ingestion_job(&req, &repo, &revisions).unwrap();
        run_ingestion_job(&req, &repo, &revisions).unwrap();

        assert_eq!(revisions.history(&req.idempotency_key).unwrap().len(), 1);
        assert_eq!(repo.raw_events().unwrap().len(), 2);
    }

    #[test]
    fn pit_count_ignores_future_rows() {
        let repo = MemoryRepository::new();
        let mut req = request(source("edgar", 5, 5), BatchMetrics::PASSING, json!({}));
        req.rows = vec![
            Row::new("A", Some(day(1))),
            Row::new("B", Some(day(3))),
            Row::new("C", None),
        ];
        let result = run_ingestion_job(&req, &repo, &RevisionStore::in_memory()).unwrap();
        assert_eq!(result.dashboard.pit_rows, 1);
    }

    /// Repository without the series capability.
    struct RawOnlyRepository(MemoryRepository);

    impl Repository for RawOnlyRepository {
        fn write_raw(&self, row: &Value) -> Result<(), StoreError> {
            self.0.write_raw(row)
        }
        fn write_canonical(&self, row: &Value) -> Result<(), StoreError> {
            self.0.write_canonical(row)
        }
        fn write_quarantine(&self, reason: QuarantineReason, payload: &Value) -> Result<(), StoreError> {
            self.0.write_quarantine(reason, payload)
        }
        fn snapshot_counts(&self) -> Result<StoreCounts, StoreError> {
            self.0.snapshot_counts()
        }
    }

    #[test]
    fn missing_series_capability_writes_zero_points() {
        let repo = RawOnlyRepository(MemoryRepository::new());
        let req = request(
            source("fred", 5, 5),
            BatchMetrics::PASSING,
            json!({"observations": [{"date": "2026-01-01", "value": "4.3"}]}),
        );
        let result = run_ingestion_job(&req, &repo, &RevisionStore::in_memory()).unwrap();
        assert_eq!(result.canonical_written, 1);
        assert_eq!(result.dashboard.macro_series_points_written, 0);
    }

    struct BrokenCanonical(MemoryRepository);

    impl Repository for BrokenCanonical {
        fn write_raw(&self, row: &Value) -> Result<(), StoreError> {
            self.0.write_raw(row)
        }
        fn write_canonical(&self, _: &Value) -> Result<(), StoreError> {
            Err(StoreError::Rejected("canonical store offline".to_string()))
        }
        fn write_quarantine(&self, reason: QuarantineReason, payload: &Value) -> Result<(), StoreError> {
            self.0.write_quarantine(reason, payload)
        }
        fn snapshot_counts(&self) -> Result<StoreCounts, StoreError> {
            self.0.snapshot_counts()
        }
    }

    #[test]
    fn repository_errors_propagate_after_raw_write() {
        let repo = BrokenCanonical(MemoryRepository::new());
        let req = request(source("edgar", 5, 5), BatchMetrics::PASSING, json!({"eps": 1.2}));

        let err = run_ingestion_job(&req, &repo, &RevisionStore::in_memory()).unwrap_err();

        assert!(err.to_string().contains("canonical store offline"));
        assert_eq!(repo.0.raw_events().unwrap().len(), 1);
    }
}
