//! Batch quality gate.
//!
//! Promotion is a strict conjunction of the batch signals: a single failing
//! signal sends the batch to quarantine.

use serde::{Deserialize, Serialize};

/// Fitness signals for one ingested batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchMetrics {
    pub freshness: bool,
    pub completeness: bool,
    pub schema_drift: bool,
    pub license_ok: bool,
}

impl BatchMetrics {
    /// Metrics for a batch with every signal passing.
    pub const PASSING: BatchMetrics = BatchMetrics {
        freshness: true,
        completeness: true,
        schema_drift: false,
        license_ok: true,
    };

    /// Names of the signals that block promotion, in a fixed order.
    pub fn failed_checks(&self) -> Vec<&'static str> {
        let mut failed = Vec::new();
        if !self.freshness {
            failed.push("freshness");
        }
        if !self.completeness {
            failed.push("completeness");
        }
        if self.schema_drift {
            failed.push("schema_drift");
        }
        if !self.license_ok {
            failed.push("license_ok");
        }
        failed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Canonical,
    Quarantine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QualityDecision {
    pub promote: bool,
    pub route: Route,
}

pub fn evaluate_quality(metrics: &BatchMetrics) -> QualityDecision {
    let promote =
        metrics.freshness && metrics.completeness && !metrics.schema_drift && metrics.license_ok;
    QualityDecision {
        promote,
        route: if promote { Route::Canonical } else { Route::Quarantine },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passing_metrics_promote_to_canonical() {
        let decision = evaluate_quality(&BatchMetrics::PASSING);
        assert!(decision.promote);
        assert_eq!(decision.route, Route::Canonical);
        assert!(BatchMetrics::PASSING.failed_checks().is_empty());
    }

    #[test]
    fn any_single_failure_blocks_promotion() {
        let variants = [
            BatchMetrics { freshness: false, ..BatchMetrics::PASSING },
            BatchMetrics { completeness: false, ..BatchMetrics::PASSING },
            BatchMetrics { schema_drift: true, ..BatchMetrics::PASSING },
            BatchMetrics { license_ok: false, ..BatchMetrics::PASSING },
        ];
        for metrics in variants {
            let decision = evaluate_quality(&metrics);
            assert!(!decision.promote, "{metrics:?} should not promote");
            assert_eq!(decision.route, Route::Quarantine);
            assert_eq!(metrics.failed_checks().len(), 1);
        }
    }

    #[test]
    fn promote_matches_conjunction_for_all_combinations() {
        for bits in 0u8..16 {
            let metrics = BatchMetrics {
                freshness: bits & 1 != 0,
                completeness: bits & 2 != 0,
                schema_drift: bits & 4 != 0,
                license_ok: bits & 8 != 0,
            };
            let expected = metrics.freshness
                && metrics.completeness
                && !metrics.schema_drift
                && metrics.license_ok;
            assert_eq!(evaluate_quality(&metrics).promote, expected);
        }
    }

    #[test]
    fn route_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Route::Quarantine).unwrap(), "\"quarantine\"");
    }
}
