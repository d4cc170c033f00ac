//! Source admission gate.
//!
//! Admission is a hard gate on the two baseline trust signals (legal and
//! reliability). The weighted score is informational: it ranks admitted
//! sources but can never admit a source that fails the gate.

use serde::{Deserialize, Serialize};

/// Minimum `legal` and `reliability` rating for admission.
pub const ADMISSION_FLOOR: u8 = 3;

/// Governance attributes of a data vendor, each rated 1–5.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub name: String,
    pub utility: u8,
    pub reliability: u8,
    pub legal: u8,
    pub cost: u8,
    pub maintenance: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SourceEvaluation {
    pub admitted: bool,
    pub score: f64,
}

/// Weights for the composite source score.
///
/// The defaults (30/25/20/15/10, divided by 5) are carried over unchanged from
/// the existing scoring sheet; they have no documented derivation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub utility: f64,
    pub reliability: f64,
    pub legal: f64,
    pub cost: f64,
    pub maintenance: f64,
    pub divisor: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            utility: 30.0,
            reliability: 25.0,
            legal: 20.0,
            cost: 15.0,
            maintenance: 10.0,
            divisor: 5.0,
        }
    }
}

impl ScoreWeights {
    pub fn score(&self, source: &SourceDescriptor) -> f64 {
        let weighted = f64::from(source.utility) * self.utility
            + f64::from(source.reliability) * self.reliability
            + f64::from(source.legal) * self.legal
            + f64::from(source.cost) * self.cost
            + f64::from(source.maintenance) * self.maintenance;
        weighted / self.divisor
    }
}

/// Evaluate a source with the default score weights.
pub fn evaluate_source(source: &SourceDescriptor) -> SourceEvaluation {
    evaluate_source_with(&ScoreWeights::default(), source)
}

pub fn evaluate_source_with(weights: &ScoreWeights, source: &SourceDescriptor) -> SourceEvaluation {
    SourceEvaluation {
        admitted: is_admitted(source),
        score: weights.score(source),
    }
}

fn is_admitted(source: &SourceDescriptor) -> bool {
    source.legal >= ADMISSION_FLOOR && source.reliability >= ADMISSION_FLOOR
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(utility: u8, reliability: u8, legal: u8, cost: u8, maintenance: u8) -> SourceDescriptor {
        SourceDescriptor {
            name: "edgar".to_string(),
            utility,
            reliability,
            legal,
            cost,
            maintenance,
        }
    }

    #[test]
    fn score_uses_weighted_composite() {
        let eval = evaluate_source(&descriptor(5, 4, 4, 3, 3));
        // (150 + 100 + 80 + 45 + 30) / 5
        assert!((eval.score - 81.0).abs() < 1e-12);
        assert!(eval.admitted);
    }

    #[test]
    fn maximum_ratings_score_one_hundred() {
        let eval = evaluate_source(&descriptor(5, 5, 5, 5, 5));
        assert!((eval.score - 100.0).abs() < 1e-12);
    }

    #[test]
    fn low_legal_or_reliability_is_never_admitted() {
        for low in 1..ADMISSION_FLOOR {
            for other in 1..=5 {
                let legal_low = descriptor(5, other.max(3), low, 5, 5);
                assert!(!evaluate_source(&legal_low).admitted);

                let reliability_low = descriptor(5, low, other.max(3), 5, 5);
                assert!(!evaluate_source(&reliability_low).admitted);
            }
        }
    }

    #[test]
    fn high_score_does_not_override_gate() {
        let eval = evaluate_source(&descriptor(5, 5, 2, 5, 5));
        assert!(eval.score > 90.0);
        assert!(!eval.admitted);
    }

    #[test]
    fn floor_values_are_admitted_even_with_poor_other_ratings() {
        let eval = evaluate_source(&descriptor(1, 3, 3, 1, 1));
        assert!(eval.admitted);
    }

    #[test]
    fn custom_weights_change_score_only() {
        let weights = ScoreWeights {
            divisor: 1.0,
            ..ScoreWeights::default()
        };
        let eval = evaluate_source_with(&weights, &descriptor(1, 1, 1, 1, 1));
        assert!((eval.score - 100.0).abs() < 1e-12);
        assert!(!eval.admitted);
    }
}
