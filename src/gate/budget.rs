//! Monthly spend guard for paid vendor calls.
//!
//! Spend accumulates against a fixed monthly cap. Once spend is strictly above
//! the cap the guard is frozen and further paid fetches are refused; spending
//! exactly the cap is still allowed.

use serde::{Deserialize, Serialize};

/// Default monthly cap, in the same unit as recorded spend.
pub const DEFAULT_MONTHLY_COST_CAP: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BudgetGuard {
    pub monthly_cap: f64,
    pub spent: f64,
}

impl BudgetGuard {
    pub fn new(monthly_cap: f64) -> Self {
        Self {
            monthly_cap,
            spent: 0.0,
        }
    }

    pub fn record_spend(&mut self, amount: f64) {
        self.spent += amount;
    }

    pub fn is_frozen(&self) -> bool {
        self.spent > self.monthly_cap
    }

    /// Budget left before the cap; negative once frozen.
    pub fn remaining(&self) -> f64 {
        self.monthly_cap - self.spent
    }
}

impl Default for BudgetGuard {
    fn default() -> Self {
        Self::new(DEFAULT_MONTHLY_COST_CAP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_guard_is_open() {
        let guard = BudgetGuard::new(1000.0);
        assert!(!guard.is_frozen());
        assert!((guard.remaining() - 1000.0).abs() < 1e-12);
    }

    #[test]
    fn spending_the_cap_exactly_is_allowed() {
        let mut guard = BudgetGuard::new(1000.0);
        guard.record_spend(600.0);
        guard.record_spend(400.0);
        assert!(!guard.is_frozen());

        guard.record_spend(0.01);
        assert!(guard.is_frozen());
        assert!(guard.remaining() < 0.0);
    }

    #[test]
    fn default_cap() {
        assert_eq!(BudgetGuard::default().monthly_cap, DEFAULT_MONTHLY_COST_CAP);
    }
}
