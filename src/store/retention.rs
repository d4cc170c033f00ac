//! Retention tiers.
//!
//! | tier   | raw payload TTL | derived fact TTL |
//! |--------|-----------------|------------------|
//! | gold   | kept forever    | kept forever     |
//! | silver | 180 days        | 24 months        |
//! | bronze | 90 days         | kept forever     |

use chrono::{DateTime, Duration, Months, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DataTier {
    Gold,
    Silver,
    Bronze,
}

impl DataTier {
    pub fn as_str(self) -> &'static str {
        match self {
            DataTier::Gold => "gold",
            DataTier::Silver => "silver",
            DataTier::Bronze => "bronze",
        }
    }

    /// Days a raw payload is retained; `None` means indefinitely.
    pub fn ttl_days(self) -> Option<u32> {
        match self {
            DataTier::Gold => None,
            DataTier::Silver => Some(180),
            DataTier::Bronze => Some(90),
        }
    }

    /// Months derived facts are retained; `None` means indefinitely.
    pub fn fact_ttl_months(self) -> Option<u32> {
        match self {
            DataTier::Silver => Some(24),
            DataTier::Gold | DataTier::Bronze => None,
        }
    }

    /// When a raw payload written at `written_at` expires.
    pub fn raw_expires_at(self, written_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let days = self.ttl_days()?;
        written_at.checked_add_signed(Duration::days(i64::from(days)))
    }

    /// When a fact written at `written_at` expires. Month arithmetic clamps to
    /// the last day of the target month.
    pub fn fact_expires_at(self, written_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let months = self.fact_ttl_months()?;
        written_at.checked_add_months(Months::new(months))
    }
}

impl std::fmt::Display for DataTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn ttl_table() {
        assert_eq!(DataTier::Gold.ttl_days(), None);
        assert_eq!(DataTier::Silver.ttl_days(), Some(180));
        assert_eq!(DataTier::Bronze.ttl_days(), Some(90));

        assert_eq!(DataTier::Silver.fact_ttl_months(), Some(24));
        assert_eq!(DataTier::Gold.fact_ttl_months(), None);
        assert_eq!(DataTier::Bronze.fact_ttl_months(), None);
    }

    #[test]
    fn expiry_instants() {
        let written = Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap();

        assert_eq!(DataTier::Gold.raw_expires_at(written), None);
        assert_eq!(
            DataTier::Bronze.raw_expires_at(written),
            Some(Utc.with_ymd_and_hms(2024, 5, 29, 12, 0, 0).unwrap())
        );
        // 2026 has no Feb 29.
        assert_eq!(
            DataTier::Silver.fact_expires_at(written),
            Some(Utc.with_ymd_and_hms(2026, 2, 28, 12, 0, 0).unwrap())
        );
    }

    #[test]
    fn tier_codes() {
        assert_eq!(serde_json::to_value(DataTier::Gold).unwrap(), serde_json::json!("gold"));
        assert_eq!(DataTier::Bronze.to_string(), "bronze");
    }
}
