//! Environment-driven settings.
//!
//! Values are read from the process environment after loading an optional
//! `.env` file. Missing API keys are not an error here: the vendor decides
//! whether an empty key is acceptable.

use std::path::PathBuf;

use crate::data::http::pacing_interval;
use crate::error::{AppError, EXIT_CONFIG};
use crate::gate::DEFAULT_MONTHLY_COST_CAP;

const DEFAULT_RATE_LIMIT_PER_SECOND: f64 = 5.0;
const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_SEC_USER_AGENT: &str = "macro-ingest/0.1 ops@example.com";

/// Where repository writes go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    /// No database configured: an in-memory repository, discarded on exit.
    Memory,
    /// A SQLite database file.
    Sqlite(PathBuf),
}

impl DatabaseTarget {
    /// Interpret a database URL.
    ///
    /// Accepted forms: `sqlite://path`, `sqlite:path`, or a bare filesystem
    /// path. Any other `scheme://` URL is rejected.
    pub fn from_url(url: &str) -> Result<Self, AppError> {
        let url = url.trim();
        if url.is_empty() {
            return Ok(DatabaseTarget::Memory);
        }
        if let Some(path) = url.strip_prefix("sqlite://").or_else(|| url.strip_prefix("sqlite:")) {
            if path.is_empty() {
                return Err(AppError::new(EXIT_CONFIG, "Database URL is missing a SQLite file path."));
            }
            return Ok(DatabaseTarget::Sqlite(PathBuf::from(path)));
        }
        if let Some((scheme, _)) = url.split_once("://") {
            return Err(AppError::new(
                EXIT_CONFIG,
                format!("Unsupported database URL scheme '{scheme}'; use sqlite://<path>."),
            ));
        }
        Ok(DatabaseTarget::Sqlite(PathBuf::from(url)))
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database: DatabaseTarget,
    pub fred_api_key: String,
    pub ecos_api_key: String,
    pub dart_api_key: String,
    pub sec_user_agent: String,
    pub fred_series_id: String,
    pub ecos_stat_code: String,
    pub dart_corp_code: String,
    pub sec_cik: String,
    pub rate_limit_per_second: f64,
    pub max_retries: u32,
    pub monthly_cost_cap: f64,
}

impl Settings {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or_default = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let database = match var("SUPABASE_DB_URL").or_else(|| var("DATABASE_URL")) {
            Some(url) => DatabaseTarget::from_url(&url)?,
            None => DatabaseTarget::Memory,
        };

        let rate_limit_per_second = match var("INGEST_RATE_LIMIT_PER_SECOND") {
            Some(raw) => raw.trim().parse::<f64>().map_err(|e| {
                AppError::new(EXIT_CONFIG, format!("Invalid INGEST_RATE_LIMIT_PER_SECOND '{raw}': {e}"))
            })?,
            None => DEFAULT_RATE_LIMIT_PER_SECOND,
        };
        if pacing_interval(rate_limit_per_second).is_none() {
            return Err(AppError::new(
                EXIT_CONFIG,
                format!(
                    "INGEST_RATE_LIMIT_PER_SECOND {rate_limit_per_second} is out of range; \
                     use 0 to disable pacing or a finite positive rate."
                ),
            ));
        }
        let max_retries = match var("INGEST_MAX_RETRIES") {
            Some(raw) => raw.trim().parse::<u32>().map_err(|e| {
                AppError::new(EXIT_CONFIG, format!("Invalid INGEST_MAX_RETRIES '{raw}': {e}"))
            })?,
            None => DEFAULT_MAX_RETRIES,
        };

        let monthly_cost_cap = match var("INGEST_MONTHLY_COST_CAP") {
            Some(raw) => raw.trim().parse::<f64>().map_err(|e| {
                AppError::new(EXIT_CONFIG, format!("Invalid INGEST_MONTHLY_COST_CAP '{raw}': {e}"))
            })?,
            None => DEFAULT_MONTHLY_COST_CAP,
        };
        if !monthly_cost_cap.is_finite() || monthly_cost_cap < 0.0 {
            return Err(AppError::new(
                EXIT_CONFIG,
                format!("INGEST_MONTHLY_COST_CAP must be a non-negative amount, got {monthly_cost_cap}."),
            ));
        }

        Ok(Self {
            database,
            fred_api_key: or_default("FRED_API_KEY", ""),
            ecos_api_key: or_default("ECOS_API_KEY", ""),
            dart_api_key: var("DART_API_KEY")
                .or_else(|| var("DART_CRTFC_KEY"))
                .unwrap_or_default(),
            sec_user_agent: or_default("SEC_USER_AGENT", DEFAULT_SEC_USER_AGENT),
            fred_series_id: or_default("FRED_SERIES_ID", "CPIAUCSL"),
            ecos_stat_code: or_default("ECOS_STAT_CODE", "722Y001"),
            dart_corp_code: or_default("DART_CORP_CODE", "00126380"),
            sec_cik: or_default("SEC_CIK", "0000320193"),
            rate_limit_per_second,
            max_retries,
            monthly_cost_cap,
        })
    }
}
