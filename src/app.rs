//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads settings from the environment
//! - checks the fetch against the monthly budget
//! - fetches one vendor payload
//! - runs it through the gates and records the run
//! - prints the run record as JSON and writes optional exports

use chrono::Utc;
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::{Command, HistoryArgs, RunUpdateArgs};
use crate::config::{DatabaseTarget, Settings};
use crate::data::fetch_payload;
use crate::data::http::HttpClient;
use crate::domain::RunStatus;
use crate::error::{AppError, EXIT_CONFIG, EXIT_IO, EXIT_RUN_FAILED};
use crate::store::SqliteStore;

pub mod update;

/// Entry point for the `ingest` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::RunUpdate(args) => handle_run_update(args),
        Command::History(args) => handle_history(args),
    }
}

fn handle_run_update(args: RunUpdateArgs) -> Result<(), AppError> {
    let settings = Settings::from_env()?;
    let budget = update::check_budget(settings.monthly_cost_cap, args.cost)?;

    let rows = match &args.rows {
        Some(path) => {
            let loaded = crate::io::load_rows_csv(path)?;
            for err in &loaded.row_errors {
                warn!(line = err.line, message = %err.message, "skipping row");
            }
            info!(
                rows_read = loaded.rows_read,
                rows_kept = loaded.rows.len(),
                "loaded candidate rows"
            );
            Some(loaded.rows)
        }
        None => None,
    };

    let client = HttpClient::with_defaults(settings.rate_limit_per_second, settings.max_retries)?;
    let (entity_id, payload) = fetch_payload(args.source, args.entity.as_deref(), &client, &settings)?;

    let request = update::build_request(args.source, &entity_id, payload, rows, Utc::now());
    let record = update::execute(&request, &settings.database)?;

    print_json(&record)?;

    info!(
        tier = %args.tier,
        raw_expires_at = ?args.tier.raw_expires_at(record.finished_at),
        fact_expires_at = ?args.tier.fact_expires_at(record.finished_at),
        budget_remaining = budget.remaining(),
        "retention and budget"
    );

    if let Some(path) = &args.export {
        crate::io::write_run_json(path, &record)?;
    }

    if record.status == RunStatus::Failed {
        return Err(AppError::new(
            EXIT_RUN_FAILED,
            format!(
                "Run {} failed: {}",
                record.run_id,
                record.error_message.as_deref().unwrap_or("unknown error")
            ),
        ));
    }

    Ok(())
}

fn handle_history(args: HistoryArgs) -> Result<(), AppError> {
    let settings = Settings::from_env()?;

    let DatabaseTarget::Sqlite(path) = &settings.database else {
        return Err(AppError::new(
            EXIT_CONFIG,
            "Run history needs a database; set DATABASE_URL to a sqlite:// path.",
        ));
    };

    let store = SqliteStore::open(path)?;
    let runs = store.read_latest_runs(args.limit)?;
    print_json(&runs)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), AppError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::new(EXIT_IO, format!("Failed to encode output: {e}")))?;
    println!("{text}");
    Ok(())
}
