//! Command-line parsing for the `ingest` binary.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! gating/storage code; dispatch lives in `crate::app`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::data::SourceKind;
use crate::store::DataTier;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "ingest", version, about = "Governed macro/financial data ingestion")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch one payload, run it through the gates, and record the run.
    RunUpdate(RunUpdateArgs),
    /// Print recent runs from the SQLite store.
    History(HistoryArgs),
}

#[derive(Debug, Args, Clone)]
pub struct RunUpdateArgs {
    /// Upstream source to fetch from.
    #[arg(long, value_enum)]
    pub source: SourceKind,

    /// Entity to fetch (series id, stat code, corp code, or CIK).
    ///
    /// Defaults to the configured entity for the source.
    #[arg(long)]
    pub entity: Option<String>,

    /// CSV of point-in-time candidate rows (`entity_id,as_of,available_at,...`).
    #[arg(long)]
    pub rows: Option<PathBuf>,

    /// Export the run record to JSON.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Estimated vendor cost of this fetch, charged against the monthly cap.
    #[arg(long, default_value_t = 0.0)]
    pub cost: f64,

    /// Retention tier for what this run writes.
    #[arg(long, value_enum, default_value_t = DataTier::Silver)]
    pub tier: DataTier,
}

#[derive(Debug, Args, Clone)]
pub struct HistoryArgs {
    /// Number of runs to show, newest first.
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}
