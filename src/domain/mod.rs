//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - quarantine reason codes (`QuarantineReason`)
//! - normalized series observations (`SeriesPoint`)
//! - job and run outputs (`JobResult`, `RunRecord`, etc.)

pub mod types;

pub use types::*;
