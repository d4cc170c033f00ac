//! Export a run record to JSON.

use std::fs::File;
use std::path::Path;

use crate::domain::RunRecord;
use crate::error::{AppError, EXIT_IO};

/// Write `record` as pretty-printed JSON.
pub fn write_run_json(path: &Path, record: &RunRecord) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::new(
            EXIT_IO,
            format!("Failed to create run export '{}': {e}", path.display()),
        )
    })?;

    serde_json::to_writer_pretty(file, record)
        .map_err(|e| AppError::new(EXIT_IO, format!("Failed to write run export: {e}")))?;

    Ok(())
}

/// Read a run record previously written by [`write_run_json`].
pub fn read_run_json(path: &Path) -> Result<RunRecord, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(
            EXIT_IO,
            format!("Failed to open run export '{}': {e}", path.display()),
        )
    })?;
    serde_json::from_reader(file).map_err(|e| AppError::new(EXIT_IO, format!("Invalid run export: {e}")))
}
