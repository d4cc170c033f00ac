//! CSV loading of point-in-time candidate rows.
//!
//! Expected columns:
//!
//! - `entity_id` (required)
//! - `as_of`, `available_at` (optional, RFC 3339)
//! - anything else is carried through as a string attribute
//!
//! Design goals:
//! - **Strict schema** for the required column (clear error + exit code 2)
//! - **Lenient timestamps**: an unparsable `available_at` is kept as missing so
//!   the point-in-time filter drops it, rather than failing the file
//! - **Row-level errors** are collected and reported, not fatal

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};
use csv::StringRecord;
use serde_json::{Map, Value};

use crate::error::{AppError, EXIT_CONFIG};
use crate::pit::Row;

/// A row-level error encountered during load.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct LoadedRows {
    pub rows: Vec<Row>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

pub fn load_rows_csv(path: &Path) -> Result<LoadedRows, AppError> {
    let file = std::fs::File::open(path).map_err(|e| {
        AppError::new(
            EXIT_CONFIG,
            format!("Failed to open rows CSV '{}': {e}", path.display()),
        )
    })?;
    read_rows(file)
}

pub fn read_rows<R: Read>(input: R) -> Result<LoadedRows, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(EXIT_CONFIG, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    if !header_map.contains_key("entity_id") {
        return Err(AppError::new(EXIT_CONFIG, "Missing required column: `entity_id`"));
    }

    let mut rows = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, &headers, &header_map) {
            Ok(row) => rows.push(row),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    Ok(LoadedRows {
        rows,
        row_errors,
        rows_read,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn parse_row(
    record: &StringRecord,
    headers: &StringRecord,
    header_map: &HashMap<String, usize>,
) -> Result<Row, String> {
    let field = |name: &str| {
        header_map
            .get(name)
            .and_then(|&idx| record.get(idx))
            .filter(|v| !v.is_empty())
    };

    let entity_id = field("entity_id").ok_or_else(|| "missing `entity_id`".to_string())?;

    let mut attributes = Map::new();
    for (idx, name) in headers.iter().enumerate() {
        let key = normalize_header_name(name);
        if matches!(key.as_str(), "entity_id" | "as_of" | "available_at") {
            continue;
        }
        if let Some(value) = record.get(idx) {
            attributes.insert(key, Value::String(value.to_string()));
        }
    }

    Ok(Row {
        entity_id: entity_id.to_string(),
        as_of: field("as_of").and_then(parse_rfc3339),
        available_at: field("available_at").and_then(parse_rfc3339),
        attributes,
    })
}

fn parse_rfc3339(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
