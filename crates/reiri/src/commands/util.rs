//! Shared helpers for command handlers.

use std::path::Path;

use reiri_core::PointTable;

use crate::error::CliError;

/// Parse an operate table from JSON text.
pub fn parse_point_table(json: &str, field: &str) -> Result<PointTable, CliError> {
    serde_json::from_str(json).map_err(|e| CliError::Validation {
        field: field.into(),
        reason: format!("expected {{\"<point>\": {{\"<attribute>\": <value>}}}}: {e}"),
    })
}

/// Read and parse an operate table for `--from-file`.
pub fn read_point_table(path: &Path) -> Result<PointTable, CliError> {
    let contents = std::fs::read_to_string(path)?;
    parse_point_table(&contents, "from-file")
}

/// Print a status line to stderr unless `--quiet`.
pub fn status(quiet: bool, message: &str) {
    if !quiet {
        eprintln!("{message}");
    }
}
