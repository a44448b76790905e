//! Error types for loading and validating dashboard input tables.

use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while turning input files into typed tables.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// Input file missing or unreadable.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed CSV (bad quoting, wrong field type, ...).
    #[error("malformed CSV in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Header row lacks columns the typed schema requires.
    #[error("schema mismatch in {}: missing column(s) {}", path.display(), missing.join(", "))]
    SchemaMismatch { path: PathBuf, missing: Vec<String> },

    /// A timestamp cell could not be parsed.
    #[error("invalid timestamp {value:?} in {} (line {line}, column {column})", path.display())]
    InvalidTimestamp {
        path: PathBuf,
        line: u64,
        column: String,
        value: String,
    },

    /// Requested date range is inverted.
    #[error("invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
}

/// Type alias for Results using DashboardError
pub type Result<T> = std::result::Result<T, DashboardError>;
