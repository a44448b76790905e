//! Dashboard rendering (Markdown and JSON).

pub mod format;
pub mod generator;

pub use generator::{generate_json_report, generate_markdown_report};

use crate::analysis::{DateRange, MissingKeys};
use crate::dashboard::Dashboard;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Facts about one run, printed above the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub generated_at: DateTime<Utc>,
    pub data_dir: String,
    /// Effective range of the monthly series.
    pub date_range: Option<DateRange>,
    pub top_n: usize,
    pub missing_keys: MissingKeys,
    pub tables_loaded: usize,
    pub tables_total: usize,
    pub duration_seconds: f64,
}

/// A rendered-ready dashboard with its metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub dashboard: Dashboard,
}
