//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::analysis::MissingKeys;
use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

/// Olistdash - Olist e-commerce analytics dashboard
///
/// Loads the pre-joined Olist CSV tables and renders category rankings,
/// RFM segmentation, review distribution, monthly trends and customer/seller
/// geography as a Markdown or JSON dashboard.
///
/// Examples:
///   olistdash --data-dir ./data
///   olistdash --data-dir ./data --start 2017-01-01 --end 2017-12-31
///   olistdash --format json --output dashboard.json
///   olistdash --dry-run
///   olistdash --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Directory containing the source CSV files
    #[arg(short, long, value_name = "DIR", env = "OLISTDASH_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Output file path for the dashboard
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .olistdash.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// First purchase day of the monthly trend series (YYYY-MM-DD)
    ///
    /// Defaults to the earliest purchase in the data.
    #[arg(long, value_name = "DATE")]
    pub start: Option<NaiveDate>,

    /// Last purchase day of the monthly trend series, inclusive (YYYY-MM-DD)
    ///
    /// Defaults to the latest purchase in the data.
    #[arg(long, value_name = "DATE")]
    pub end: Option<NaiveDate>,

    /// Rows in each top/bottom chart
    #[arg(long, value_name = "N")]
    pub top_n: Option<usize>,

    /// What to do with records lacking a group key (bucket, drop)
    #[arg(long, value_name = "POLICY")]
    pub missing_keys: Option<MissingKeys>,

    /// Width of the longest text chart bar
    #[arg(long, value_name = "CHARS")]
    pub chart_width: Option<usize>,

    /// Maximum rows per Markdown table (0 = no limit)
    #[arg(long, value_name = "ROWS")]
    pub max_table_rows: Option<usize>,

    /// Leave text charts out of the Markdown output
    #[arg(long)]
    pub no_charts: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Exit with code 2 when any dashboard section could not be built
    ///
    /// Useful in scheduled jobs where a missing file should not go unnoticed.
    #[arg(long)]
    pub strict: bool,

    /// Dry run: check which source files are present and exit
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .olistdash.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(format!(
                    "Start date {} is after end date {}",
                    start, end
                ));
            }
        }

        if self.top_n == Some(0) {
            return Err("Top N must be at least 1".to_string());
        }

        if self.chart_width == Some(0) {
            return Err("Chart width must be at least 1".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref dir) = self.data_dir {
            if !dir.is_dir() {
                return Err(format!("Data directory does not exist: {}", dir.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `config_verbose` is the `[general] verbose` key; `--quiet` still wins.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            data_dir: None,
            output: None,
            config: None,
            format: OutputFormat::Markdown,
            start: None,
            end: None,
            top_n: None,
            missing_keys: None,
            chart_width: None,
            max_table_rows: None,
            no_charts: false,
            verbose: false,
            quiet: false,
            strict: false,
            dry_run: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_dates_and_format() {
        let args = Args::try_parse_from([
            "olistdash",
            "--start",
            "2017-01-01",
            "--end",
            "2017-06-30",
            "--format",
            "json",
            "--missing-keys",
            "drop",
        ])
        .unwrap();
        assert_eq!(args.start, NaiveDate::from_ymd_opt(2017, 1, 1));
        assert_eq!(args.end, NaiveDate::from_ymd_opt(2017, 6, 30));
        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(args.missing_keys, Some(MissingKeys::Drop));
    }

    #[test]
    fn test_validation_inverted_range() {
        let mut args = make_args();
        args.start = NaiveDate::from_ymd_opt(2018, 1, 1);
        args.end = NaiveDate::from_ymd_opt(2017, 1, 1);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_top_n() {
        let mut args = make_args();
        args.top_n = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_missing_data_dir() {
        let mut args = make_args();
        args.data_dir = Some(PathBuf::from("/definitely/not/here"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(false), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(false), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(false), tracing::Level::ERROR);
    }

    #[test]
    fn test_config_verbose_raises_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(true), tracing::Level::DEBUG);

        args.quiet = true;
        assert_eq!(args.log_level(true), tracing::Level::ERROR);
    }
}
