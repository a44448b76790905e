//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.olistdash.toml` files.

use crate::analysis::MissingKeys;
use crate::cli::OutputFormat;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".olistdash.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Source table locations.
    #[serde(default)]
    pub data: DataConfig,

    /// Aggregation settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "olist_dashboard.md".to_string()
}

/// Source data directory and file names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory holding the CSV files.
    #[serde(default = "default_data_dir")]
    pub dir: String,

    /// Customers with their geolocation.
    #[serde(default = "default_customers")]
    pub customers: String,

    /// Sellers with their geolocation.
    #[serde(default = "default_sellers")]
    pub sellers: String,

    /// Orders joined with order items and payments.
    #[serde(default = "default_orders")]
    pub orders: String,

    /// Products joined with order items and category names.
    #[serde(default = "default_product_sales")]
    pub product_sales: String,

    /// Same as `product_sales`, additionally joined with orders.
    #[serde(default = "default_product_purchases")]
    pub product_purchases: String,

    /// Orders joined with payments only.
    #[serde(default = "default_payments")]
    pub payments: String,

    /// Order reviews.
    #[serde(default = "default_reviews")]
    pub reviews: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: default_data_dir(),
            customers: default_customers(),
            sellers: default_sellers(),
            orders: default_orders(),
            product_sales: default_product_sales(),
            product_purchases: default_product_purchases(),
            payments: default_payments(),
            reviews: default_reviews(),
        }
    }
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_customers() -> String {
    "customer_geolocation.csv".to_string()
}

fn default_sellers() -> String {
    "sellers_geolocation.csv".to_string()
}

fn default_orders() -> String {
    "order_orderItem_orderPayment.csv".to_string()
}

fn default_product_sales() -> String {
    "product_orderItems_category.csv".to_string()
}

fn default_product_purchases() -> String {
    "product_orderItems_category_order.csv".to_string()
}

fn default_payments() -> String {
    "order_orderPayment.csv".to_string()
}

fn default_reviews() -> String {
    "order_reviews.csv".to_string()
}

/// Aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Rows in each top/bottom chart.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Handling of records without a group key.
    #[serde(default)]
    pub missing_keys: MissingKeys,

    /// Label of the bucket collecting records without a group key.
    #[serde(default = "default_missing_label")]
    pub missing_label: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            missing_keys: MissingKeys::default(),
            missing_label: default_missing_label(),
        }
    }
}

fn default_top_n() -> usize {
    5
}

fn default_missing_label() -> String {
    "unknown".to_string()
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Render text bar charts under each table.
    #[serde(default = "default_true")]
    pub include_charts: bool,

    /// Width in characters of the longest chart bar.
    #[serde(default = "default_chart_width")]
    pub chart_width: usize,

    /// Truncate long tables (RFM has one row per customer); 0 keeps every row.
    #[serde(default = "default_max_table_rows")]
    pub max_table_rows: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_charts: true,
            chart_width: default_chart_width(),
            max_table_rows: default_max_table_rows(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_chart_width() -> usize {
    40
}

fn default_max_table_rows() -> usize {
    50
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only arguments given explicitly on the command line override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        match args.output {
            Some(ref output) => self.general.output = output.display().to_string(),
            None if args.format == OutputFormat::Json => {
                self.general.output = Path::new(&self.general.output)
                    .with_extension("json")
                    .display()
                    .to_string();
            }
            None => {}
        }
        if let Some(ref dir) = args.data_dir {
            self.data.dir = dir.display().to_string();
        }
        if let Some(top_n) = args.top_n {
            self.analysis.top_n = top_n;
        }
        if let Some(missing_keys) = args.missing_keys {
            self.analysis.missing_keys = missing_keys;
        }
        if let Some(width) = args.chart_width {
            self.report.chart_width = width;
        }
        if let Some(rows) = args.max_table_rows {
            self.report.max_table_rows = rows;
        }
        if args.no_charts {
            self.report.include_charts = false;
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
