//! Source tables: file layout, loading and the per-run dataset context.

pub mod loader;

use crate::error::DashboardError;
use crate::models::{CategoryRecord, GeoRecord, OrderRecord, ReviewRecord};
use indicatif::{ProgressBar, ProgressStyle};
use loader::{read_table, Categories, CustomerLocations, Orders, Reviews, SellerLocations};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// One of the seven source tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Customers,
    Sellers,
    Orders,
    ProductSales,
    ProductPurchases,
    Payments,
    Reviews,
}

impl Table {
    pub const ALL: [Table; 7] = [
        Table::Customers,
        Table::Sellers,
        Table::Orders,
        Table::ProductSales,
        Table::ProductPurchases,
        Table::Payments,
        Table::Reviews,
    ];
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Table::Customers => "customer locations",
            Table::Sellers => "seller locations",
            Table::Orders => "orders with items and payments",
            Table::ProductSales => "product sales by category",
            Table::ProductPurchases => "product purchases by category",
            Table::Payments => "orders with payments",
            Table::Reviews => "order reviews",
        };
        write!(f, "{}", name)
    }
}

/// Locations of the source files.
#[derive(Debug, Clone)]
pub struct DataFiles {
    pub dir: PathBuf,
    pub customers: String,
    pub sellers: String,
    pub orders: String,
    pub product_sales: String,
    pub product_purchases: String,
    pub payments: String,
    pub reviews: String,
}

impl Default for DataFiles {
    fn default() -> Self {
        Self::from(&crate::config::DataConfig::default())
    }
}

impl From<&crate::config::DataConfig> for DataFiles {
    fn from(config: &crate::config::DataConfig) -> Self {
        Self {
            dir: PathBuf::from(&config.dir),
            customers: config.customers.clone(),
            sellers: config.sellers.clone(),
            orders: config.orders.clone(),
            product_sales: config.product_sales.clone(),
            product_purchases: config.product_purchases.clone(),
            payments: config.payments.clone(),
            reviews: config.reviews.clone(),
        }
    }
}

impl DataFiles {
    /// Full path of a table's file.
    pub fn path(&self, table: Table) -> PathBuf {
        let name = match table {
            Table::Customers => &self.customers,
            Table::Sellers => &self.sellers,
            Table::Orders => &self.orders,
            Table::ProductSales => &self.product_sales,
            Table::ProductPurchases => &self.product_purchases,
            Table::Payments => &self.payments,
            Table::Reviews => &self.reviews,
        };
        self.dir.join(name)
    }
}

/// A table that either loaded or failed to.
pub type Loaded<T> = Result<Vec<T>, DashboardError>;

/// All source tables of one run.
///
/// Tables load independently; a missing file only affects the dashboard
/// sections built from it.
#[derive(Debug)]
pub struct Dataset {
    pub customers: Loaded<GeoRecord>,
    pub sellers: Loaded<GeoRecord>,
    pub orders: Loaded<OrderRecord>,
    pub product_sales: Loaded<CategoryRecord>,
    pub product_purchases: Loaded<CategoryRecord>,
    pub payments: Loaded<OrderRecord>,
    pub reviews: Loaded<ReviewRecord>,
}

impl Dataset {
    /// Load every table, optionally showing a progress bar.
    pub fn load_with_progress(files: &DataFiles, show_progress: bool) -> Self {
        let progress = if show_progress {
            let pb = ProgressBar::new(Table::ALL.len() as u64);
            pb.set_style(
                ProgressStyle::with_template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            pb.enable_steady_tick(Duration::from_millis(100));
            Some(pb)
        } else {
            None
        };

        let step = |table: Table| {
            if let Some(ref pb) = progress {
                pb.set_message(table.to_string());
            }
            files.path(table)
        };
        let done = || {
            if let Some(ref pb) = progress {
                pb.inc(1);
            }
        };

        let customers = read_table::<CustomerLocations>(&step(Table::Customers));
        done();
        let sellers = read_table::<SellerLocations>(&step(Table::Sellers));
        done();
        let orders = read_table::<Orders>(&step(Table::Orders));
        done();
        let product_sales = read_table::<Categories>(&step(Table::ProductSales));
        done();
        let product_purchases = read_table::<Categories>(&step(Table::ProductPurchases));
        done();
        let payments = read_table::<Orders>(&step(Table::Payments));
        done();
        let reviews = read_table::<Reviews>(&step(Table::Reviews));
        done();

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        let dataset = Self {
            customers,
            sellers,
            orders,
            product_sales,
            product_purchases,
            payments,
            reviews,
        };

        for (table, err) in dataset.failures() {
            warn!("Could not load {}: {}", table, err);
        }
        info!(
            "Loaded {}/{} tables from {}",
            Table::ALL.len() - dataset.failures().len(),
            Table::ALL.len(),
            files.dir.display()
        );

        dataset
    }

    /// Tables that failed to load, with the reason.
    pub fn failures(&self) -> Vec<(Table, &DashboardError)> {
        let results: [(Table, Option<&DashboardError>); 7] = [
            (Table::Customers, self.customers.as_ref().err()),
            (Table::Sellers, self.sellers.as_ref().err()),
            (Table::Orders, self.orders.as_ref().err()),
            (Table::ProductSales, self.product_sales.as_ref().err()),
            (Table::ProductPurchases, self.product_purchases.as_ref().err()),
            (Table::Payments, self.payments.as_ref().err()),
            (Table::Reviews, self.reviews.as_ref().err()),
        ];
        results
            .into_iter()
            .filter_map(|(table, err)| err.map(|e| (table, e)))
            .collect()
    }
}

/// Presence of one source file on disk.
#[derive(Debug, Clone)]
pub struct SurveyEntry {
    pub table: Table,
    pub path: PathBuf,
    /// File size in bytes; `None` when the file is missing.
    pub size: Option<u64>,
}

/// Check which source files exist, without reading them.
pub fn survey(files: &DataFiles) -> Vec<SurveyEntry> {
    Table::ALL
        .iter()
        .map(|&table| {
            let path = files.path(table);
            let size = file_size(&path);
            SurveyEntry { table, path, size }
        })
        .collect()
}

fn file_size(path: &Path) -> Option<u64> {
    std::fs::metadata(path)
        .ok()
        .filter(|m| m.is_file())
        .map(|m| m.len())
}
