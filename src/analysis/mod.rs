//! Analysis modules.
//!
//! The generic grouping pipeline plus the two specialised passes built on
//! it: RFM segmentation and monthly trend series.

pub mod aggregator;
pub mod rfm;
pub mod timeseries;

pub use aggregator::*;
pub use rfm::{reference_date, rfm_table, top_customers, RfmColumn};
pub use timeseries::{filter_by_range, monthly_orders, monthly_payment, DateRange};
