//! Data models for the dashboard.
//!
//! This module contains the typed input records read from the source
//! tables and the summary rows produced by each dashboard section.

use chrono::{Datelike, NaiveDateTime};
use serde::{Serialize, Serializer};
use std::fmt;

/// One row of an orders table (orders joined with items and/or payments).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRecord {
    pub order_id: String,
    pub customer_id: String,
    pub purchased_at: NaiveDateTime,
    pub approved_at: Option<NaiveDateTime>,
    pub delivered_carrier_at: Option<NaiveDateTime>,
    pub delivered_customer_at: Option<NaiveDateTime>,
    pub estimated_delivery_at: Option<NaiveDateTime>,
    /// Missing payments count as zero in sums.
    pub payment_value: Option<f64>,
}

/// One order item with its English category name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryRecord {
    pub order_id: Option<String>,
    pub product_id: Option<String>,
    pub category: Option<String>,
}

/// One order review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewRecord {
    pub order_id: Option<String>,
    /// `None` when the cell is empty or outside 1..=5.
    pub score: Option<u8>,
}

/// Which party a geolocation row describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Party {
    Customer,
    Seller,
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Party::Customer => write!(f, "Customer"),
            Party::Seller => write!(f, "Seller"),
        }
    }
}

impl Party {
    /// Plural noun used in section titles and totals.
    pub fn plural(&self) -> &'static str {
        match self {
            Party::Customer => "Customers",
            Party::Seller => "Sellers",
        }
    }
}

/// A customer or seller location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoRecord {
    pub entity_id: Option<String>,
    pub state: Option<String>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
}

/// Calendar month bucket, rendered as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn of(timestamp: &NaiveDateTime) -> Self {
        Self::new(timestamp.year(), timestamp.month())
    }

    /// The following calendar month.
    pub fn next(self) -> Self {
        if self.month >= 12 {
            Self::new(self.year + 1, 1)
        } else {
            Self::new(self.year, self.month + 1)
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Category ranked by number of order items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryRow {
    pub category: String,
    pub total: u64,
}

/// Recency/frequency/monetary triple for one customer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RfmRow {
    pub customer_id: String,
    /// Whole days between the last purchase and the dataset's latest purchase.
    pub recency: i64,
    /// Distinct orders.
    pub frequency: u64,
    /// Summed payment value.
    pub monetary: f64,
}

/// Review count for one rating.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingRow {
    /// `None` groups reviews without a usable score.
    pub rating: Option<u8>,
    pub total: u64,
    /// Percentage of all reviews, rounded to one decimal.
    pub share: f64,
}

impl RatingRow {
    pub fn label(&self, missing_label: &str) -> String {
        match self.rating {
            Some(r) => r.to_string(),
            None => missing_label.to_string(),
        }
    }
}

/// Orders placed in one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyOrdersRow {
    pub month: YearMonth,
    pub total_orders: u64,
}

/// Payment value collected in one month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyPaymentRow {
    pub month: YearMonth,
    pub total_payment: f64,
}

/// Customers or sellers located in one state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateRow {
    pub state: String,
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_year_month_display() {
        assert_eq!(YearMonth::new(2017, 3).to_string(), "2017-03");
        assert_eq!(YearMonth::new(2018, 12).to_string(), "2018-12");
    }

    #[test]
    fn test_year_month_next_rolls_over() {
        assert_eq!(YearMonth::new(2017, 11).next(), YearMonth::new(2017, 12));
        assert_eq!(YearMonth::new(2017, 12).next(), YearMonth::new(2018, 1));
    }

    #[test]
    fn test_year_month_ordering() {
        assert!(YearMonth::new(2016, 12) < YearMonth::new(2017, 1));
        assert!(YearMonth::new(2017, 2) < YearMonth::new(2017, 10));
    }

    #[test]
    fn test_year_month_of_timestamp() {
        let ts = NaiveDate::from_ymd_opt(2018, 8, 29)
            .unwrap()
            .and_hms_opt(15, 0, 37)
            .unwrap();
        assert_eq!(YearMonth::of(&ts), YearMonth::new(2018, 8));
    }

    #[test]
    fn test_year_month_serializes_as_label() {
        let row = MonthlyOrdersRow {
            month: YearMonth::new(2017, 1),
            total_orders: 4,
        };
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"month":"2017-01","total_orders":4}"#);
    }

    #[test]
    fn test_rating_row_label() {
        let row = RatingRow {
            rating: None,
            total: 2,
            share: 1.0,
        };
        assert_eq!(row.label("unknown"), "unknown");
        let row = RatingRow {
            rating: Some(5),
            ..row
        };
        assert_eq!(row.label("unknown"), "5");
    }
}
