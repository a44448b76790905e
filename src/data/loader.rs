//! CSV reading with up-front schema validation.
//!
//! Each source table has a [`Schema`]: the columns it requires, the raw row
//! shape serde reads, and the conversion into the typed record. Headers are
//! checked once before any row is read, so a renamed or missing column fails
//! with the column names instead of a per-row decode error.

use crate::error::{DashboardError, Result};
use crate::models::{CategoryRecord, GeoRecord, OrderRecord, ReviewRecord};
use chrono::{NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

const TIMESTAMP_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
];

/// Where a row came from, for error messages.
#[derive(Debug, Clone, Copy)]
pub struct RowContext<'a> {
    pub path: &'a Path,
    pub line: u64,
}

/// Typed description of one source table.
pub trait Schema {
    type Row: DeserializeOwned;
    type Record;

    /// Columns that must be present in the header row.
    const REQUIRED: &'static [&'static str];

    fn convert(row: Self::Row, at: RowContext<'_>) -> Result<Self::Record>;
}

/// Read and convert every row of the file at `path`.
pub fn read_table<S: Schema>(path: &Path) -> Result<Vec<S::Record>> {
    let file = File::open(path).map_err(|source| DashboardError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let records = read_from::<S, _>(file, path)?;
    debug!("Loaded {} rows from {}", records.len(), path.display());
    Ok(records)
}

/// Read and convert CSV from any reader; `path` is only used for errors.
pub fn read_from<S: Schema, R: Read>(reader: R, path: &Path) -> Result<Vec<S::Record>> {
    let csv_error = |source: csv::Error| DashboardError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers().map_err(csv_error)?.clone();
    validate_headers(&headers, S::REQUIRED, path)?;

    let mut records = Vec::new();
    let mut raw = csv::StringRecord::new();
    while reader.read_record(&mut raw).map_err(csv_error)? {
        let line = raw.position().map(|p| p.line()).unwrap_or(0);
        let row: S::Row = raw.deserialize(Some(&headers)).map_err(csv_error)?;
        records.push(S::convert(row, RowContext { path, line })?);
    }

    Ok(records)
}

/// Fail with every required column absent from `headers`.
pub fn validate_headers(headers: &csv::StringRecord, required: &[&str], path: &Path) -> Result<()> {
    let missing: Vec<String> = required
        .iter()
        .filter(|column| !headers.iter().any(|h| h == **column))
        .map(|column| column.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(DashboardError::SchemaMismatch {
            path: path.to_path_buf(),
            missing,
        })
    }
}

/// Parse a timestamp cell; date-only values map to midnight.
pub fn parse_timestamp(value: &str, column: &str, at: RowContext<'_>) -> Result<NaiveDateTime> {
    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(ts);
        }
    }
    if let Some(ts) = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(ts);
    }

    Err(DashboardError::InvalidTimestamp {
        path: at.path.to_path_buf(),
        line: at.line,
        column: column.to_string(),
        value: value.to_string(),
    })
}

fn parse_optional_timestamp(
    value: Option<String>,
    column: &str,
    at: RowContext<'_>,
) -> Result<Option<NaiveDateTime>> {
    value.map(|v| parse_timestamp(&v, column, at)).transpose()
}

/// Orders joined with payments (and optionally items).
pub struct Orders;

#[derive(Debug, Deserialize)]
pub struct OrderRow {
    order_id: String,
    customer_id: String,
    order_purchase_timestamp: String,
    #[serde(default)]
    order_approved_at: Option<String>,
    #[serde(default)]
    order_delivered_carrier_date: Option<String>,
    #[serde(default)]
    order_delivered_customer_date: Option<String>,
    #[serde(default)]
    order_estimated_delivery_date: Option<String>,
    #[serde(default)]
    payment_value: Option<f64>,
}

impl Schema for Orders {
    type Row = OrderRow;
    type Record = OrderRecord;

    const REQUIRED: &'static [&'static str] = &[
        "order_id",
        "customer_id",
        "order_purchase_timestamp",
        "payment_value",
    ];

    fn convert(row: OrderRow, at: RowContext<'_>) -> Result<OrderRecord> {
        Ok(OrderRecord {
            purchased_at: parse_timestamp(
                &row.order_purchase_timestamp,
                "order_purchase_timestamp",
                at,
            )?,
            approved_at: parse_optional_timestamp(row.order_approved_at, "order_approved_at", at)?,
            delivered_carrier_at: parse_optional_timestamp(
                row.order_delivered_carrier_date,
                "order_delivered_carrier_date",
                at,
            )?,
            delivered_customer_at: parse_optional_timestamp(
                row.order_delivered_customer_date,
                "order_delivered_customer_date",
                at,
            )?,
            estimated_delivery_at: parse_optional_timestamp(
                row.order_estimated_delivery_date,
                "order_estimated_delivery_date",
                at,
            )?,
            order_id: row.order_id,
            customer_id: row.customer_id,
            payment_value: row.payment_value,
        })
    }
}

/// Order items joined with products and the English category name.
pub struct Categories;

#[derive(Debug, Deserialize)]
pub struct CategoryRow {
    #[serde(default)]
    order_id: Option<String>,
    #[serde(default)]
    product_id: Option<String>,
    product_category_name_english: Option<String>,
}

impl Schema for Categories {
    type Row = CategoryRow;
    type Record = CategoryRecord;

    const REQUIRED: &'static [&'static str] = &["product_category_name_english"];

    fn convert(row: CategoryRow, _at: RowContext<'_>) -> Result<CategoryRecord> {
        Ok(CategoryRecord {
            order_id: row.order_id,
            product_id: row.product_id,
            category: row.product_category_name_english,
        })
    }
}

/// Order reviews.
pub struct Reviews;

#[derive(Debug, Deserialize)]
pub struct ReviewRow {
    #[serde(default)]
    order_id: Option<String>,
    review_score: Option<f64>,
}

impl Schema for Reviews {
    type Row = ReviewRow;
    type Record = ReviewRecord;

    const REQUIRED: &'static [&'static str] = &["review_score"];

    fn convert(row: ReviewRow, at: RowContext<'_>) -> Result<ReviewRecord> {
        // Scores may be written as floats ("5.0") when the column had gaps.
        let score = match row.review_score {
            Some(s) if s.fract() == 0.0 && (1.0..=5.0).contains(&s) => Some(s as u8),
            Some(s) => {
                debug!(
                    "Review score {} outside 1-5 in {} (line {}), counted as missing",
                    s,
                    at.path.display(),
                    at.line
                );
                None
            }
            None => None,
        };
        Ok(ReviewRecord {
            order_id: row.order_id,
            score,
        })
    }
}

/// Customer locations.
pub struct CustomerLocations;

#[derive(Debug, Deserialize)]
pub struct CustomerLocationRow {
    #[serde(default)]
    customer_id: Option<String>,
    #[serde(default)]
    customer_unique_id: Option<String>,
    customer_state: Option<String>,
    geolocation_lat: Option<f64>,
    geolocation_lng: Option<f64>,
}

impl Schema for CustomerLocations {
    type Row = CustomerLocationRow;
    type Record = GeoRecord;

    const REQUIRED: &'static [&'static str] =
        &["customer_state", "geolocation_lat", "geolocation_lng"];

    fn convert(row: CustomerLocationRow, _at: RowContext<'_>) -> Result<GeoRecord> {
        Ok(GeoRecord {
            entity_id: row.customer_id.or(row.customer_unique_id),
            state: row.customer_state,
            longitude: row.geolocation_lng,
            latitude: row.geolocation_lat,
        })
    }
}

/// Seller locations.
pub struct SellerLocations;

#[derive(Debug, Deserialize)]
pub struct SellerLocationRow {
    #[serde(default)]
    seller_id: Option<String>,
    seller_state: Option<String>,
    geolocation_lat: Option<f64>,
    geolocation_lng: Option<f64>,
}

impl Schema for SellerLocations {
    type Row = SellerLocationRow;
    type Record = GeoRecord;

    const REQUIRED: &'static [&'static str] =
        &["seller_state", "geolocation_lat", "geolocation_lng"];

    fn convert(row: SellerLocationRow, _at: RowContext<'_>) -> Result<GeoRecord> {
        Ok(GeoRecord {
            entity_id: row.seller_id,
            state: row.seller_state,
            longitude: row.geolocation_lng,
            latitude: row.geolocation_lat,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse<S: Schema>(csv: &str) -> Result<Vec<S::Record>> {
        read_from::<S, _>(csv.as_bytes(), Path::new("test.csv"))
    }

    #[test]
    fn test_orders_parse_with_optional_timestamps() {
        let csv = "\
order_id,customer_id,order_status,order_purchase_timestamp,order_approved_at,order_delivered_carrier_date,order_delivered_customer_date,order_estimated_delivery_date,payment_value
e481f51c,9ef432eb,delivered,2017-10-02 10:56:33,2017-10-02 11:07:15,,,2017-10-18 00:00:00,18.12
53cdb2fc,b0830fb4,delivered,2018-07-24 20:41:37,,,,2018-08-13,
";
        let orders = parse::<Orders>(csv).unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].order_id, "e481f51c");
        assert_eq!(orders[0].payment_value, Some(18.12));
        assert!(orders[0].approved_at.is_some());
        assert!(orders[0].delivered_carrier_at.is_none());
        assert_eq!(orders[1].payment_value, None);
        assert_eq!(
            orders[1].estimated_delivery_at.map(|t| t.to_string()),
            Some("2018-08-13 00:00:00".to_string())
        );
    }

    #[test]
    fn test_missing_column_is_schema_mismatch() {
        let csv = "order_id,customer_id,payment_value\n1,2,3.0\n";
        match parse::<Orders>(csv) {
            Err(DashboardError::SchemaMismatch { missing, .. }) => {
                assert_eq!(missing, vec!["order_purchase_timestamp".to_string()]);
            }
            other => panic!("expected schema mismatch, got {:?}", other.map(|v| v.len())),
        }
    }

    #[test]
    fn test_bad_timestamp_reports_line_and_column() {
        let csv = "order_id,customer_id,order_purchase_timestamp,payment_value\n\
                   a,b,2017-10-02 10:56:33,1.0\n\
                   c,d,yesterday,2.0\n";
        match parse::<Orders>(csv) {
            Err(DashboardError::InvalidTimestamp {
                line,
                column,
                value,
                ..
            }) => {
                assert_eq!(line, 3);
                assert_eq!(column, "order_purchase_timestamp");
                assert_eq!(value, "yesterday");
            }
            other => panic!("expected invalid timestamp, got {:?}", other.map(|v| v.len())),
        }
    }

    #[test]
    fn test_categories_keep_empty_names_as_missing() {
        let csv = "order_id,product_id,product_category_name_english\n\
                   o1,p1,housewares\n\
                   o2,p2,\n";
        let rows = parse::<Categories>(csv).unwrap();
        assert_eq!(rows[0].category.as_deref(), Some("housewares"));
        assert_eq!(rows[1].category, None);
    }

    #[test]
    fn test_review_scores_accept_float_cells() {
        let csv = "review_id,order_id,review_score\nr1,o1,4\nr2,o2,5.0\nr3,o3,\nr4,o4,9\n";
        let rows = parse::<Reviews>(csv).unwrap();
        let scores: Vec<Option<u8>> = rows.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![Some(4), Some(5), None, None]);
    }

    #[test]
    fn test_locations_map_state_and_coordinates() {
        let csv = "seller_id,seller_state,geolocation_lat,geolocation_lng\n\
                   s1,SP,-23.5,-46.6\n";
        let rows = parse::<SellerLocations>(csv).unwrap();
        assert_eq!(rows[0].state.as_deref(), Some("SP"));
        assert_eq!(rows[0].latitude, Some(-23.5));
        assert_eq!(rows[0].longitude, Some(-46.6));

        let csv = "customer_unique_id,customer_state,geolocation_lat,geolocation_lng\n\
                   u1,MG,-19.9,-43.9\n";
        let rows = parse::<CustomerLocations>(csv).unwrap();
        assert_eq!(rows[0].entity_id.as_deref(), Some("u1"));

        let csv = "customer_id,customer_unique_id,customer_state,geolocation_lat,geolocation_lng\n\
                   c1,u1,SP,-23.5,-46.6\n";
        let rows = parse::<CustomerLocations>(csv).unwrap();
        assert_eq!(rows[0].entity_id.as_deref(), Some("c1"));

        let csv = "customer_state,geolocation_lat,geolocation_lng\nRJ,,\n";
        let rows = parse::<CustomerLocations>(csv).unwrap();
        assert_eq!(rows[0].entity_id, None);
        assert_eq!(rows[0].longitude, None);
    }

    #[test]
    fn test_header_only_file_is_empty_table() {
        let rows = parse::<Reviews>("review_score\n").unwrap();
        assert!(rows.is_empty());
    }
}
