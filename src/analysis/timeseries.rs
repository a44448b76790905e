//! Date-range filtering and monthly order/payment series.

use super::aggregator::{group, sort_rows_by, Count, MissingKeys, SortOrder, Sum, SummaryRow};
use crate::error::{DashboardError, Result};
use crate::models::{MonthlyOrdersRow, MonthlyPaymentRow, OrderRecord, YearMonth};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fmt;

/// Closed interval of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(DashboardError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Whether the timestamp falls on a day inside the range, end day included.
    pub fn contains(&self, timestamp: &NaiveDateTime) -> bool {
        let day = timestamp.date();
        self.start <= day && day <= self.end
    }

    /// Smallest range covering every purchase timestamp; `None` for no orders.
    pub fn span_of(orders: &[OrderRecord]) -> Option<Self> {
        let start = orders.iter().map(|o| o.purchased_at).min()?;
        let end = orders.iter().map(|o| o.purchased_at).max()?;
        Some(Self {
            start: start.date(),
            end: end.date(),
        })
    }

    /// Fill unset bounds from `span`.
    ///
    /// A filled bound never crosses the one given, so a single bound past the
    /// data resolves to an empty range instead of an inverted one. Only two
    /// explicit bounds can be inverted.
    pub fn resolve(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        span: Option<DateRange>,
    ) -> Result<Option<Self>> {
        let span_start = span.map(|s| s.start);
        let span_end = span.map(|s| s.end);
        let bounds = match (start, end) {
            (Some(start), Some(end)) => (Some(start), Some(end)),
            (Some(start), None) => (Some(start), span_end.map(|e| e.max(start))),
            (None, Some(end)) => (span_start.map(|s| s.min(end)), Some(end)),
            (None, None) => (span_start, span_end),
        };
        match bounds {
            (Some(start), Some(end)) => Self::new(start, end).map(Some),
            _ => Ok(None),
        }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Orders whose purchase day lies in `range`; all orders when `range` is `None`.
pub fn filter_by_range<'a>(orders: &'a [OrderRecord], range: Option<&DateRange>) -> Vec<&'a OrderRecord> {
    orders
        .iter()
        .filter(|o| range.map_or(true, |r| r.contains(&o.purchased_at)))
        .collect()
}

/// Number of orders per purchase month, one row for every month in the span.
pub fn monthly_orders(orders: &[&OrderRecord]) -> Vec<MonthlyOrdersRow> {
    let mut rows = group(
        orders.iter().copied(),
        |o: &OrderRecord| Some(YearMonth::of(&o.purchased_at)),
        &Count,
        MissingKeys::Drop,
    );
    sort_rows_by(&mut rows, SortOrder::KeyAscending, |v| v);
    fill_month_gaps(rows, 0)
        .into_iter()
        .map(|(month, total_orders)| MonthlyOrdersRow {
            month,
            total_orders,
        })
        .collect()
}

/// Summed payment value per purchase month, one row for every month in the span.
pub fn monthly_payment(orders: &[&OrderRecord]) -> Vec<MonthlyPaymentRow> {
    let mut rows = group(
        orders.iter().copied(),
        |o: &OrderRecord| Some(YearMonth::of(&o.purchased_at)),
        &Sum(|o: &OrderRecord| o.payment_value.unwrap_or(0.0)),
        MissingKeys::Drop,
    );
    sort_rows_by(&mut rows, SortOrder::KeyAscending, |v| v);
    fill_month_gaps(rows, 0.0)
        .into_iter()
        .map(|(month, total_payment)| MonthlyPaymentRow {
            month,
            total_payment,
        })
        .collect()
}

/// Expand chronologically ordered month rows so that no calendar month
/// between the first and last one is absent.
fn fill_month_gaps<V: Copy>(rows: Vec<SummaryRow<YearMonth, V>>, zero: V) -> Vec<(YearMonth, V)> {
    let present: Vec<(YearMonth, V)> = rows
        .into_iter()
        .filter_map(|r| r.key.value().copied().map(|m| (m, r.value)))
        .collect();

    let (first, last) = match (present.first(), present.last()) {
        (Some(first), Some(last)) => (first.0, last.0),
        _ => return Vec::new(),
    };

    let mut filled = Vec::with_capacity(present.len());
    let mut values = present.into_iter().peekable();
    let mut month = first;
    loop {
        let value = match values.peek() {
            Some((m, v)) if *m == month => {
                let v = *v;
                values.next();
                v
            }
            _ => zero,
        };
        filled.push((month, value));
        if month == last {
            break;
        }
        month = month.next();
    }
    filled
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn order(id: &str, purchased: &str, payment: Option<f64>) -> OrderRecord {
        OrderRecord {
            order_id: id.to_string(),
            customer_id: format!("c-{}", id),
            purchased_at: NaiveDateTime::parse_from_str(purchased, "%Y-%m-%d %H:%M:%S").unwrap(),
            approved_at: None,
            delivered_carrier_at: None,
            delivered_customer_at: None,
            estimated_delivery_at: None,
            payment_value: payment,
        }
    }

    fn orders() -> Vec<OrderRecord> {
        vec![
            order("1", "2017-01-05 10:00:00", Some(100.0)),
            order("2", "2017-01-20 23:59:59", Some(50.0)),
            order("3", "2017-04-02 08:30:00", None),
            order("4", "2017-04-30 12:00:00", Some(25.5)),
        ]
    }

    #[test]
    fn test_range_rejects_inverted_bounds() {
        assert!(DateRange::new(day(2017, 2, 1), day(2017, 1, 1)).is_err());
        assert!(DateRange::new(day(2017, 1, 1), day(2017, 1, 1)).is_ok());
    }

    #[test]
    fn test_end_day_is_inclusive() {
        let records = orders();
        let range = DateRange::new(day(2017, 1, 1), day(2017, 1, 20)).unwrap();
        let filtered = filter_by_range(&records, Some(&range));
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_span_and_resolve() {
        let records = orders();
        let span = DateRange::span_of(&records).unwrap();
        assert_eq!(span.start, day(2017, 1, 5));
        assert_eq!(span.end, day(2017, 4, 30));

        let resolved = DateRange::resolve(Some(day(2017, 2, 1)), None, Some(span))
            .unwrap()
            .unwrap();
        assert_eq!(resolved.start, day(2017, 2, 1));
        assert_eq!(resolved.end, day(2017, 4, 30));

        assert_eq!(DateRange::span_of(&[]), None);
        assert_eq!(DateRange::resolve(None, None, None).unwrap(), None);
    }

    #[test]
    fn test_single_bound_past_the_data_resolves_empty() {
        let span = DateRange::span_of(&orders());

        let after = DateRange::resolve(Some(day(2019, 1, 1)), None, span)
            .unwrap()
            .unwrap();
        assert_eq!(after.start, day(2019, 1, 1));
        assert_eq!(after.end, day(2019, 1, 1));

        let before = DateRange::resolve(None, Some(day(2016, 6, 30)), span)
            .unwrap()
            .unwrap();
        assert_eq!(before.start, day(2016, 6, 30));
        assert_eq!(before.end, day(2016, 6, 30));

        let records = orders();
        assert!(filter_by_range(&records, Some(&after)).is_empty());
    }

    #[test]
    fn test_explicit_inverted_bounds_still_fail() {
        let span = DateRange::span_of(&orders());
        assert!(DateRange::resolve(Some(day(2017, 3, 1)), Some(day(2017, 2, 1)), span).is_err());
    }

    #[test]
    fn test_monthly_orders_fill_gaps() {
        let records = orders();
        let all = filter_by_range(&records, None);
        let rows = monthly_orders(&all);
        let labels: Vec<String> = rows.iter().map(|r| r.month.to_string()).collect();
        assert_eq!(labels, vec!["2017-01", "2017-02", "2017-03", "2017-04"]);
        let counts: Vec<u64> = rows.iter().map(|r| r.total_orders).collect();
        assert_eq!(counts, vec![2, 0, 0, 2]);
    }

    #[test]
    fn test_monthly_payment_treats_missing_as_zero() {
        let records = orders();
        let all = filter_by_range(&records, None);
        let rows = monthly_payment(&all);
        assert_eq!(rows.first().map(|r| r.total_payment), Some(150.0));
        assert_eq!(rows.last().map(|r| r.total_payment), Some(25.5));
    }

    #[test]
    fn test_empty_range_yields_empty_series() {
        let records = orders();
        let range = DateRange::new(day(2019, 1, 1), day(2019, 12, 31)).unwrap();
        let filtered = filter_by_range(&records, Some(&range));
        assert!(monthly_orders(&filtered).is_empty());
        assert!(monthly_payment(&filtered).is_empty());
    }

    #[test]
    fn test_totals_grow_with_wider_range() {
        let records = orders();
        let narrow = DateRange::new(day(2017, 1, 10), day(2017, 3, 31)).unwrap();
        let wide = DateRange::new(day(2017, 1, 1), day(2017, 4, 30)).unwrap();

        let total = |range: &DateRange| -> (u64, f64) {
            let filtered = filter_by_range(&records, Some(range));
            let orders: u64 = monthly_orders(&filtered).iter().map(|r| r.total_orders).sum();
            let payment: f64 = monthly_payment(&filtered).iter().map(|r| r.total_payment).sum();
            (orders, payment)
        };

        let (narrow_orders, narrow_payment) = total(&narrow);
        let (wide_orders, wide_payment) = total(&wide);
        assert!(narrow_orders <= wide_orders);
        assert!(narrow_payment <= wide_payment);
        assert_eq!(wide_orders, 4);
    }
}
