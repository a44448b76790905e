//! Recency / frequency / monetary customer segmentation.

use super::aggregator::{group, CountDistinct, Metric, MissingKeys, SortOrder, Sum};
use crate::models::{OrderRecord, RfmRow};
use chrono::NaiveDateTime;
use std::cmp::Ordering;
use std::collections::BTreeSet;

type OrderField<T> = fn(&OrderRecord) -> T;

fn order_id(order: &OrderRecord) -> String {
    order.order_id.clone()
}

fn payment(order: &OrderRecord) -> f64 {
    order.payment_value.unwrap_or(0.0)
}

/// Composite metric computing all three RFM columns in one grouped pass.
///
/// Frequency and monetary fold through the plain [`CountDistinct`] and
/// [`Sum`] metrics; only recency is specific to RFM.
#[derive(Clone, Copy)]
pub struct Rfm {
    /// Latest purchase in the whole table; recency is measured from here.
    pub reference: NaiveDateTime,
    frequency: CountDistinct<OrderField<String>>,
    monetary: Sum<OrderField<f64>>,
}

impl Rfm {
    pub fn new(reference: NaiveDateTime) -> Self {
        Self {
            reference,
            frequency: CountDistinct(order_id),
            monetary: Sum(payment),
        }
    }
}

#[derive(Debug, Default)]
pub struct RfmAcc {
    last_purchase: Option<NaiveDateTime>,
    orders: BTreeSet<String>,
    monetary: f64,
}

/// RFM values of one customer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RfmScores {
    pub recency: i64,
    pub frequency: u64,
    pub monetary: f64,
}

impl Metric<OrderRecord> for Rfm {
    type Acc = RfmAcc;
    type Output = RfmScores;

    fn accumulate(&self, acc: &mut RfmAcc, record: &OrderRecord) {
        acc.last_purchase = Some(match acc.last_purchase {
            Some(last) => last.max(record.purchased_at),
            None => record.purchased_at,
        });
        self.frequency.accumulate(&mut acc.orders, record);
        self.monetary.accumulate(&mut acc.monetary, record);
    }

    fn finish(&self, acc: RfmAcc) -> RfmScores {
        let recency = acc
            .last_purchase
            .map(|last| (self.reference - last).num_days())
            .unwrap_or(0);
        RfmScores {
            recency,
            frequency: self.frequency.finish(acc.orders),
            monetary: self.monetary.finish(acc.monetary),
        }
    }
}

/// Latest purchase timestamp of the table.
pub fn reference_date(orders: &[OrderRecord]) -> Option<NaiveDateTime> {
    orders.iter().map(|o| o.purchased_at).max()
}

/// One RFM row per customer, ordered by customer id.
pub fn rfm_table(orders: &[OrderRecord]) -> Vec<RfmRow> {
    let Some(reference) = reference_date(orders) else {
        return Vec::new();
    };

    group(
        orders,
        |o: &OrderRecord| Some(o.customer_id.clone()),
        &Rfm::new(reference),
        MissingKeys::Drop,
    )
    .into_iter()
    .filter_map(|row| {
        let customer_id = row.key.value()?.clone();
        Some(RfmRow {
            customer_id,
            recency: row.value.recency,
            frequency: row.value.frequency,
            monetary: row.value.monetary,
        })
    })
    .collect()
}

/// Which RFM column to rank customers by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RfmColumn {
    Recency,
    Frequency,
    Monetary,
}

impl RfmColumn {
    /// Display order of the column's top-N chart: most recent first,
    /// otherwise largest first.
    pub fn order(&self) -> SortOrder {
        match self {
            RfmColumn::Recency => SortOrder::ValueAscending,
            RfmColumn::Frequency | RfmColumn::Monetary => SortOrder::ValueDescending,
        }
    }

    pub fn value(&self, row: &RfmRow) -> f64 {
        match self {
            RfmColumn::Recency => row.recency as f64,
            RfmColumn::Frequency => row.frequency as f64,
            RfmColumn::Monetary => row.monetary,
        }
    }
}

/// Best `n` customers for `column`; ties keep customer id order.
pub fn top_customers(rows: &[RfmRow], column: RfmColumn, n: usize) -> Vec<RfmRow> {
    let mut ranked = rows.to_vec();
    ranked.sort_by(|a, b| {
        let (a, b) = (column.value(a), column.value(b));
        let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
        match column.order() {
            SortOrder::ValueDescending => ord.reverse(),
            _ => ord,
        }
    });
    ranked.truncate(n);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(id: &str, customer: &str, purchased: &str, payment: f64) -> OrderRecord {
        OrderRecord {
            order_id: id.to_string(),
            customer_id: customer.to_string(),
            purchased_at: NaiveDateTime::parse_from_str(purchased, "%Y-%m-%d %H:%M:%S").unwrap(),
            approved_at: None,
            delivered_carrier_at: None,
            delivered_customer_at: None,
            estimated_delivery_at: None,
            payment_value: Some(payment),
        }
    }

    #[test]
    fn test_three_orders_same_customer() {
        let orders = vec![
            order("a", "alice", "2018-01-01 09:00:00", 100.0),
            order("b", "alice", "2018-02-01 09:00:00", 50.0),
            order("c", "alice", "2018-03-01 09:00:00", 25.0),
        ];
        let rows = rfm_table(&orders);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].customer_id, "alice");
        assert_eq!(rows[0].recency, 0);
        assert_eq!(rows[0].frequency, 3);
        assert_eq!(rows[0].monetary, 175.0);
    }

    #[test]
    fn test_recency_counts_whole_days() {
        let orders = vec![
            order("a", "alice", "2018-03-01 09:00:00", 10.0),
            order("b", "bob", "2018-02-27 10:00:00", 10.0),
        ];
        let rows = rfm_table(&orders);
        let bob = rows.iter().find(|r| r.customer_id == "bob").unwrap();
        // 1 day 23 hours
        assert_eq!(bob.recency, 1);
    }

    #[test]
    fn test_frequency_counts_distinct_orders() {
        // one order split over two payment rows
        let orders = vec![
            order("a", "carol", "2018-03-01 09:00:00", 30.0),
            order("a", "carol", "2018-03-01 09:00:00", 20.0),
        ];
        let rows = rfm_table(&orders);
        assert_eq!(rows[0].frequency, 1);
        assert_eq!(rows[0].monetary, 50.0);
    }

    #[test]
    fn test_top_customers_per_column() {
        let orders = vec![
            order("1", "a", "2018-01-01 00:00:00", 500.0),
            order("2", "b", "2018-03-01 00:00:00", 10.0),
            order("3", "c", "2018-02-01 00:00:00", 20.0),
            order("4", "c", "2018-02-10 00:00:00", 20.0),
        ];
        let rows = rfm_table(&orders);

        let recent = top_customers(&rows, RfmColumn::Recency, 2);
        assert_eq!(recent[0].customer_id, "b");
        assert_eq!(recent[1].customer_id, "c");

        let frequent = top_customers(&rows, RfmColumn::Frequency, 1);
        assert_eq!(frequent[0].customer_id, "c");

        let spenders = top_customers(&rows, RfmColumn::Monetary, 5);
        assert_eq!(spenders.len(), 3);
        assert_eq!(spenders[0].customer_id, "a");
    }

    #[test]
    fn test_empty_orders() {
        assert!(rfm_table(&[]).is_empty());
        assert_eq!(reference_date(&[]), None);
    }
}
