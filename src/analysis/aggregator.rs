//! Grouping and aggregation over in-memory tables.
//!
//! Every dashboard section is one pass of [`aggregate`] (or [`group`] for
//! composite metrics): records are grouped by a key, a [`Metric`] is folded
//! over each group and the resulting summary rows are ordered for display.

use serde::{Deserialize, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// What to do with records whose group key is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MissingKeys {
    /// Keep them as one extra group.
    #[default]
    Bucket,
    /// Leave them out of the summary.
    Drop,
}

/// Group key of a summary row.
///
/// `Missing` sorts after every present value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupKey<K> {
    Value(K),
    Missing,
}

impl<K: fmt::Display> GroupKey<K> {
    /// Display label, substituting `missing_label` for the missing bucket.
    pub fn label(&self, missing_label: &str) -> String {
        match self {
            GroupKey::Value(k) => k.to_string(),
            GroupKey::Missing => missing_label.to_string(),
        }
    }
}

impl<K> GroupKey<K> {
    pub fn value(&self) -> Option<&K> {
        match self {
            GroupKey::Value(k) => Some(k),
            GroupKey::Missing => None,
        }
    }
}

impl<K: Serialize> Serialize for GroupKey<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            GroupKey::Value(k) => k.serialize(serializer),
            GroupKey::Missing => serializer.serialize_none(),
        }
    }
}

/// One group and its computed metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow<K, V> {
    pub key: GroupKey<K>,
    pub value: V,
}

/// Row ordering applied after grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Largest metric first (rankings).
    ValueDescending,
    /// Smallest metric first.
    ValueAscending,
    /// By group key; chronological for month buckets.
    KeyAscending,
}

/// A fold over the records of one group.
pub trait Metric<R> {
    type Acc: Default;
    type Output;

    fn accumulate(&self, acc: &mut Self::Acc, record: &R);
    fn finish(&self, acc: Self::Acc) -> Self::Output;
}

/// Number of records in the group.
#[derive(Debug, Clone, Copy, Default)]
pub struct Count;

impl<R> Metric<R> for Count {
    type Acc = u64;
    type Output = u64;

    fn accumulate(&self, acc: &mut u64, _record: &R) {
        *acc += 1;
    }

    fn finish(&self, acc: u64) -> u64 {
        acc
    }
}

/// Number of distinct values of a field within the group.
#[derive(Debug, Clone, Copy)]
pub struct CountDistinct<F>(pub F);

impl<R, F, V> Metric<R> for CountDistinct<F>
where
    F: Fn(&R) -> V,
    V: Ord,
{
    type Acc = BTreeSet<V>;
    type Output = u64;

    fn accumulate(&self, acc: &mut BTreeSet<V>, record: &R) {
        acc.insert((self.0)(record));
    }

    fn finish(&self, acc: BTreeSet<V>) -> u64 {
        acc.len() as u64
    }
}

/// Sum of a numeric field within the group.
#[derive(Debug, Clone, Copy)]
pub struct Sum<F>(pub F);

impl<R, F> Metric<R> for Sum<F>
where
    F: Fn(&R) -> f64,
{
    type Acc = f64;
    type Output = f64;

    fn accumulate(&self, acc: &mut f64, record: &R) {
        *acc += (self.0)(record);
    }

    fn finish(&self, acc: f64) -> f64 {
        acc
    }
}

/// Group records by key and fold `metric` over each group.
///
/// Rows come back in key order, missing bucket last.
pub fn group<'a, R, K, M, I, F>(
    records: I,
    key: F,
    metric: &M,
    missing: MissingKeys,
) -> Vec<SummaryRow<K, M::Output>>
where
    R: 'a,
    I: IntoIterator<Item = &'a R>,
    F: Fn(&R) -> Option<K>,
    K: Ord,
    M: Metric<R>,
{
    let mut groups: BTreeMap<GroupKey<K>, M::Acc> = BTreeMap::new();

    for record in records {
        let group_key = match key(record) {
            Some(k) => GroupKey::Value(k),
            None if missing == MissingKeys::Bucket => GroupKey::Missing,
            None => continue,
        };
        metric.accumulate(groups.entry(group_key).or_default(), record);
    }

    groups
        .into_iter()
        .map(|(key, acc)| SummaryRow {
            key,
            value: metric.finish(acc),
        })
        .collect()
}

/// Group, aggregate and order in one call.
pub fn aggregate<'a, R, K, M, I, F>(
    records: I,
    key: F,
    metric: &M,
    missing: MissingKeys,
    order: SortOrder,
) -> Vec<SummaryRow<K, M::Output>>
where
    R: 'a,
    I: IntoIterator<Item = &'a R>,
    F: Fn(&R) -> Option<K>,
    K: Ord,
    M: Metric<R>,
    M::Output: PartialOrd,
{
    let mut rows = group(records, key, metric, missing);
    sort_rows_by(&mut rows, order, |v| v);
    rows
}

/// Order rows by a metric projection or by key.
///
/// The sort is stable, so rows with equal metrics keep their incoming order;
/// rows straight from [`group`] therefore tie-break by key.
pub fn sort_rows_by<K, V, S, P>(rows: &mut [SummaryRow<K, V>], order: SortOrder, project: P)
where
    K: Ord,
    S: PartialOrd,
    P: Fn(&V) -> &S,
{
    match order {
        SortOrder::KeyAscending => rows.sort_by(|a, b| a.key.cmp(&b.key)),
        SortOrder::ValueAscending => rows.sort_by(|a, b| {
            project(&a.value)
                .partial_cmp(project(&b.value))
                .unwrap_or(Ordering::Equal)
        }),
        SortOrder::ValueDescending => rows.sort_by(|a, b| {
            project(&b.value)
                .partial_cmp(project(&a.value))
                .unwrap_or(Ordering::Equal)
        }),
    }
}

/// First `n` rows of an already ordered sequence.
pub fn top_n<T: Clone>(rows: &[T], n: usize) -> Vec<T> {
    rows.iter().take(n).cloned().collect()
}

/// Last `n` rows of a descending sequence, re-sorted low to high.
pub fn bottom_n<K, V>(rows: &[SummaryRow<K, V>], n: usize) -> Vec<SummaryRow<K, V>>
where
    K: Ord + Clone,
    V: PartialOrd + Clone,
{
    let start = rows.len().saturating_sub(n);
    let mut tail = rows[start..].to_vec();
    sort_rows_by(&mut tail, SortOrder::ValueAscending, |v| v);
    tail
}

/// Sum of all row values; `0` for no rows.
pub fn total<K, V>(rows: &[SummaryRow<K, V>]) -> V
where
    V: Copy + std::iter::Sum<V>,
{
    rows.iter().map(|r| r.value).sum()
}
