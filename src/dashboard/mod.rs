//! Dashboard assembly.
//!
//! [`build_dashboard`] is a pure function of the loaded [`Dataset`] and the
//! current [`DashboardParams`]: re-running it with a different date range is
//! all an interactive front end needs to do. Each section is built
//! independently, so a table that failed to load only fails its own
//! sections.

pub mod charts;

use crate::analysis::{
    aggregate, bottom_n, filter_by_range, group, monthly_orders, monthly_payment, reference_date,
    rfm_table, sort_rows_by, top_customers, top_n, total, Count, DateRange, MissingKeys, RfmColumn,
    SortOrder, SummaryRow,
};
use crate::config::Config;
use crate::data::{Dataset, Loaded};
use crate::error::DashboardError;
use crate::models::{
    CategoryRecord, CategoryRow, GeoRecord, MonthlyOrdersRow, MonthlyPaymentRow, OrderRecord,
    Party, RatingRow, ReviewRecord, RfmRow, StateRow,
};
use crate::report::format::format_brl;
use charts::{ChartPoint, ChartSpec, HIGHLIGHT, MUTED, STATE_HIGHLIGHT, STATE_MUTED};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, warn};

/// Inputs of one dashboard run besides the data itself.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardParams {
    /// First purchase day of the trend series; data minimum when unset.
    pub start: Option<NaiveDate>,
    /// Last purchase day of the trend series; data maximum when unset.
    pub end: Option<NaiveDate>,
    pub top_n: usize,
    pub missing_keys: MissingKeys,
    pub missing_label: String,
}

impl Default for DashboardParams {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for DashboardParams {
    fn from(config: &Config) -> Self {
        Self {
            start: None,
            end: None,
            top_n: config.analysis.top_n,
            missing_keys: config.analysis.missing_keys,
            missing_label: config.analysis.missing_label.clone(),
        }
    }
}

impl DashboardParams {
    pub fn with_range(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start = start;
        self.end = end;
        self
    }
}

/// Outcome of building one section.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Section<T> {
    Ready(T),
    Failed { reason: String },
}

impl<T> Section<T> {
    fn build<S>(source: &Loaded<S>, f: impl FnOnce(&[S]) -> T) -> Self {
        match source {
            Ok(records) => Section::Ready(f(records.as_slice())),
            Err(err) => Section::failed(err),
        }
    }

    fn failed(err: &DashboardError) -> Self {
        Section::Failed {
            reason: err.to_string(),
        }
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Section::Ready(t) => Some(t),
            Section::Failed { .. } => None,
        }
    }

    pub fn failure(&self) -> Option<&str> {
        match self {
            Section::Ready(_) => None,
            Section::Failed { reason } => Some(reason),
        }
    }
}

/// Category ranking by order items (sales or purchases).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySection {
    pub title: String,
    /// "Sales" or "Purchases".
    pub measure: String,
    pub total: u64,
    pub rows: Vec<CategoryRow>,
    pub top_chart: ChartSpec,
    pub bottom_chart: ChartSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RfmSection {
    /// Latest purchase of the table; recency counts days back from it.
    pub reference_date: Option<NaiveDateTime>,
    /// All customers, ordered by id.
    pub rows: Vec<RfmRow>,
    pub by_recency: Vec<RfmRow>,
    pub by_frequency: Vec<RfmRow>,
    pub by_monetary: Vec<RfmRow>,
    pub charts: Vec<ChartSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewSection {
    pub total: u64,
    pub rows: Vec<RatingRow>,
    pub chart: ChartSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyOrdersSection {
    pub range: Option<DateRange>,
    pub total_orders: u64,
    pub rows: Vec<MonthlyOrdersRow>,
    pub chart: ChartSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyPaymentSection {
    pub range: Option<DateRange>,
    pub total_payment: f64,
    /// `total_payment` as Brazilian Real.
    pub total_payment_display: String,
    pub rows: Vec<MonthlyPaymentRow>,
    pub chart: ChartSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeographySection {
    pub party: Party,
    pub total: u64,
    pub rows: Vec<StateRow>,
    pub state_chart: ChartSpec,
    pub location_chart: ChartSpec,
}

/// Number of sections in a [`Dashboard`].
pub const SECTION_COUNT: usize = 8;

/// Every section of the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    /// Date range the monthly series were filtered to.
    pub date_range: Option<DateRange>,
    pub product_sales: Section<CategorySection>,
    pub product_purchases: Section<CategorySection>,
    pub rfm: Section<RfmSection>,
    pub reviews: Section<ReviewSection>,
    pub monthly_orders: Section<MonthlyOrdersSection>,
    pub monthly_payment: Section<MonthlyPaymentSection>,
    pub customers: Section<GeographySection>,
    pub sellers: Section<GeographySection>,
}

impl Dashboard {
    /// Names and reasons of the sections that could not be built.
    pub fn failures(&self) -> Vec<(&'static str, &str)> {
        let sections: [(&'static str, Option<&str>); SECTION_COUNT] = [
            ("Product Sales", self.product_sales.failure()),
            ("Product Purchases", self.product_purchases.failure()),
            ("RFM Analysis", self.rfm.failure()),
            ("Review Scores", self.reviews.failure()),
            ("Monthly Orders", self.monthly_orders.failure()),
            ("Monthly Payment", self.monthly_payment.failure()),
            ("Customer Demographics", self.customers.failure()),
            ("Seller Demographics", self.sellers.failure()),
        ];
        sections
            .into_iter()
            .filter_map(|(name, reason)| reason.map(|r| (name, r)))
            .collect()
    }
}

/// Build every section from the dataset.
pub fn build_dashboard(dataset: &Dataset, params: &DashboardParams) -> Dashboard {
    let span = dataset
        .orders
        .as_ref()
        .ok()
        .and_then(|orders| DateRange::span_of(orders));
    let date_range = DateRange::resolve(params.start, params.end, span);
    if let Err(ref err) = date_range {
        warn!("Monthly series skipped: {}", err);
    }

    let (monthly_orders, monthly_payment) = match (&dataset.orders, &date_range) {
        (Err(err), _) | (_, Err(err)) => (Section::failed(err), Section::failed(err)),
        (Ok(orders), Ok(range)) => (
            Section::Ready(monthly_orders_section(orders, range.as_ref())),
            Section::Ready(monthly_payment_section(orders, range.as_ref())),
        ),
    };

    let dashboard = Dashboard {
        date_range: date_range.ok().flatten(),
        product_sales: Section::build(&dataset.product_sales, |records| {
            category_section(records, "Sales", params)
        }),
        product_purchases: Section::build(&dataset.product_purchases, |records| {
            category_section(records, "Purchases", params)
        }),
        rfm: Section::build(&dataset.payments, |orders| rfm_section(orders, params)),
        reviews: Section::build(&dataset.reviews, |reviews| review_section(reviews, params)),
        monthly_orders,
        monthly_payment,
        customers: Section::build(&dataset.customers, |records| {
            geography_section(records, Party::Customer, params)
        }),
        sellers: Section::build(&dataset.sellers, |records| {
            geography_section(records, Party::Seller, params)
        }),
    };

    debug!(
        "Dashboard built with {} failed section(s)",
        dashboard.failures().len()
    );
    dashboard
}

/// Rank categories by number of order items.
pub fn category_section(
    records: &[CategoryRecord],
    measure: &str,
    params: &DashboardParams,
) -> CategorySection {
    let ranked = aggregate(
        records,
        |r: &CategoryRecord| r.category.clone(),
        &Count,
        params.missing_keys,
        SortOrder::ValueDescending,
    );
    let label = |row: &SummaryRow<String, u64>| row.key.label(&params.missing_label);
    let bars = |rows: Vec<SummaryRow<String, u64>>| -> Vec<ChartPoint> {
        rows.iter()
            .map(|r| ChartPoint::new(label(r), r.value as f64))
            .collect()
    };

    let top_chart = ChartSpec::bar(
        format!("Product Categories with the Most {}", measure),
        bars(top_n(&ranked, params.top_n)),
    )
    .with_axes(measure, "Category")
    .highlight_first(HIGHLIGHT, MUTED);
    let bottom_chart = ChartSpec::bar(
        format!("Product Categories with the Fewest {}", measure),
        bars(bottom_n(&ranked, params.top_n)),
    )
    .with_axes(measure, "Category")
    .highlight_first(HIGHLIGHT, MUTED);

    CategorySection {
        title: format!("Product Category {}", measure),
        measure: measure.to_string(),
        total: total(&ranked),
        rows: ranked
            .iter()
            .map(|r| CategoryRow {
                category: label(r),
                total: r.value,
            })
            .collect(),
        top_chart,
        bottom_chart,
    }
}

/// RFM table plus the top customers per column.
pub fn rfm_section(orders: &[OrderRecord], params: &DashboardParams) -> RfmSection {
    let rows = rfm_table(orders);
    let by_recency = top_customers(&rows, RfmColumn::Recency, params.top_n);
    let by_frequency = top_customers(&rows, RfmColumn::Frequency, params.top_n);
    let by_monetary = top_customers(&rows, RfmColumn::Monetary, params.top_n);

    let chart = |title: &str, axis: &str, column: RfmColumn, top: &[RfmRow]| {
        ChartSpec::bar(
            format!("Top {} Customers by {}", params.top_n, title),
            top.iter()
                .map(|r| ChartPoint::new(r.customer_id.clone(), column.value(r)))
                .collect(),
        )
        .with_axes(axis, "Customer")
        .colored(HIGHLIGHT)
    };
    let charts = vec![
        chart("Recency", "Recency (Days)", RfmColumn::Recency, &by_recency),
        chart("Frequency", "Frequency", RfmColumn::Frequency, &by_frequency),
        chart("Monetary", "Monetary (R$)", RfmColumn::Monetary, &by_monetary),
    ];

    RfmSection {
        reference_date: reference_date(orders),
        rows,
        by_recency,
        by_frequency,
        by_monetary,
        charts,
    }
}

/// Review counts per rating, lowest rating first.
pub fn review_section(reviews: &[ReviewRecord], params: &DashboardParams) -> ReviewSection {
    let mut counts = group(
        reviews,
        |r: &ReviewRecord| r.score,
        &Count,
        params.missing_keys,
    );
    sort_rows_by(&mut counts, SortOrder::KeyAscending, |v| v);
    let all = total(&counts);

    let rows: Vec<RatingRow> = counts
        .iter()
        .map(|r| RatingRow {
            rating: r.key.value().copied(),
            total: r.value,
            share: share_percent(r.value, all),
        })
        .collect();

    let chart = ChartSpec::pie(
        "Review Score Distribution",
        rows.iter()
            .map(|r| ChartPoint::new(r.label(&params.missing_label), r.total as f64))
            .collect(),
    );

    ReviewSection {
        total: all,
        rows,
        chart,
    }
}

/// Monthly order counts within `range`.
pub fn monthly_orders_section(
    orders: &[OrderRecord],
    range: Option<&DateRange>,
) -> MonthlyOrdersSection {
    let filtered = filter_by_range(orders, range);
    let rows = monthly_orders(&filtered);
    let chart = ChartSpec::line(
        series_title("Monthly Orders", range),
        rows.iter()
            .map(|r| ChartPoint::new(r.month.to_string(), r.total_orders as f64))
            .collect(),
    )
    .with_axes("Month", "Total Orders");

    MonthlyOrdersSection {
        range: range.copied(),
        total_orders: rows.iter().map(|r| r.total_orders).sum(),
        rows,
        chart,
    }
}

/// Monthly payment totals within `range`.
pub fn monthly_payment_section(
    orders: &[OrderRecord],
    range: Option<&DateRange>,
) -> MonthlyPaymentSection {
    let filtered = filter_by_range(orders, range);
    let rows = monthly_payment(&filtered);
    let chart = ChartSpec::line(
        series_title("Monthly Payment", range),
        rows.iter()
            .map(|r| ChartPoint::new(r.month.to_string(), r.total_payment))
            .collect(),
    )
    .with_axes("Month", "Total Payment");
    let total_payment: f64 = rows.iter().map(|r| r.total_payment).sum();

    MonthlyPaymentSection {
        range: range.copied(),
        total_payment,
        total_payment_display: format_brl(total_payment),
        rows,
        chart,
    }
}

/// Entities per state plus their coordinates.
pub fn geography_section(
    records: &[GeoRecord],
    party: Party,
    params: &DashboardParams,
) -> GeographySection {
    let ranked = aggregate(
        records,
        |r: &GeoRecord| r.state.clone(),
        &Count,
        params.missing_keys,
        SortOrder::ValueDescending,
    );
    let rows: Vec<StateRow> = ranked
        .iter()
        .map(|r| StateRow {
            state: r.key.label(&params.missing_label),
            total: r.value,
        })
        .collect();

    let state_chart = ChartSpec::bar(
        format!("Total {} by State", party.plural()),
        rows.iter()
            .map(|r| ChartPoint::new(r.state.clone(), r.total as f64))
            .collect(),
    )
    .with_axes(format!("Total {}", party.plural()), "State")
    .highlight_first(STATE_HIGHLIGHT, STATE_MUTED);

    let coordinates = records
        .iter()
        .filter_map(|r| Some((r.longitude?, r.latitude?)))
        .collect();
    let location_chart = ChartSpec::scatter(format!("{} Geolocation", party), coordinates);

    GeographySection {
        party,
        total: total(&ranked),
        rows,
        state_chart,
        location_chart,
    }
}

fn series_title(name: &str, range: Option<&DateRange>) -> String {
    match range {
        Some(range) => format!("{} ({})", name, range),
        None => name.to_string(),
    }
}

fn share_percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 * 1000.0 / whole as f64).round() / 10.0
}
