//! Markdown report generation.
//!
//! This module renders a [`Report`] as a single Markdown document: metadata,
//! table of contents, then one section per dashboard section with its total,
//! summary table and text charts.

use super::format::{cell, format_brl, text_bars, truncate};
use super::{Report, ReportMetadata};
use crate::analysis::MissingKeys;
use crate::config::ReportConfig;
use crate::dashboard::charts::ChartSpec;
use crate::dashboard::{
    CategorySection, GeographySection, MonthlyOrdersSection, MonthlyPaymentSection,
    ReviewSection, RfmSection, Section,
};
use crate::models::RfmRow;
use anyhow::Result;

/// Section headings with their anchors, in document order.
const SECTIONS: [(&str, &str); 8] = [
    ("Product Sales", "product-sales"),
    ("Product Purchases", "product-purchases"),
    ("RFM Analysis", "rfm-analysis"),
    ("Review Scores", "review-scores"),
    ("Monthly Orders", "monthly-orders"),
    ("Monthly Payment", "monthly-payment"),
    ("Customer Demographics", "customer-demographics"),
    ("Seller Demographics", "seller-demographics"),
];

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report, config: &ReportConfig) -> String {
    let mut output = String::new();
    let dashboard = &report.dashboard;

    // Title
    output.push_str("# Olist E-Commerce Dashboard\n\n");

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_table_of_contents());

    let [sales, purchases, rfm, reviews, orders, payment, customers, sellers] = SECTIONS;

    output.push_str(&render(sales.0, &dashboard.product_sales, |s| {
        category_body(s, config)
    }));
    output.push_str(&render(purchases.0, &dashboard.product_purchases, |s| {
        category_body(s, config)
    }));
    output.push_str(&render(rfm.0, &dashboard.rfm, |s| rfm_body(s, config)));
    output.push_str(&render(reviews.0, &dashboard.reviews, |s| {
        review_body(s, config)
    }));
    output.push_str(&render(orders.0, &dashboard.monthly_orders, |s| {
        monthly_orders_body(s, config)
    }));
    output.push_str(&render(payment.0, &dashboard.monthly_payment, |s| {
        monthly_payment_body(s, config)
    }));
    output.push_str(&render(customers.0, &dashboard.customers, |s| {
        geography_body(s, config)
    }));
    output.push_str(&render(sellers.0, &dashboard.sellers, |s| {
        geography_body(s, config)
    }));

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Data Directory:** `{}`\n", metadata.data_dir));
    match metadata.date_range {
        Some(ref range) => section.push_str(&format!("- **Date Range:** {}\n", range)),
        None => section.push_str("- **Date Range:** n/a\n"),
    }
    section.push_str(&format!(
        "- **Tables Loaded:** {}/{}\n",
        metadata.tables_loaded, metadata.tables_total
    ));
    section.push_str(&format!("- **Top N:** {}\n", metadata.top_n));
    let missing = match metadata.missing_keys {
        MissingKeys::Bucket => "bucketed",
        MissingKeys::Drop => "dropped",
    };
    section.push_str(&format!("- **Missing Keys:** {}\n", missing));
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the table of contents.
fn generate_table_of_contents() -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    for (title, anchor) in SECTIONS {
        toc.push_str(&format!("- [{}](#{})\n", title, anchor));
    }
    toc.push('\n');

    toc
}

/// Heading plus either the body or the failure reason.
fn render<T>(title: &str, section: &Section<T>, body: impl FnOnce(&T) -> String) -> String {
    let mut out = format!("## {}\n\n", title);
    match section.ready() {
        Some(data) => out.push_str(&body(data)),
        None => out.push_str(&format!(
            "> ⚠️ **Section unavailable:** {}\n\n",
            section.failure().unwrap_or_default()
        )),
    }
    out
}

fn chart_block(chart: &ChartSpec, config: &ReportConfig) -> String {
    if !config.include_charts || chart.is_empty() {
        return String::new();
    }
    format!(
        "**{}**\n\n{}",
        chart.title,
        text_bars(&chart.points, config.chart_width)
    )
}

fn category_body(section: &CategorySection, config: &ReportConfig) -> String {
    let mut body = format!(
        "**Total {}:** {}\n\n",
        section.measure, section.total
    );

    if section.rows.is_empty() {
        body.push_str("No order items in the data.\n\n");
        return body;
    }

    body.push_str(&chart_block(&section.top_chart, config));
    body.push_str(&chart_block(&section.bottom_chart, config));

    body.push_str(&format!("| Category | {} |\n", section.measure));
    body.push_str("|:---|---:|\n");
    let (rows, note) = truncate(&section.rows, config.max_table_rows);
    for row in rows {
        body.push_str(&format!("| {} | {} |\n", cell(&row.category), row.total));
    }
    body.push('\n');
    if let Some(note) = note {
        body.push_str(&note);
    }

    body
}

fn rfm_table(rows: &[RfmRow]) -> String {
    let mut table = String::new();
    table.push_str("| Customer | Recency (days) | Frequency | Monetary |\n");
    table.push_str("|:---|---:|---:|---:|\n");
    for row in rows {
        table.push_str(&format!(
            "| `{}` | {} | {} | {} |\n",
            row.customer_id,
            row.recency,
            row.frequency,
            format_brl(row.monetary)
        ));
    }
    table.push('\n');
    table
}

fn rfm_body(section: &RfmSection, config: &ReportConfig) -> String {
    let mut body = String::new();

    match section.reference_date {
        Some(date) => body.push_str(&format!(
            "**Customers:** {} (recency measured from {})\n\n",
            section.rows.len(),
            date.format("%Y-%m-%d %H:%M:%S")
        )),
        None => {
            body.push_str("No orders in the data.\n\n");
            return body;
        }
    }

    let tops = [
        ("Best Recency", &section.by_recency),
        ("Highest Frequency", &section.by_frequency),
        ("Highest Monetary", &section.by_monetary),
    ];
    for (i, (heading, rows)) in tops.iter().enumerate() {
        body.push_str(&format!("### {}\n\n", heading));
        if let Some(chart) = section.charts.get(i) {
            body.push_str(&chart_block(chart, config));
        }
        body.push_str(&rfm_table(rows));
    }

    body.push_str("### All Customers\n\n");
    let (rows, note) = truncate(&section.rows, config.max_table_rows);
    body.push_str(&rfm_table(rows));
    if let Some(note) = note {
        body.push_str(&note);
    }

    body
}

fn review_body(section: &ReviewSection, config: &ReportConfig) -> String {
    let mut body = format!("**Total Reviews:** {}\n\n", section.total);

    if section.rows.is_empty() {
        body.push_str("No reviews in the data.\n\n");
        return body;
    }

    body.push_str(&chart_block(&section.chart, config));

    body.push_str("| Rating | Reviews | Share |\n");
    body.push_str("|:---:|---:|---:|\n");
    for (row, point) in section.rows.iter().zip(&section.chart.points) {
        body.push_str(&format!(
            "| {} | {} | {:.1}% |\n",
            cell(&point.label),
            row.total,
            row.share
        ));
    }
    body.push('\n');

    body
}

fn monthly_orders_body(section: &MonthlyOrdersSection, config: &ReportConfig) -> String {
    let mut body = format!("**Total Orders:** {}\n\n", section.total_orders);

    if section.rows.is_empty() {
        body.push_str("No orders in the selected range.\n\n");
        return body;
    }

    body.push_str(&chart_block(&section.chart, config));

    body.push_str("| Month | Orders |\n");
    body.push_str("|:---|---:|\n");
    let (rows, note) = truncate(&section.rows, config.max_table_rows);
    for row in rows {
        body.push_str(&format!("| {} | {} |\n", row.month, row.total_orders));
    }
    body.push('\n');
    if let Some(note) = note {
        body.push_str(&note);
    }

    body
}

fn monthly_payment_body(section: &MonthlyPaymentSection, config: &ReportConfig) -> String {
    let mut body = format!(
        "**Total Payment:** {}\n\n",
        section.total_payment_display
    );

    if section.rows.is_empty() {
        body.push_str("No payments in the selected range.\n\n");
        return body;
    }

    body.push_str(&chart_block(&section.chart, config));

    body.push_str("| Month | Payment |\n");
    body.push_str("|:---|---:|\n");
    let (rows, note) = truncate(&section.rows, config.max_table_rows);
    for row in rows {
        body.push_str(&format!(
            "| {} | {} |\n",
            row.month,
            format_brl(row.total_payment)
        ));
    }
    body.push('\n');
    if let Some(note) = note {
        body.push_str(&note);
    }

    body
}

fn geography_body(section: &GeographySection, config: &ReportConfig) -> String {
    let plural = section.party.plural();
    let mut body = format!("**Total {}:** {}\n\n", plural, section.total);

    if section.rows.is_empty() {
        body.push_str(&format!("No {} in the data.\n\n", plural.to_lowercase()));
        return body;
    }

    body.push_str(&chart_block(&section.state_chart, config));

    body.push_str(&format!("| State | {} |\n", plural));
    body.push_str("|:---|---:|\n");
    let (rows, note) = truncate(&section.rows, config.max_table_rows);
    for row in rows {
        body.push_str(&format!("| {} | {} |\n", cell(&row.state), row.total));
    }
    body.push('\n');
    if let Some(note) = note {
        body.push_str(&note);
    }

    body.push_str(&format!(
        "*{}: {} located {} (scatter data in the JSON output).*\n\n",
        section.location_chart.title,
        section.location_chart.coordinates.len(),
        plural.to_lowercase()
    ));

    body
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Dashboard generated by olistdash v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::{build_dashboard, DashboardParams};
    use crate::data::Dataset;
    use crate::error::DashboardError;
    use crate::models::{CategoryRecord, OrderRecord, ReviewRecord};
    use chrono::{NaiveDateTime, Utc};
    use std::path::PathBuf;

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

    fn missing(name: &str) -> DashboardError {
        DashboardError::Io {
            path: PathBuf::from("data").join(name),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "No such file"),
        }
    }

    fn create_test_report() -> Report {
        let orders = vec![
            order("o1", "c1", "2017-01-05 10:00:00", 1200.5),
            order("o2", "c2", "2017-03-20 12:30:00", 80.0),
        ];
        let categories: Vec<CategoryRecord> = ["toys", "toys", "art"]
            .iter()
            .map(|c| CategoryRecord {
                order_id: None,
                product_id: None,
                category: Some(c.to_string()),
            })
            .collect();
        let dataset = Dataset {
            customers: Err(missing("customer_geolocation.csv")),
            sellers: Ok(Vec::new()),
            orders: Ok(orders.clone()),
            product_sales: Ok(categories),
            product_purchases: Ok(Vec::new()),
            payments: Ok(orders),
            reviews: Ok(vec![ReviewRecord {
                order_id: None,
                score: Some(4),
            }]),
        };
        let params = DashboardParams::default();
        let dashboard = build_dashboard(&dataset, &params);

        Report {
            metadata: ReportMetadata {
                generated_at: Utc::now(),
                data_dir: "data".to_string(),
                date_range: dashboard.date_range,
                top_n: params.top_n,
                missing_keys: params.missing_keys,
                tables_loaded: 6,
                tables_total: 7,
                duration_seconds: 0.4,
            },
            dashboard,
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report, &ReportConfig::default());

        assert!(markdown.contains("# Olist E-Commerce Dashboard"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("## Table of Contents"));
        for (title, _) in SECTIONS {
            assert!(markdown.contains(&format!("## {}", title)), "{}", title);
        }
        assert!(markdown.contains("**Total Sales:** 3"));
        assert!(markdown.contains("| toys | 2 |"));
        assert!(markdown.contains("**Total Payment:** R$\u{a0}1.280,50"));
        assert!(markdown.contains("**Date Range:** 2017-01-05 to 2017-03-20"));
    }

    #[test]
    fn test_failed_section_shows_reason() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report, &ReportConfig::default());
        assert!(markdown.contains("**Section unavailable:** cannot read"));
        assert!(markdown.contains("customer_geolocation.csv"));
    }

    #[test]
    fn test_empty_sections_render_notice() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report, &ReportConfig::default());
        assert!(markdown.contains("**Total Purchases:** 0"));
        assert!(markdown.contains("No sellers in the data."));
    }

    #[test]
    fn test_charts_can_be_disabled() {
        let report = create_test_report();
        let with = generate_markdown_report(&report, &ReportConfig::default());
        assert!(with.contains("```text"));

        let config = ReportConfig {
            include_charts: false,
            ..ReportConfig::default()
        };
        let without = generate_markdown_report(&report, &config);
        assert!(!without.contains("```text"));
    }

    #[test]
    fn test_table_truncation() {
        let report = create_test_report();
        let config = ReportConfig {
            max_table_rows: 1,
            ..ReportConfig::default()
        };
        let markdown = generate_markdown_report(&report, &config);
        assert!(markdown.contains("more rows not shown"));
    }

    #[test]
    fn test_generate_metadata_section() {
        let report = create_test_report();
        let section = generate_metadata_section(&report.metadata);

        assert!(section.contains("`data`"));
        assert!(section.contains("6/7"));
        assert!(section.contains("bucketed"));
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report();
        let json = generate_json_report(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["dashboard"]["product_sales"]["status"], "ready");
        assert_eq!(value["dashboard"]["product_sales"]["total"], 3);
        assert_eq!(value["dashboard"]["customers"]["status"], "failed");
        assert_eq!(value["metadata"]["missing_keys"], "bucket");
    }
}
