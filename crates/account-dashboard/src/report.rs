//! Plain-text rendering of one dashboard pass.

use std::fmt::Write;

use dashboard_core::criteria::Metric;
use dashboard_core::formatting::{format_count, format_growth};
use dashboard_data::aggregator::{AggregateResult, CategoryCount};
use dashboard_data::analysis::{FilterOptions, SnapshotMetadata};

const LABEL_WIDTH: usize = 28;

fn metric_name(metric: Metric) -> &'static str {
    match metric {
        Metric::Accounts => "Accounts",
        Metric::Credentials => "Credentials",
    }
}

fn heading(out: &mut String, title: &str) {
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "{}", "─".repeat(title.chars().count()));
}

fn row(out: &mut String, label: &str, value: &str) {
    let _ = writeln!(out, "  {:<width$} {:>12}", label, value, width = LABEL_WIDTH);
}

fn distribution(out: &mut String, title: &str, counts: &[CategoryCount]) {
    heading(out, title);
    if counts.is_empty() {
        let _ = writeln!(out, "  (no records)");
        return;
    }
    for entry in counts {
        row(out, entry.category.label(), &format_count(entry.count));
    }
}

/// Render the full text report.
pub fn render_text(result: &AggregateResult, metadata: &SnapshotMetadata) -> String {
    let mut out = String::new();
    let metric = metric_name(result.metric);

    let _ = writeln!(
        out,
        "Account dashboard: {} of {} records selected (loaded {})",
        format_count(result.kpis.record_count),
        format_count(metadata.records_loaded as u64),
        metadata.loaded_at
    );
    if metadata.unparsed_dates > 0 {
        let _ = writeln!(
            out,
            "{} records have an unparsable creation date",
            format_count(metadata.unparsed_dates as u64)
        );
    }

    heading(&mut out, "Key figures");
    row(&mut out, "Distinct accounts", &format_count(result.kpis.distinct_accounts));
    row(&mut out, "Organizations", &format_count(result.kpis.distinct_organizations));
    row(&mut out, "Providers", &format_count(result.kpis.distinct_providers));
    row(&mut out, "Credentials", &format_count(result.kpis.total_credentials));

    heading(
        &mut out,
        &format!("Top {} organizations by {}", result.top_n, metric.to_lowercase()),
    );
    if result.top_organizations.is_empty() {
        let _ = writeln!(out, "  (no records)");
    }
    for (rank, entry) in result.top_organizations.iter().enumerate() {
        let label = format!("{:>2}. {}", rank + 1, entry.category.label());
        row(&mut out, &label, &format_count(entry.value));
    }

    distribution(&mut out, "Customer types", &result.customer_types);
    distribution(&mut out, "Account statuses", &result.account_statuses);
    distribution(&mut out, "Customer categories", &result.customer_categories);
    distribution(&mut out, "Providers", &result.providers);

    heading(&mut out, "Accounts created per month");
    if result.monthly_trend.is_empty() {
        let _ = writeln!(out, "  (no dated records)");
    }
    for point in &result.monthly_trend {
        row(&mut out, &point.label, &format_count(point.count));
    }

    heading(&mut out, &format!("{} growth", metric));
    let growth = &result.growth;
    match (growth.current_period, growth.previous_period) {
        (Some(current), Some(previous)) => {
            row(&mut out, &current.label(), &format_count(growth.current_value));
            row(&mut out, &previous.label(), &format_count(growth.previous_value));
            row(&mut out, "Month over month", &format_growth(growth.growth_pct));
        }
        _ => {
            let _ = writeln!(out, "  (no dated records)");
        }
    }

    out
}

/// Render the selectable values of every filter dimension.
pub fn render_options(options: &FilterOptions) -> String {
    let mut out = String::new();
    let sections = [
        ("Organizations", &options.organizations),
        ("Providers", &options.providers),
        ("Customer types", &options.customer_types),
        ("Customer categories", &options.customer_categories),
    ];
    for (title, values) in sections {
        heading(&mut out, title);
        for value in values.iter() {
            let _ = writeln!(out, "  {}", value.label());
        }
    }
    out
}

// ── Tests ──────────────────────────────────────────────────────────────────────
