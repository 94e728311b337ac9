//! Report generation.
//!
//! This module renders the year-over-year analysis as Markdown, JSON or CSV.

use crate::analysis::top_movers;
use crate::models::{CategoryTotals, ChangeRecord, ChangeSummary, Direction, Report, ReportMetadata, UndefinedChange};
use anyhow::{Context, Result};
use rust_decimal::Decimal;

/// Options controlling report rendering.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Decimals in displayed percentages.
    pub decimals: u32,
    /// Entries in the top movers tables.
    pub top_n: usize,
    /// Include the yearly totals section.
    pub include_totals: bool,
    /// Include the undefined changes section.
    pub include_undefined: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            decimals: 2,
            top_n: 5,
            include_totals: true,
            include_undefined: true,
        }
    }
}

impl From<&crate::config::ReportConfig> for RenderOptions {
    fn from(config: &crate::config::ReportConfig) -> Self {
        Self {
            decimals: config.decimals,
            top_n: config.top_n,
            include_totals: config.include_totals,
            include_undefined: config.include_undefined,
        }
    }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report, options: &RenderOptions) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# Year-over-Year Report\n\n");

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_summary_section(&report.summary));
    output.push_str(&generate_movers_section(&report.changes, options));
    output.push_str(&generate_changes_section(report, options));

    if options.include_undefined {
        output.push_str(&generate_undefined_section(&report.undefined));
    }

    if options.include_totals {
        output.push_str(&generate_totals_section(&report.totals));
    }

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Input:** {}\n", metadata.input));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if metadata.files_read > 0 {
        section.push_str(&format!("- **Files Read:** {}\n", metadata.files_read));
    }
    section.push_str(&format!("- **Records:** {}\n", metadata.records_loaded));
    section.push_str(&format!("- **Date Format:** `{}`\n", metadata.date_format));
    section.push_str(&format!("- **Duration:** {:.2}s\n", metadata.duration_seconds));
    section.push('\n');

    section
}

/// Generate the summary section.
fn generate_summary_section(summary: &ChangeSummary) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");

    if let (Some(first), Some(last)) = (summary.first_year, summary.last_year) {
        section.push_str(&format!(
            "{} categories with data from {} to {}.\n\n",
            summary.categories, first, last
        ));
    }

    section.push_str(&format!(
        "| {} Gainers | {} Losers | {} Flat | Undefined | **Total** |\n",
        Direction::Gainer.arrow(),
        Direction::Loser.arrow(),
        Direction::Flat.arrow(),
    ));
    section.push_str("|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} | **{}** |\n\n",
        summary.gainers, summary.losers, summary.flat, summary.undefined, summary.total
    ));

    section
}

/// Generate the top gainers and losers tables.
fn generate_movers_section(records: &[ChangeRecord], options: &RenderOptions) -> String {
    let gainers = top_movers(records, options.top_n, Direction::Gainer);
    let losers = top_movers(records, options.top_n, Direction::Loser);

    if gainers.is_empty() && losers.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Top Movers\n\n");

    for (title, movers) in [("Gainers", gainers), ("Losers", losers)] {
        if movers.is_empty() {
            continue;
        }

        section.push_str(&format!("### {}\n\n", title));
        section.push_str("| Category | Years | Change |\n");
        section.push_str("|:---|:---:|---:|\n");
        for record in movers {
            section.push_str(&format!(
                "| {} | {} | {} |\n",
                record.category,
                record.year_range(),
                record.percentage(options.decimals)
            ));
        }
        section.push('\n');
    }

    section
}

/// Generate the per-category changes section.
fn generate_changes_section(report: &Report, options: &RenderOptions) -> String {
    let mut section = String::new();

    section.push_str("## Changes by Category\n\n");

    if report.changes.is_empty() {
        section.push_str("No category has data for two or more years.\n\n");
        return section;
    }

    let mut current: Option<&str> = None;
    for record in &report.changes {
        if current != Some(record.category.as_str()) {
            if current.is_some() {
                section.push('\n');
            }
            current = Some(record.category.as_str());
            section.push_str(&format!("### {}\n\n", record.category));
            section.push_str("| Years | From | To | Change | Direction |\n");
            section.push_str("|:---:|---:|---:|---:|:---|\n");
        }

        section.push_str(&generate_change_row(report, record, options));
    }
    section.push('\n');

    section
}

/// Generate a single change table row.
fn generate_change_row(report: &Report, record: &ChangeRecord, options: &RenderOptions) -> String {
    format!(
        "| {} | {} | {} | {} | {} {} |\n",
        record.year_range(),
        display_total(report.total_for(&record.category, record.year_from)),
        display_total(report.total_for(&record.category, record.year_to)),
        record.percentage(options.decimals),
        record.direction.arrow(),
        record.direction
    )
}

fn display_total(total: Option<Decimal>) -> String {
    total.map(|t| t.normalize().to_string()).unwrap_or_else(|| "-".to_string())
}

/// Generate the undefined changes section.
fn generate_undefined_section(undefined: &[UndefinedChange]) -> String {
    if undefined.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Undefined Changes\n\n");
    section.push_str("These pairs have no percentage change (e.g. the earlier total is zero):\n\n");

    for item in undefined {
        section.push_str(&format!("- {}\n", item.reason));
    }
    section.push('\n');

    section
}

/// Generate the yearly totals section.
fn generate_totals_section(totals: &[CategoryTotals]) -> String {
    if totals.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Yearly Totals\n\n");
    section.push_str("| Category | Year | Total |\n");
    section.push_str("|:---|:---:|---:|\n");

    for category in totals {
        for year in &category.years {
            section.push_str(&format!(
                "| {} | {} | {} |\n",
                category.category,
                year.year,
                year.total.normalize()
            ));
        }
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!("*Report generated by yoyreport v{}*\n", env!("CARGO_PKG_VERSION")));

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Generate a CSV of the change records.
pub fn generate_csv_report(report: &Report, options: &RenderOptions) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(["category", "year_from", "year_to", "percent_change", "percentage", "direction"])?;

    for record in &report.changes {
        wtr.write_record([
            record.category.clone(),
            record.year_from.to_string(),
            record.year_to.to_string(),
            record.percent_change.normalize().to_string(),
            record.percentage(options.decimals),
            record.direction.to_string(),
        ])?;
    }

    let bytes = wtr.into_inner().context("Failed to finish CSV report")?;
    String::from_utf8(bytes).context("CSV report is not valid UTF-8")
}
