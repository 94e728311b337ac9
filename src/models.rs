//! Data models for the year-over-year report.
//!
//! This module contains the core data structures used throughout
//! the application for representing transactions, changes, and reports.

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single transaction record as handed over by the loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Label partitioning transactions into aggregation groups.
    pub category: String,
    /// Calendar date, parsed by the aggregator (default format `%Y-%m-%d`).
    pub date: String,
    /// Transaction value.
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub value: Decimal,
}

impl Transaction {
    /// Creates a new transaction.
    pub fn new(category: impl Into<String>, date: impl Into<String>, value: Decimal) -> Self {
        Self {
            category: category.into(),
            date: date.into(),
            value,
        }
    }
}

/// Classification of a year-over-year change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Positive change.
    Gainer,
    /// Negative change.
    Loser,
    /// Exactly zero change.
    Flat,
}

impl Direction {
    /// Classifies a percentage change.
    pub fn classify(percent_change: Decimal) -> Self {
        if percent_change > Decimal::ZERO {
            Direction::Gainer
        } else if percent_change < Decimal::ZERO {
            Direction::Loser
        } else {
            Direction::Flat
        }
    }

    /// Returns an arrow representation of the direction.
    pub fn arrow(&self) -> &'static str {
        match self {
            Direction::Gainer => "▲",
            Direction::Loser => "▼",
            Direction::Flat => "▬",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Gainer => write!(f, "gainer"),
            Direction::Loser => write!(f, "loser"),
            Direction::Flat => write!(f, "flat"),
        }
    }
}

/// Order in which categories appear in the analysis output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CategoryOrder {
    /// Order of first appearance in the input (default)
    #[default]
    FirstSeen,
    /// Lexical order of category names
    Lexical,
}

/// Year-over-year change for one category between two consecutive years with data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Category the change belongs to.
    pub category: String,
    /// Earlier year of the pair.
    pub year_from: i32,
    /// Later year of the pair.
    pub year_to: i32,
    /// Percentage change from `year_from` to `year_to`.
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub percent_change: Decimal,
    /// Classification derived from `percent_change`.
    pub direction: Direction,
}

impl ChangeRecord {
    /// Creates a change record, classifying the direction from the percentage.
    pub fn new(category: impl Into<String>, year_from: i32, year_to: i32, percent_change: Decimal) -> Self {
        Self {
            category: category.into(),
            year_from,
            year_to,
            percent_change,
            direction: Direction::classify(percent_change),
        }
    }

    /// Display string for the percentage, e.g. `"30.00%"`.
    pub fn percentage(&self, decimals: u32) -> String {
        format_percent(self.percent_change, decimals)
    }

    /// Returns the year range as a formatted string.
    pub fn year_range(&self) -> String {
        format!("{}→{}", self.year_from, self.year_to)
    }
}

/// Formats a percentage with a fixed number of decimals, rounding half away from zero.
pub fn format_percent(value: Decimal, decimals: u32) -> String {
    let rounded = value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.prec$}%", rounded, prec = decimals as usize)
}

/// A pair whose percentage change could not be computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UndefinedChange {
    /// Category of the pair.
    pub category: String,
    /// Earlier year of the pair.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_from: Option<i32>,
    /// Later year of the pair.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_to: Option<i32>,
    /// Why the change is undefined.
    pub reason: String,
}

/// Summed value for one year of one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearTotal {
    pub year: i32,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub total: Decimal,
}

/// All yearly totals of one category, years ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotals {
    pub category: String,
    pub years: Vec<YearTotal>,
}

/// Summary of the analysis outcomes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSummary {
    /// Number of computed changes.
    pub total: usize,
    /// Number of positive changes.
    pub gainers: usize,
    /// Number of negative changes.
    pub losers: usize,
    /// Number of zero changes.
    pub flat: usize,
    /// Number of pairs that could not be computed.
    pub undefined: usize,
    /// Number of distinct categories in the totals.
    pub categories: usize,
    /// Earliest year with data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_year: Option<i32>,
    /// Latest year with data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_year: Option<i32>,
}

impl ChangeSummary {
    /// Creates a summary from computed records and undefined pairs.
    pub fn from_changes(records: &[ChangeRecord], undefined: &[UndefinedChange]) -> Self {
        let mut summary = Self {
            total: records.len(),
            undefined: undefined.len(),
            ..Self::default()
        };

        for record in records {
            match record.direction {
                Direction::Gainer => summary.gainers += 1,
                Direction::Loser => summary.losers += 1,
                Direction::Flat => summary.flat += 1,
            }
        }

        summary
    }

    /// Fills in category count and year span from the totals.
    pub fn with_totals(mut self, totals: &[CategoryTotals]) -> Self {
        self.categories = totals.len();
        let years = totals.iter().flat_map(|c| c.years.iter().map(|y| y.year));
        self.first_year = years.clone().min();
        self.last_year = years.max();
        self
    }
}

/// Metadata about the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Path of the analyzed input.
    pub input: String,
    /// Date and time the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Number of transaction records loaded.
    pub records_loaded: usize,
    /// Number of input files read.
    pub files_read: usize,
    /// Date format used for year extraction.
    pub date_format: String,
    /// Duration of the run in seconds.
    pub duration_seconds: f64,
}

/// The complete year-over-year report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Metadata about the report.
    pub metadata: ReportMetadata,
    /// Summary statistics.
    pub summary: ChangeSummary,
    /// Computed changes, grouped by category, years ascending.
    pub changes: Vec<ChangeRecord>,
    /// Pairs whose change is undefined.
    pub undefined: Vec<UndefinedChange>,
    /// Yearly totals per category.
    pub totals: Vec<CategoryTotals>,
}

impl Report {
    /// Looks up the total of a category in a given year.
    pub fn total_for(&self, category: &str, year: i32) -> Option<Decimal> {
        self.totals
            .iter()
            .find(|c| c.category == category)
            .and_then(|c| c.years.iter().find(|y| y.year == year))
            .map(|y| y.total)
    }
}
