//! Synthetic transaction data for trying out the report.
//!
//! Generates records with a random category, a random date within a year
//! range and a random integer value, and writes them as CSV or JSON.

use crate::loader::InputFormat;
use crate::models::Transaction;
use anyhow::{bail, Context, Result};
use chrono::{Days, NaiveDate};
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Options for data generation.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Categories to draw from.
    pub categories: Vec<String>,
    /// First year of the date range (inclusive).
    pub start_year: i32,
    /// Last year of the date range (inclusive).
    pub end_year: i32,
    /// Smallest value (inclusive).
    pub min_value: i64,
    /// Largest value (exclusive).
    pub max_value: i64,
    /// Seed for reproducible output.
    pub seed: Option<u64>,
    /// Whether to show progress.
    pub show_progress: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            categories: vec![
                "Revenue".to_string(),
                "Balances".to_string(),
                "Outstanding".to_string(),
                "Limits".to_string(),
            ],
            start_year: 2010,
            end_year: 2024,
            min_value: 100_000,
            max_value: 5_100_000,
            seed: None,
            show_progress: true,
        }
    }
}

impl From<&crate::config::GeneratorConfig> for GenerateOptions {
    fn from(config: &crate::config::GeneratorConfig) -> Self {
        Self {
            categories: config.categories.clone(),
            start_year: config.start_year,
            end_year: config.end_year,
            min_value: config.min_value,
            max_value: config.max_value,
            seed: config.seed,
            show_progress: true,
        }
    }
}

/// Random transaction source.
pub struct TransactionGenerator {
    options: GenerateOptions,
    rng: StdRng,
    start: NaiveDate,
    span_days: u64,
}

impl TransactionGenerator {
    /// Create a generator, validating the options.
    pub fn new(options: GenerateOptions) -> Result<Self> {
        if options.categories.is_empty() {
            bail!("At least one category is required");
        }
        if options.categories.iter().any(|c| c.trim().is_empty()) {
            bail!("Categories must not be empty");
        }
        if options.min_value >= options.max_value {
            bail!(
                "min_value ({}) must be less than max_value ({})",
                options.min_value,
                options.max_value
            );
        }

        let start = NaiveDate::from_ymd_opt(options.start_year, 1, 1)
            .with_context(|| format!("Invalid start year {}", options.start_year))?;
        let end = NaiveDate::from_ymd_opt(options.end_year, 12, 31)
            .with_context(|| format!("Invalid end year {}", options.end_year))?;
        if end < start {
            bail!(
                "start_year ({}) must not be after end_year ({})",
                options.start_year,
                options.end_year
            );
        }

        let span_days = (end - start).num_days() as u64;
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            options,
            rng,
            start,
            span_days,
        })
    }

    /// Generate one random transaction.
    pub fn next_transaction(&mut self) -> Transaction {
        let index = self.rng.gen_range(0..self.options.categories.len());
        let category = self.options.categories[index].clone();
        let offset = self.rng.gen_range(0..=self.span_days);
        let date = self
            .start
            .checked_add_days(Days::new(offset))
            .unwrap_or(self.start);
        let value = self.rng.gen_range(self.options.min_value..self.options.max_value);

        Transaction::new(
            category,
            date.format("%Y-%m-%d").to_string(),
            Decimal::from(value),
        )
    }

    /// Generate `count` transactions in memory.
    pub fn generate(&mut self, count: usize) -> Vec<Transaction> {
        (0..count).map(|_| self.next_transaction()).collect()
    }

    /// Write `count` transactions to `path`, format chosen by extension.
    pub fn write_to(&mut self, path: &Path, count: usize) -> Result<()> {
        let format = InputFormat::from_path(path).with_context(|| {
            format!("Cannot infer output format from {} (use .csv or .json)", path.display())
        })?;

        let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        let writer = BufWriter::new(file);

        info!("Generating {} transactions into {}", count, path.display());

        let progress = self.progress_bar(count);
        match format {
            InputFormat::Csv => self.write_csv(writer, count, &progress)?,
            InputFormat::Json => self.write_json(writer, count, &progress)?,
        }
        if let Some(pb) = progress {
            pb.finish_with_message("Generation complete");
        }

        Ok(())
    }

    /// Write CSV with a `category,date,value` header.
    pub fn write_csv<W: Write>(&mut self, writer: W, count: usize, progress: &Option<ProgressBar>) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(["category", "date", "value"])?;

        for _ in 0..count {
            let tx = self.next_transaction();
            let value = tx.value.to_string();
            wtr.write_record([tx.category.as_str(), tx.date.as_str(), value.as_str()])?;
            if let Some(pb) = progress {
                pb.inc(1);
            }
        }

        wtr.flush().context("Failed to flush CSV output")?;
        Ok(())
    }

    /// Write a JSON array, one record at a time.
    pub fn write_json<W: Write>(&mut self, mut writer: W, count: usize, progress: &Option<ProgressBar>) -> Result<()> {
        writer.write_all(b"[")?;

        for i in 0..count {
            if i > 0 {
                writer.write_all(b",")?;
            }
            let tx = self.next_transaction();
            serde_json::to_writer(&mut writer, &tx)?;
            if let Some(pb) = progress {
                pb.inc(1);
            }
        }

        writer.write_all(b"]")?;
        writer.flush().context("Failed to flush JSON output")?;
        Ok(())
    }

    fn progress_bar(&self, count: usize) -> Option<ProgressBar> {
        if !self.options.show_progress {
            return None;
        }

        let pb = ProgressBar::new(count as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        Some(pb)
    }
}
