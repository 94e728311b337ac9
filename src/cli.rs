//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::CategoryOrder;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// YoyReport - year-over-year gainers and losers from transaction ledgers
///
/// Sums transactions per category and calendar year, then reports the
/// percentage change between consecutive years. Markdown/JSON/CSV reports.
///
/// Examples:
///   yoyreport --input transactions.csv
///   yoyreport --input ledgers/ --format json --output report.json
///   yoyreport --input transactions.json --order lexical --shards 8
///   yoyreport --generate 1000000 --output transactions.csv --seed 42
///   yoyreport --sample 10000 --output -
///   yoyreport --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Transaction file (.csv/.json) or directory of such files
    #[arg(
        short,
        long,
        value_name = "PATH",
        required_unless_present_any = ["init_config", "generate", "sample"]
    )]
    pub input: Option<PathBuf>,

    /// Output file path ("-" for stdout)
    ///
    /// For --generate this is the data file to write; its extension
    /// (.csv or .json) selects the format.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json, csv)
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .yoyreport.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// chrono format of transaction dates
    ///
    /// Example: --date-format "%d/%m/%Y". RFC 3339 timestamps are always accepted.
    #[arg(long, value_name = "FMT", env = "YOYREPORT_DATE_FORMAT")]
    pub date_format: Option<String>,

    /// Category order in the report
    #[arg(long, value_name = "ORDER")]
    pub order: Option<CategoryOrder>,

    /// Split aggregation across this many workers
    #[arg(long, value_name = "NUM", env = "YOYREPORT_SHARDS")]
    pub shards: Option<usize>,

    /// Decimals in displayed percentages
    #[arg(long, value_name = "NUM")]
    pub decimals: Option<u32>,

    /// Only analyze these categories (comma-separated)
    ///
    /// Example: --category Revenue,Limits
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub category: Option<Vec<String>>,

    /// File extensions to load from a directory (comma-separated)
    #[arg(long, value_name = "EXTS", value_delimiter = ',')]
    pub extensions: Option<Vec<String>>,

    /// Names to skip when loading a directory (comma-separated)
    #[arg(long, value_name = "PATTERNS", value_delimiter = ',')]
    pub exclude: Option<Vec<String>>,

    /// Maximum number of files to load from a directory
    #[arg(long, value_name = "COUNT")]
    pub max_files: Option<usize>,

    /// Exit with code 2 if any year-over-year change is undefined
    ///
    /// Useful for CI pipelines (e.g. a category with a zero total).
    #[arg(long)]
    pub fail_on_undefined: bool,

    /// Fail when the input contains no transactions
    #[arg(long)]
    pub require_data: bool,

    /// Dry run: list the input files and record counts without analysis
    ///
    /// Requires --input.
    #[arg(long)]
    pub dry_run: bool,

    /// Write COUNT random transactions to --output and exit
    #[arg(long, value_name = "COUNT", conflicts_with_all = ["input", "sample"])]
    pub generate: Option<usize>,

    /// Analyze COUNT random transactions instead of reading --input
    #[arg(long, value_name = "COUNT", conflicts_with = "input")]
    pub sample: Option<usize>,

    /// Seed for --generate / --sample
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Generate a default .yoyreport.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
    /// CSV, one row per change
    Csv,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(count) = self.generate {
            if count == 0 {
                return Err("Generate count must be at least 1".to_string());
            }
            match self.output.as_deref() {
                None => return Err("--generate requires --output <FILE.csv|FILE.json>".to_string()),
                Some(path) if path.as_os_str() == "-" => {
                    return Err("--generate cannot write to stdout".to_string())
                }
                Some(_) => {}
            }
        }

        if self.dry_run && self.input.is_none() {
            return Err("--dry-run requires --input".to_string());
        }

        if self.sample == Some(0) {
            return Err("Sample count must be at least 1".to_string());
        }

        if self.shards == Some(0) {
            return Err("Shards must be at least 1".to_string());
        }

        if self.max_files == Some(0) {
            return Err("Max files must be at least 1".to_string());
        }

        if let Some(decimals) = self.decimals {
            if decimals > 10 {
                return Err("Decimals must be between 0 and 10".to_string());
            }
        }

        if let Some(ref date_format) = self.date_format {
            if date_format.trim().is_empty() {
                return Err("Date format must not be empty".to_string());
            }
        }

        // Validate input path if provided
        if let Some(ref input) = self.input {
            if !input.exists() {
                return Err(format!("Input path does not exist: {}", input.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Describes where transactions come from, for report metadata.
    pub fn input_label(&self) -> String {
        match (&self.input, self.sample) {
            (Some(path), _) => path.display().to_string(),
            (None, Some(count)) => format!("{} generated transactions", count),
            (None, None) => String::new(),
        }
    }
}
