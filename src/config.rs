//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.yoyreport.toml` files.

use crate::analysis::DEFAULT_DATE_FORMAT;
use crate::cli::OutputFormat;
use crate::models::CategoryOrder;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".yoyreport.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Input loading settings.
    #[serde(default)]
    pub loader: LoaderConfig,

    /// Aggregation and change analysis settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Sample data generation settings.
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Default report format.
    #[serde(default)]
    pub format: OutputFormat,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            format: OutputFormat::default(),
        }
    }
}

fn default_output() -> String {
    "yoy_report.md".to_string()
}

/// Input discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Maximum input files to load from a directory.
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// File extensions to include.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// File or directory names to exclude.
    #[serde(default)]
    pub excludes: Vec<String>,

    /// Maximum file size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
            extensions: default_extensions(),
            excludes: Vec::new(),
            max_file_size: default_max_file_size(),
        }
    }
}

fn default_max_files() -> usize {
    1000
}

fn default_extensions() -> Vec<String> {
    vec!["csv".to_string(), "json".to_string()]
}

fn default_max_file_size() -> u64 {
    512 * 1024 * 1024 // 512MB
}

/// Aggregation and change settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// chrono format string for transaction dates.
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// Category order in the output.
    #[serde(default)]
    pub category_order: CategoryOrder,

    /// Number of aggregation shards (1 = sequential).
    #[serde(default = "default_shards")]
    pub shards: usize,

    /// Treat an empty input as an error.
    #[serde(default)]
    pub require_data: bool,

    /// Only analyze these categories (empty = all).
    #[serde(default)]
    pub categories: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            date_format: default_date_format(),
            category_order: CategoryOrder::default(),
            shards: default_shards(),
            require_data: false,
            categories: Vec::new(),
        }
    }
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

fn default_shards() -> usize {
    1
}

/// Sample data generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Categories to draw from.
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,

    /// First year of generated dates.
    #[serde(default = "default_start_year")]
    pub start_year: i32,

    /// Last year of generated dates.
    #[serde(default = "default_end_year")]
    pub end_year: i32,

    /// Smallest generated value (inclusive).
    #[serde(default = "default_min_value")]
    pub min_value: i64,

    /// Largest generated value (exclusive).
    #[serde(default = "default_max_value")]
    pub max_value: i64,

    /// Seed for reproducible data.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            categories: default_categories(),
            start_year: default_start_year(),
            end_year: default_end_year(),
            min_value: default_min_value(),
            max_value: default_max_value(),
            seed: None,
        }
    }
}

fn default_categories() -> Vec<String> {
    vec!["Revenue", "Balances", "Outstanding", "Limits"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_start_year() -> i32 {
    2010
}

fn default_end_year() -> i32 {
    2024
}

fn default_min_value() -> i64 {
    100_000
}

fn default_max_value() -> i64 {
    5_100_000
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Decimals in displayed percentages.
    #[serde(default = "default_decimals")]
    pub decimals: u32,

    /// Number of entries in the top gainers / losers tables.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Include the yearly totals section.
    #[serde(default = "default_true")]
    pub include_totals: bool,

    /// Include the undefined changes section.
    #[serde(default = "default_true")]
    pub include_undefined: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            decimals: default_decimals(),
            top_n: default_top_n(),
            include_totals: true,
            include_undefined: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_decimals() -> u32 {
    2
}

fn default_top_n() -> usize {
    5
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load configuration from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Only explicitly provided CLI values override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
        if let Some(format) = args.format {
            self.general.format = format;
        }

        // Loader settings
        if let Some(max_files) = args.max_files {
            self.loader.max_files = max_files;
        }
        if let Some(ref extensions) = args.extensions {
            self.loader.extensions = extensions.clone();
        }
        if let Some(ref excludes) = args.exclude {
            self.loader.excludes = excludes.clone();
        }

        // Analysis settings
        if let Some(ref date_format) = args.date_format {
            self.analysis.date_format = date_format.clone();
        }
        if let Some(order) = args.order {
            self.analysis.category_order = order;
        }
        if let Some(shards) = args.shards {
            self.analysis.shards = shards;
        }
        if args.require_data {
            self.analysis.require_data = true;
        }
        if let Some(ref categories) = args.category {
            self.analysis.categories = categories.clone();
        }

        // Generator settings
        if let Some(seed) = args.seed {
            self.generator.seed = Some(seed);
        }

        // Report settings
        if let Some(decimals) = args.decimals {
            self.report.decimals = decimals;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
