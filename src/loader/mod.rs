//! Transaction record loading.
//!
//! Reads transactions from CSV and JSON files, or from every matching file
//! under a directory. Records are validated for a non-empty category and a
//! numeric value; dates are left to the aggregator.

use crate::models::Transaction;
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Configuration for input discovery.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// File extensions to include (e.g., ["csv", "json"])
    pub extensions: Vec<String>,
    /// Names to exclude (e.g., ["archive", "tmp"])
    pub excludes: Vec<String>,
    /// Maximum file size in bytes
    pub max_file_size: u64,
    /// Maximum number of files to load
    pub max_files: Option<usize>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["csv".to_string(), "json".to_string()],
            excludes: Vec::new(),
            max_file_size: 512 * 1024 * 1024, // 512MB
            max_files: None,
        }
    }
}

impl From<&crate::config::LoaderConfig> for LoadConfig {
    fn from(config: &crate::config::LoaderConfig) -> Self {
        Self {
            extensions: config.extensions.clone(),
            excludes: config.excludes.clone(),
            max_file_size: config.max_file_size,
            max_files: Some(config.max_files),
        }
    }
}

/// A record that failed validation.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{file}: record {record}: empty category")]
    EmptyCategory { file: String, record: usize },

    #[error("{file}: record {record}: invalid value '{value}'")]
    InvalidValue {
        file: String,
        record: usize,
        value: String,
    },

    #[error("{0}: unsupported input format (expected .csv or .json)")]
    UnsupportedFormat(String),
}

/// Supported input file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Json,
}

impl InputFormat {
    /// Detect the format from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("csv") => Some(InputFormat::Csv),
            Some("json") => Some(InputFormat::Json),
            _ => None,
        }
    }
}

/// Discovered input file.
#[derive(Debug, Clone)]
pub struct InputFile {
    /// Path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Detected format
    pub format: InputFormat,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    category: String,
    date: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct JsonRow {
    category: String,
    date: String,
    value: serde_json::Value,
}

/// List the input files a load of `root` would read, in path order.
pub fn scan_inputs(root: &Path, config: &LoadConfig) -> Result<Vec<InputFile>> {
    if root.is_file() {
        let format = InputFormat::from_path(root)
            .ok_or_else(|| LoadError::UnsupportedFormat(root.display().to_string()))?;
        let size = std::fs::metadata(root)
            .with_context(|| format!("Failed to stat {}", root.display()))?
            .len();
        return Ok(vec![InputFile {
            path: root.to_path_buf(),
            size,
            format,
        }]);
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_excluded(entry.file_name(), config));

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                debug!("Cannot read entry under {}: {}", root.display(), e);
                continue;
            }
        };

        if !entry.file_type().is_file() || !matches_extension(entry.path(), config) {
            continue;
        }

        let Some(format) = InputFormat::from_path(entry.path()) else {
            continue;
        };

        let size = match entry.metadata() {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                warn!("Skipping {}: {}", entry.path().display(), e);
                continue;
            }
        };

        if size > config.max_file_size {
            warn!(
                "Skipping {} ({} bytes exceeds limit of {})",
                entry.path().display(),
                size,
                config.max_file_size
            );
            continue;
        }

        files.push(InputFile {
            path: entry.into_path(),
            size,
            format,
        });

        if let Some(max) = config.max_files {
            if files.len() >= max {
                break;
            }
        }
    }

    Ok(files)
}

/// Load every transaction from a file or directory.
///
/// Returns the transactions in file order along with the number of files read.
pub fn load_path(root: &Path, config: &LoadConfig) -> Result<(Vec<Transaction>, usize)> {
    let files = scan_inputs(root, config)?;
    let mut transactions = Vec::new();

    for file in &files {
        let loaded = load_file(&file.path, file.format)?;
        info!("Loaded {} records from {}", loaded.len(), file.path.display());
        transactions.extend(loaded);
    }

    Ok((transactions, files.len()))
}

/// Load one file in the given format.
pub fn load_file(path: &Path, format: InputFormat) -> Result<Vec<Transaction>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let reader = BufReader::new(file);
    let name = path.display().to_string();

    match format {
        InputFormat::Csv => load_csv(reader, &name),
        InputFormat::Json => load_json(reader, &name),
    }
}

/// Parse CSV with a `category,date,value` header row.
pub fn load_csv<R: Read>(reader: R, source: &str) -> Result<Vec<Transaction>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut transactions = Vec::new();

    for (i, result) in rdr.deserialize::<CsvRow>().enumerate() {
        let record = i + 1;
        let row = result.with_context(|| format!("Failed to parse CSV record {} in {}", record, source))?;
        let value = parse_value(&row.value).ok_or_else(|| LoadError::InvalidValue {
            file: source.to_string(),
            record,
            value: row.value.clone(),
        })?;
        transactions.push(validated(source, record, row.category, row.date, value)?);
    }

    Ok(transactions)
}

/// Parse a JSON array of `{category, date, value}` objects.
pub fn load_json<R: Read>(reader: R, source: &str) -> Result<Vec<Transaction>> {
    let rows: Vec<JsonRow> =
        serde_json::from_reader(reader).with_context(|| format!("Failed to parse JSON in {}", source))?;

    rows.into_iter()
        .enumerate()
        .map(|(i, row)| {
            let record = i + 1;
            let raw = match &row.value {
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let value = parse_value(&raw).ok_or_else(|| LoadError::InvalidValue {
                file: source.to_string(),
                record,
                value: raw.clone(),
            })?;
            validated(source, record, row.category, row.date, value)
        })
        .collect()
}

fn validated(source: &str, record: usize, category: String, date: String, value: Decimal) -> Result<Transaction> {
    if category.trim().is_empty() {
        return Err(LoadError::EmptyCategory {
            file: source.to_string(),
            record,
        }
        .into());
    }

    Ok(Transaction::new(category.trim(), date, value))
}

/// Parse a decimal value, accepting plain and scientific notation.
///
/// `NaN` and infinities are rejected.
pub fn parse_value(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

fn is_excluded(name: &std::ffi::OsStr, config: &LoadConfig) -> bool {
    let name = name.to_string_lossy();

    // Hidden files
    if name.starts_with('.') {
        return true;
    }

    config.excludes.iter().any(|pattern| name == pattern.as_str())
}

fn matches_extension(path: &Path, config: &LoadConfig) -> bool {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    config.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CSV: &str = "category,date,value\n\
        Revenue,2023-01-01,1000000\n\
        Revenue,2024-01-01,1300000\n\
        Outstanding, 2023-01-01 ,700000.50\n";

    const JSON: &str = r#"[
        { "category": "Revenue", "date": "2023-01-01", "value": 1000000 },
        { "category": "Balances", "date": "2024-01-01", "value": "515000.25" },
        { "category": "Limits", "date": "2024-01-01", "value": 8.25e5 }
    ]"#;

    #[test]
    fn test_load_csv() {
        let transactions = load_csv(CSV.as_bytes(), "inline.csv").unwrap();

        assert_eq!(transactions.len(), 3);
        assert_eq!(transactions[0].category, "Revenue");
        assert_eq!(transactions[1].value, Decimal::from(1_300_000));
        assert_eq!(transactions[2].date, "2023-01-01");
        assert_eq!(transactions[2].value, Decimal::new(70_000_050, 2));
    }

    #[test]
    fn test_load_json() {
        let transactions = load_json(JSON.as_bytes(), "inline.json").unwrap();

        assert_eq!(transactions.len(), 3);
        assert_eq!(transactions[0].value, Decimal::from(1_000_000));
        assert_eq!(transactions[1].value, Decimal::new(51_500_025, 2));
        assert_eq!(transactions[2].value, Decimal::from(825_000));
    }

    #[test]
    fn test_json_numbers_keep_full_precision() {
        let json = r#"[{ "category": "Revenue", "date": "2023-01-01", "value": 12345678901234567890.123456789 }]"#;
        let transactions = load_json(json.as_bytes(), "precise.json").unwrap();

        assert_eq!(
            transactions[0].value,
            "12345678901234567890.123456789".parse::<Decimal>().unwrap()
        );
    }

    #[test]
    fn test_rejects_nan_value() {
        let csv = "category,date,value\nRevenue,2023-01-01,NaN\n";
        let err = load_csv(csv.as_bytes(), "bad.csv").unwrap_err();

        match err.downcast_ref::<LoadError>() {
            Some(LoadError::InvalidValue { record, value, .. }) => {
                assert_eq!(*record, 1);
                assert_eq!(value, "NaN");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_empty_category() {
        let json = r#"[{ "category": "", "date": "2023-01-01", "value": 1 }]"#;
        let err = load_json(json.as_bytes(), "bad.json").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LoadError>(),
            Some(LoadError::EmptyCategory { record: 1, .. })
        ));
    }

    #[test]
    fn test_rejects_null_value() {
        let json = r#"[{ "category": "Revenue", "date": "2023-01-01", "value": null }]"#;
        assert!(load_json(json.as_bytes(), "bad.json").is_err());
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("250"), Some(Decimal::from(250)));
        assert_eq!(parse_value(" -50.5 "), Some(Decimal::new(-505, 1)));
        assert_eq!(parse_value("1e3"), Some(Decimal::from(1000)));
        assert_eq!(parse_value("inf"), None);
        assert_eq!(parse_value(""), None);
    }

    #[test]
    fn test_load_directory() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("a.csv"), CSV).unwrap();
        std::fs::create_dir(temp_dir.path().join("nested")).unwrap();
        std::fs::write(temp_dir.path().join("nested").join("b.json"), JSON).unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), "ignored").unwrap();
        std::fs::write(temp_dir.path().join(".hidden.csv"), CSV).unwrap();

        let (transactions, files) = load_path(temp_dir.path(), &LoadConfig::default()).unwrap();

        assert_eq!(files, 2);
        assert_eq!(transactions.len(), 6);
        assert_eq!(transactions[3].category, "Revenue");
        assert_eq!(transactions[4].category, "Balances");
    }

    #[test]
    fn test_scan_respects_excludes_and_limits() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join("archive")).unwrap();
        std::fs::write(temp_dir.path().join("archive").join("old.csv"), CSV).unwrap();
        std::fs::write(temp_dir.path().join("x.csv"), CSV).unwrap();
        std::fs::write(temp_dir.path().join("y.csv"), CSV).unwrap();

        let config = LoadConfig {
            excludes: vec!["archive".to_string()],
            max_files: Some(1),
            ..LoadConfig::default()
        };

        let files = scan_inputs(temp_dir.path(), &config).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].path.ends_with("x.csv"));
    }

    #[test]
    fn test_single_file_unsupported_format() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.xlsx");
        std::fs::write(&path, "").unwrap();

        assert!(scan_inputs(&path, &LoadConfig::default()).is_err());
    }
}
