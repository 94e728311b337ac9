//! YoyReport - year-over-year gainers and losers
//!
//! A CLI tool that sums transaction values per category and calendar
//! year and reports the percentage change between consecutive years.
//!
//! Exit codes:
//!   0 - Success (no undefined changes, or no --fail-on-undefined set)
//!   1 - Runtime error (bad input, config, invalid date, I/O, etc.)
//!   2 - Undefined changes found with --fail-on-undefined

mod analysis;
mod cli;
mod config;
mod generator;
mod loader;
mod models;
mod report;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE_NAME};
use generator::{GenerateOptions, TransactionGenerator};
use loader::LoadConfig;
use models::{ChangeSummary, Report, ReportMetadata, Transaction};
use report::RenderOptions;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args)?;

    info!("YoyReport v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Report failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .yoyreport.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE_NAME);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize date format, ordering, generator and report options.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// `RUST_LOG` takes precedence over --verbose / --quiet. Logs go to stderr
/// so a report written to stdout stays clean.
fn init_logging(args: &Args) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level().to_string().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")
}

/// Run the complete workflow. Returns exit code (0 or 2).
async fn run(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    if let Some(count) = args.generate {
        return handle_generate(&args, &config, count);
    }

    let load_options = LoadConfig::from(&config.loader);

    if args.dry_run {
        if let Some(ref input) = args.input {
            return handle_dry_run(input, &load_options);
        }
    }

    let to_stdout = config.general.output == "-";
    let chatty = !args.quiet && !to_stdout;

    // Step 1: Load transactions
    let (transactions, files_read) = match (&args.input, args.sample) {
        (Some(input), _) => {
            if chatty {
                println!("📥 Loading transactions: {}", input.display());
            }
            loader::load_path(input, &load_options)?
        }
        (None, Some(count)) => {
            if chatty {
                println!("🎲 Generating {} sample transactions...", count);
            }
            let options = GenerateOptions {
                show_progress: false,
                ..GenerateOptions::from(&config.generator)
            };
            (TransactionGenerator::new(options)?.generate(count), 0)
        }
        (None, None) => anyhow::bail!("No input given (use --input or --sample)"),
    };
    info!("Loaded {} transactions from {} files", transactions.len(), files_read);

    // Step 2: Aggregate and analyze
    if chatty {
        println!("🔬 Computing year-over-year changes...");
    }
    let report = build_report(transactions, files_read, args.input_label(), &config, start_time).await?;

    // Step 3: Render and save the report
    let options = RenderOptions::from(&config.report);
    let output = match config.general.format {
        OutputFormat::Markdown => report::generate_markdown_report(&report, &options),
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Csv => report::generate_csv_report(&report, &options)?,
    };

    if to_stdout {
        print!("{}", output);
    } else {
        std::fs::write(&config.general.output, &output)
            .with_context(|| format!("Failed to write report to {}", config.general.output))?;
    }

    // Print summary
    let summary = &report.summary;
    if chatty {
        println!("\n📊 Summary:");
        println!("   Records: {}", report.metadata.records_loaded);
        println!("   Categories: {}", summary.categories);
        println!(
            "   Changes: {} | ▲ Gainers: {} | ▼ Losers: {} | ▬ Flat: {} | Undefined: {}",
            summary.total, summary.gainers, summary.losers, summary.flat, summary.undefined
        );
        println!("   Duration: {:.2}s", report.metadata.duration_seconds);
        println!("\n✅ Report saved to: {}", config.general.output);
    }

    if args.fail_on_undefined && summary.undefined > 0 {
        eprintln!(
            "\n⛔ {} year-over-year changes are undefined. Failing (exit code 2).",
            summary.undefined
        );
        return Ok(2);
    }

    Ok(0)
}

/// Aggregate transactions, compute changes and assemble the report.
async fn build_report(
    transactions: Vec<Transaction>,
    files_read: usize,
    input: String,
    config: &Config,
    started: Instant,
) -> Result<Report> {
    let analysis_config = &config.analysis;
    let date_format = analysis_config.date_format.as_str();
    let order = analysis_config.category_order;
    let records_loaded = transactions.len();

    let totals = if analysis_config.shards > 1 {
        analysis::aggregate_sharded(Arc::from(transactions), analysis_config.shards, date_format).await?
    } else {
        analysis::aggregate(&transactions, date_format)?
    };

    let mut totals = if analysis_config.require_data {
        analysis::require_data(totals)?
    } else {
        totals
    };

    if totals.is_empty() {
        warn!("No transactions to analyze");
    }

    if !analysis_config.categories.is_empty() {
        totals.retain_categories(&analysis_config.categories);
        debug!("Kept {} of the requested categories", totals.len());
    }

    let outcomes = analysis::analyze(&totals, order);
    for err in outcomes.iter().filter_map(|o| o.as_ref().err()) {
        warn!("{}", err);
    }

    let (changes, undefined) = analysis::partition_outcomes(outcomes);
    let category_totals = totals.to_category_totals(order);
    let summary = ChangeSummary::from_changes(&changes, &undefined).with_totals(&category_totals);

    Ok(Report {
        metadata: ReportMetadata {
            input,
            generated_at: Utc::now(),
            records_loaded,
            files_read,
            date_format: date_format.to_string(),
            duration_seconds: started.elapsed().as_secs_f64(),
        },
        summary,
        changes,
        undefined,
        totals: category_totals,
    })
}

/// Handle --generate: write random transactions to --output.
fn handle_generate(args: &Args, config: &Config, count: usize) -> Result<i32> {
    let path = args
        .output
        .as_deref()
        .context("--generate requires --output")?;

    let options = GenerateOptions {
        show_progress: !args.quiet,
        ..GenerateOptions::from(&config.generator)
    };
    let mut generator = TransactionGenerator::new(options)?;

    if !args.quiet {
        println!("🎲 Generating {} transactions...", count);
    }
    generator.write_to(path, count)?;

    if !args.quiet {
        println!("✅ Data generation complete. Saved to: {}", path.display());
    }
    Ok(0)
}

/// Handle --dry-run: list input files and their record counts, exit.
fn handle_dry_run(input: &Path, load_config: &LoadConfig) -> Result<i32> {
    println!("\n🔍 Dry run: scanning inputs (no analysis)...\n");

    let files = loader::scan_inputs(input, load_config)?;

    if files.is_empty() {
        println!("   No matching input files found.");
    } else {
        println!("   Found {} files that would be loaded:\n", files.len());
        let mut total = 0;
        for file in &files {
            let records = loader::load_file(&file.path, file.format)?.len();
            total += records;
            println!(
                "     📄 {} ({} bytes, {} records)",
                file.path.display(),
                file.size,
                records
            );
        }
        println!("\n   Total: {} files, {} records", files.len(), total);
    }

    println!("\n✅ Dry run complete. No report was written.");
    Ok(0)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisError;
    use crate::models::{CategoryOrder, Direction};
    use rust_decimal::Decimal;
    use std::path::PathBuf;

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures").join(name)
    }

    async fn report_for(name: &str, config: &Config) -> Report {
        let (transactions, files) = loader::load_path(&fixture(name), &LoadConfig::default()).unwrap();
        build_report(transactions, files, name.to_string(), config, Instant::now())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_report_for_sample_ledger() {
        let report = report_for("transactions.json", &Config::default()).await;

        let changes: Vec<_> = report
            .changes
            .iter()
            .map(|c| (c.category.as_str(), c.percentage(2), c.direction))
            .collect();
        assert_eq!(
            changes,
            vec![
                ("Revenue", "30.00%".to_string(), Direction::Gainer),
                ("Balances", "3.00%".to_string(), Direction::Gainer),
                ("Outstanding", "-5.71%".to_string(), Direction::Loser),
                ("Limits", "3.13%".to_string(), Direction::Gainer),
            ]
        );
        assert_eq!(report.summary.gainers, 3);
        assert_eq!(report.summary.losers, 1);
        assert_eq!(report.metadata.records_loaded, 8);
        assert_eq!(report.metadata.files_read, 1);
    }

    #[tokio::test]
    async fn test_report_with_undefined_and_single_year() {
        let report = report_for("transactions.csv", &Config::default()).await;

        let pairs: Vec<_> = report
            .changes
            .iter()
            .map(|c| (c.category.as_str(), c.year_from, c.year_to))
            .collect();
        assert_eq!(
            pairs,
            vec![("Revenue", 2022, 2023), ("Revenue", 2023, 2024), ("Fees", 2023, 2024)]
        );
        assert_eq!(report.changes[1].percent_change, Decimal::from(30));
        assert_eq!(report.changes[2].percent_change, Decimal::from(50));

        assert_eq!(report.undefined.len(), 1);
        assert_eq!(report.undefined[0].category, "Fees");
        assert_eq!(report.undefined[0].year_from, Some(2022));
        assert_eq!(report.total_for("Deposits", 2024), Some(Decimal::from(25_000)));
        assert_eq!(report.summary.categories, 3);
    }

    #[tokio::test]
    async fn test_sharded_report_matches_sequential() {
        let sequential = report_for("transactions.csv", &Config::default()).await;

        let mut config = Config::default();
        config.analysis.shards = 3;
        let sharded = report_for("transactions.csv", &config).await;

        assert_eq!(sharded.changes, sequential.changes);
        assert_eq!(sharded.undefined, sequential.undefined);
        assert_eq!(sharded.totals, sequential.totals);
    }

    #[tokio::test]
    async fn test_category_filter_and_order() {
        let mut config = Config::default();
        config.analysis.categories = vec!["Limits".to_string(), "Balances".to_string()];
        config.analysis.category_order = CategoryOrder::Lexical;

        let report = report_for("transactions.json", &config).await;
        let categories: Vec<_> = report.changes.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(categories, vec!["Balances", "Limits"]);
    }

    #[tokio::test]
    async fn test_require_data() {
        let mut config = Config::default();
        let report = build_report(Vec::new(), 0, String::new(), &config, Instant::now())
            .await
            .unwrap();
        assert!(report.changes.is_empty());

        config.analysis.require_data = true;
        let err = build_report(Vec::new(), 0, String::new(), &config, Instant::now())
            .await
            .unwrap_err();
        assert_eq!(err.downcast_ref::<AnalysisError>(), Some(&AnalysisError::EmptyInput));
    }

    #[tokio::test]
    async fn test_invalid_date_aborts() {
        let transactions = vec![Transaction::new("Revenue", "01/02/2023", Decimal::ONE)];
        let err = build_report(transactions, 0, String::new(), &Config::default(), Instant::now())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AnalysisError>(),
            Some(AnalysisError::InvalidDate { index: 0, .. })
        ));
    }
}
