//! Olistdash - Olist e-commerce analytics dashboard
//!
//! A CLI tool that loads the pre-joined Olist CSV tables, aggregates them
//! into category, RFM, review, trend and geography summaries and writes the
//! result as a Markdown or JSON dashboard.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (config, unreadable output path, etc.)
//!   2 - Some sections could not be built and --strict is set

mod analysis;
mod cli;
mod config;
mod dashboard;
mod data;
mod error;
mod models;
mod report;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE};
use dashboard::{build_dashboard, DashboardParams, SECTION_COUNT};
use data::{DataFiles, Dataset, Table};
use report::{Report, ReportMetadata};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> Result<()> {
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

    // Configuration comes first so `[general] verbose` can set the log level
    let (mut config, origin) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(args.log_level(config.general.verbose));

    info!("Olistdash v{}", env!("CARGO_PKG_VERSION"));
    match origin {
        ConfigOrigin::File(path) => info!("Loaded config from: {}", path.display()),
        ConfigOrigin::Defaults => debug!("No config file found, using defaults"),
        ConfigOrigin::Unreadable(e) => warn!("Failed to load config: {:#}", e),
    }
    debug!("Arguments: {:?}", args);

    match run_dashboard(args, config) {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Dashboard failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .olistdash.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to point at your data directory and tune the report.");
    Ok(())
}

/// Initialize logging. `RUST_LOG` directives refine the verbosity level.
fn init_logging(level: Level) {
    let rust_log = std::env::var("RUST_LOG").ok();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(log_filter(level, rust_log.as_deref()))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

fn log_filter(level: Level, rust_log: Option<&str>) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .parse_lossy(rust_log.unwrap_or(""))
}

/// Run the complete dashboard workflow. Returns exit code (0 or 2).
fn run_dashboard(args: Args, config: Config) -> Result<i32> {
    let start_time = Instant::now();

    let files = DataFiles::from(&config.data);

    // Handle --dry-run: list source files and exit
    if args.dry_run {
        return handle_dry_run(&files);
    }

    // Step 1: Load the source tables
    println!("📥 Loading tables from: {}", files.dir.display());
    let dataset = Dataset::load_with_progress(&files, !args.quiet);
    let tables_loaded = Table::ALL.len() - dataset.failures().len();

    // Step 2: Aggregate
    println!("🔬 Building dashboard...");
    let params = DashboardParams::from(&config).with_range(args.start, args.end);
    let dashboard = build_dashboard(&dataset, &params);
    let failures: Vec<(String, String)> = dashboard
        .failures()
        .into_iter()
        .map(|(name, reason)| (name.to_string(), reason.to_string()))
        .collect();

    // Step 3: Render and save
    println!("📝 Generating report...");
    let duration = start_time.elapsed().as_secs_f64();
    let report = Report {
        metadata: ReportMetadata {
            generated_at: Utc::now(),
            data_dir: files.dir.display().to_string(),
            date_range: dashboard.date_range,
            top_n: params.top_n,
            missing_keys: params.missing_keys,
            tables_loaded,
            tables_total: Table::ALL.len(),
            duration_seconds: duration,
        },
        dashboard,
    };

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report, &config.report),
    };

    let output_path = Path::new(&config.general.output);
    std::fs::write(output_path, &output)
        .with_context(|| format!("Failed to write dashboard to {}", output_path.display()))?;

    // Print summary
    println!("\n📊 Dashboard Summary:");
    println!("   Tables loaded: {}/{}", tables_loaded, Table::ALL.len());
    if let Some(range) = report.metadata.date_range {
        println!("   Date range: {}", range);
    }
    println!(
        "   Sections built: {}/{}",
        SECTION_COUNT - failures.len(),
        SECTION_COUNT
    );
    for (name, reason) in &failures {
        println!("   - ⚠️  {}: {}", name, reason);
    }
    println!("   Duration: {:.1}s", duration);
    println!(
        "\n✅ Dashboard complete! Saved to: {}",
        output_path.display()
    );

    if args.strict && !failures.is_empty() {
        eprintln!(
            "\n⛔ {} section(s) could not be built. Failing (exit code 2).",
            failures.len()
        );
        return Ok(2);
    }

    Ok(0)
}

/// Handle --dry-run: report which source files exist, then exit.
fn handle_dry_run(files: &DataFiles) -> Result<i32> {
    println!("\n🔍 Dry run: checking source files (nothing is parsed)...\n");

    let entries = data::survey(files);
    let present = entries.iter().filter(|e| e.size.is_some()).count();

    for entry in &entries {
        match entry.size {
            Some(size) => println!("     📄 {} ({} bytes) - {}", entry.path.display(), size, entry.table),
            None => println!("     ❓ {} (missing) - {}", entry.path.display(), entry.table),
        }
    }
    println!("\n   Present: {}/{} files", present, entries.len());
    if present < entries.len() {
        warn!("{} source file(s) missing", entries.len() - present);
    }

    println!("\n✅ Dry run complete. No dashboard was written.");
    Ok(0)
}

/// Where the configuration came from, logged once logging is up.
enum ConfigOrigin {
    File(PathBuf),
    Defaults,
    Unreadable(anyhow::Error),
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<(Config, ConfigOrigin)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigOrigin::File(config_path.clone())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigOrigin::File(PathBuf::from(CONFIG_FILE)))),
        Ok(None) => Ok((Config::default(), ConfigOrigin::Defaults)),
        Err(e) => Ok((Config::default(), ConfigOrigin::Unreadable(e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_defaults_to_level() {
        assert_eq!(log_filter(Level::DEBUG, None).to_string(), "debug");
        assert_eq!(log_filter(Level::ERROR, Some("")).to_string(), "error");
    }

    #[test]
    fn test_log_filter_reads_rust_log_directives() {
        let filter = log_filter(Level::INFO, Some("olistdash=trace"));
        assert!(filter.to_string().contains("olistdash=trace"));
    }

    #[test]
    fn test_load_config_explicit_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[general]\nverbose = true\n").unwrap();

        let args = <Args as clap::Parser>::try_parse_from([
            "olistdash",
            "--config",
            path.to_str().unwrap(),
        ])
        .unwrap();
        let (config, origin) = load_config(&args).unwrap();
        assert!(config.general.verbose);
        assert!(matches!(origin, ConfigOrigin::File(ref p) if p == &path));
        assert_eq!(args.log_level(config.general.verbose), Level::DEBUG);
    }
}
