//! CLI entry point: `migrate` the SM Gerenciamento export into SQLite, then
//! `report` the dashboard KPIs from it.

use anyhow::{Result, anyhow};
use chrono::{Datelike, Local};
use clap::{Args, Parser, Subcommand, ValueEnum};
use dotenv::dotenv;
use sm_gerenciamento::reporting::{MetricsReport, ReportFormat, ReportGenerator, format_brl};
use sm_gerenciamento::{
    CsvEncoding, DashboardMetrics, MetricsEngine, Migration, MigrationSummary, ReportConfig,
    Result as ReportingResult, SalesStore,
};
use std::io;
use std::path::PathBuf;
use tracing::{debug, error, info};

/// CLI-compatible CSV encoding enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliEncoding {
    /// ISO-8859-1, as written by the SM export
    Latin1,
    Utf8,
}

impl From<CliEncoding> for CsvEncoding {
    fn from(cli: CliEncoding) -> Self {
        match cli {
            CliEncoding::Latin1 => CsvEncoding::Latin1,
            CliEncoding::Utf8 => CsvEncoding::Utf8,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "SM Gerenciamento: Excel/CSV → SQLite migration and KPI report",
    long_about = "Migrates the SM Gerenciamento spreadsheet into a SQLite database and \
                  computes billing, sales and pending backlog metrics from it.\n\n\
                  ENVIRONMENT VARIABLES (.env honored):\n  \
                  SM_DATABASE    Database path (default: gerenciamento.db)\n  \
                  SM_WORKBOOK    Input workbook or CSV export\n  \
                  SM_SHEET       Worksheet name (default: Gerenciamento)\n\n\
                  EXAMPLES:\n  \
                  sm-gerenciamento migrate --input planilha.xlsx\n  \
                  sm-gerenciamento report --year 2025 --month 6\n  \
                  sm-gerenciamento report --json | jq .metrics.billing"
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,

    /// Only show warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the export into the database, replacing the sales table
    Migrate(MigrateArgs),
    /// Compute dashboard KPIs from the database
    Report(ReportArgs),
}

#[derive(Args, Debug)]
struct MigrateArgs {
    /// Workbook (.xlsx/.xls/.ods) or CSV export
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Worksheet to read from a workbook
    #[arg(short, long)]
    sheet: Option<String>,

    /// SQLite database to (re)create
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Encoding of a CSV export
    #[arg(long, value_enum, default_value = "latin1")]
    encoding: CliEncoding,

    /// Keep an existing database file and only replace the table
    #[arg(long)]
    keep_database: bool,
}

#[derive(Args, Debug)]
struct ReportArgs {
    /// SQLite database produced by `migrate`
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Reporting year (default: current year)
    #[arg(short, long)]
    year: Option<i32>,

    /// Reporting month, 1-12 (default: current month)
    #[arg(short, long)]
    month: Option<u32>,

    /// Print JSON to stdout instead of the text summary
    ///
    /// Disables all logs so stdout only carries the report, or a
    /// `{"code", "message"}` object when it fails.
    #[arg(long)]
    json: bool,

    /// Also write the JSON report to this file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// Initialize the tracing subscriber for logging.
///
/// `RUST_LOG` wins over `--log-level`. Nothing is initialized for JSON
/// output so stdout stays machine-readable.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let json_output = matches!(&cli.command, Command::Report(args) if args.json);
    init_logging(&cli.log_level, cli.quiet, json_output);

    dotenv().ok();

    match cli.command {
        Command::Migrate(args) => run_migrate(args, cli.quiet),
        Command::Report(args) => run_report(args),
    }
}

fn run_migrate(args: MigrateArgs, quiet: bool) -> Result<()> {
    let mut builder = ReportConfig::builder()
        .csv_encoding(args.encoding.into())
        .recreate_database(!args.keep_database);
    if let Some(input) = args.input {
        builder = builder.workbook_path(input);
    }
    if let Some(sheet) = args.sheet {
        builder = builder.sheet_name(sheet);
    }
    if let Some(database) = args.database {
        builder = builder.database_path(database);
    }
    let config = builder.with_env_overrides().build()?;

    let migration = Migration::builder()
        .config(config)
        .on_progress(|update| {
            debug!(
                "[{:>3.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        })
        .build()?;

    match migration.run() {
        Ok(summary) => {
            if !quiet {
                print_migration_summary(&summary);
            }
            Ok(())
        }
        Err(e) => {
            error!("Migration failed [{}]: {}", e.error_code(), e);
            Err(anyhow!("Migration failed: {}", e))
        }
    }
}

fn print_migration_summary(summary: &MigrationSummary) {
    println!("\n{}", "=".repeat(60));
    println!("MIGRATION COMPLETE");
    println!("{}", "=".repeat(60));
    println!("  Source:   {}", summary.source);
    println!("  Database: {} (table '{}')", summary.database, summary.table);
    println!("  Rows:     {}", summary.rows);
    println!("  Columns:  {}", summary.columns);
    println!("  Time:     {} ms", summary.duration_ms);

    if !summary.missing_columns.is_empty() {
        println!("\n  Missing columns ({}):", summary.missing_columns.len());
        for column in &summary.missing_columns {
            println!("    - {}", column);
        }
    }

    if !summary.cleaning_actions.is_empty() {
        println!("\n  Cleaning:");
        for action in &summary.cleaning_actions {
            println!("    - {}", action);
        }
    }
}

fn run_report(args: ReportArgs) -> Result<()> {
    let mut builder = ReportConfig::builder();
    if let Some(database) = args.database {
        builder = builder.database_path(database);
    }
    let config = builder.with_env_overrides().build()?;

    let today = Local::now().date_naive();
    let year = args.year.unwrap_or_else(|| today.year());
    let month = args.month.unwrap_or_else(|| today.month());

    let report = match build_report(config, year, month) {
        Ok(report) => report,
        Err(e) => {
            // With --json stdout carries the error object instead of the report.
            if args.json {
                println!("{}", serde_json::to_string_pretty(&e)?);
            } else {
                error!("Report failed [{}]: {}", e.error_code(), e);
            }
            return Err(anyhow!("Report failed: {}", e));
        }
    };

    if let Some(path) = &args.output {
        let written = ReportGenerator::new(ReportFormat::Json).write_to_file(&report, path)?;
        info!("Report written to: {}", written.display());
    }

    let format = if args.json {
        ReportFormat::Json
    } else {
        ReportFormat::Text
    };
    ReportGenerator::new(format).write_to(&report, io::stdout().lock())?;

    Ok(())
}

fn build_report(config: ReportConfig, year: i32, month: u32) -> ReportingResult<MetricsReport> {
    let database = config.database_path.clone();
    let store = SalesStore::open_read_only(&database).map_err(|e| {
        e.with_context(format!("Cannot open {}; run `migrate` first", database.display()))
    })?;
    let engine = MetricsEngine::new(&store, config);
    let metrics = DashboardMetrics::compute(&engine, year, month)?;
    info!(
        "Faturamento acumulado {}: {}",
        year,
        format_brl(metrics.billing.year_to_date)
    );

    Ok(MetricsReport::new(&database, metrics))
}
