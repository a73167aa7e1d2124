//! SM Gerenciamento reporting library
//!
//! Migrates the "SM Gerenciamento" sales spreadsheet (an Excel workbook or its
//! CSV export) into a SQLite table and computes the dashboard KPIs from it.
//!
//! # Overview
//!
//! - **Ingest**: read the `Gerenciamento` worksheet or a Latin-1 CSV export
//! - **Cleaning**: trim headers, coerce the five date columns, normalize
//!   Brazilian currency text into plain numbers
//! - **Store**: rewrite table `Vendas` in a single transaction
//! - **Metrics**: monthly billing and sales, year-to-date totals, monthly
//!   averages, year-over-year variation and pending BM/report backlogs
//! - **Reporting**: text summary or JSON, amounts formatted as `R$ 1.234,56`
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use sm_gerenciamento::{DashboardMetrics, MetricsEngine, Migration, ReportConfig, SalesStore};
//!
//! let config = ReportConfig::builder()
//!     .workbook_path("SM_Gerenciamento.xlsx")
//!     .database_path("gerenciamento.db")
//!     .build()?;
//!
//! // Excel -> SQLite
//! let summary = Migration::builder().config(config.clone()).build()?.run()?;
//! println!("{} rows migrated", summary.rows);
//!
//! // SQLite -> KPIs
//! let store = SalesStore::open_read_only(&config.database_path)?;
//! let engine = MetricsEngine::new(&store, config);
//! let metrics = DashboardMetrics::compute(&engine, 2025, 6)?;
//! println!("Variação: {:.2}%", metrics.billing.variation.percent);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cleaner;
pub mod config;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod pipeline;
pub mod reporting;
pub mod schema;
pub mod store;

// Re-exports for convenient access
pub use cleaner::{SheetCleaner, parse_brl_amount, parse_date};
pub use config::{ConfigValidationError, CsvEncoding, ReportConfig, ReportConfigBuilder};
pub use error::{ReportingError, Result, ResultExt};
pub use metrics::{
    DashboardMetrics, MetricsEngine, MonthlySeries, PendingKind, PendingSummary, PeriodTotals,
    Variation, VariationClass,
};
pub use pipeline::{
    ClosureProgressReporter, Migration, MigrationBuilder, MigrationStage, MigrationSummary,
    ProgressReporter, ProgressUpdate,
};
pub use reporting::{MetricsReport, ReportFormat, ReportGenerator, format_brl, format_variation};
pub use store::SalesStore;
