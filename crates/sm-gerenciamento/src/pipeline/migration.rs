//! Excel/CSV → SQLite migration.
//!
//! [`Migration`] loads the export, cleans it with [`SheetCleaner`] and
//! rewrites the sales table in one transaction.

use crate::cleaner::SheetCleaner;
use crate::config::{ConfigValidationError, ReportConfig};
use crate::error::{ReportingError, Result};
use crate::ingest::load_source;
use crate::pipeline::progress::{
    ClosureProgressReporter, MigrationStage, ProgressReporter, ProgressUpdate,
};
use crate::schema;
use crate::store::SalesStore;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Outcome of a successful migration.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationSummary {
    pub source: String,
    pub database: String,
    pub table: String,
    pub rows: usize,
    pub columns: usize,
    /// Human-readable cleaning steps, in order
    pub cleaning_actions: Vec<String>,
    /// Expected headers absent from the export
    pub missing_columns: Vec<String>,
    pub duration_ms: u64,
}

/// A configured migration run.
///
/// # Example
///
/// ```rust,no_run
/// use sm_gerenciamento::{Migration, ReportConfig};
///
/// let summary = Migration::builder()
///     .config(ReportConfig::default())
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .run()?;
///
/// println!("{} rows written to {}", summary.rows, summary.database);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Migration {
    config: ReportConfig,
    cleaner: SheetCleaner,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(Migration: Send);

impl Migration {
    pub fn builder() -> MigrationBuilder {
        MigrationBuilder::default()
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Load, clean and persist the configured export.
    ///
    /// Reports `Complete` or `Failed` as the final progress update.
    pub fn run(&self) -> Result<MigrationSummary> {
        match self.run_internal() {
            Ok(summary) => {
                self.report_progress(ProgressUpdate::complete(format!(
                    "Migrated {} rows into '{}'",
                    summary.rows, summary.table
                )));
                Ok(summary)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Migration error: {}", e);
                Err(e)
            }
        }
    }

    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn run_internal(&self) -> Result<MigrationSummary> {
        let start_time = Instant::now();
        let config = &self.config;

        // Stage 1: load
        info!("Starting migration from {}", config.workbook_path.display());
        self.report_progress(ProgressUpdate::new(
            MigrationStage::Loading,
            0.0,
            format!("Reading {}", config.workbook_path.display()),
        ));
        let raw = load_source(config)?;
        if raw.height() == 0 {
            warn!("Source has a header row but no data rows");
        }

        let headers: Vec<String> = raw
            .get_column_names()
            .iter()
            .map(|name| name.trim().to_string())
            .collect();
        let missing_columns: Vec<String> = schema::missing_columns(&headers)
            .into_iter()
            .map(str::to_string)
            .collect();

        // Stage 2: clean
        self.report_progress(ProgressUpdate::new(
            MigrationStage::Cleaning,
            0.0,
            format!("Cleaning {} rows", raw.height()),
        ));
        let (cleaned, cleaning_actions) = self
            .cleaner
            .clean(raw)
            .map_err(|e| ReportingError::CleaningFailed(e.to_string()))?;
        self.report_progress(ProgressUpdate::new(
            MigrationStage::Cleaning,
            1.0,
            format!("{} cleaning step(s) applied", cleaning_actions.len()),
        ));

        // Stage 3: persist
        self.report_progress(ProgressUpdate::new(
            MigrationStage::Persisting,
            0.0,
            format!("Writing table '{}'", config.table_name),
        ));
        let mut store = if config.recreate_database {
            SalesStore::recreate(&config.database_path)?
        } else {
            SalesStore::open(&config.database_path)?
        };
        let rows = store.replace_table(&config.table_name, &cleaned)?;

        let duration_ms = start_time.elapsed().as_millis() as u64;
        info!(
            "Migration finished: {} rows x {} columns in {} ms",
            rows,
            cleaned.width(),
            duration_ms
        );

        Ok(MigrationSummary {
            source: config.workbook_path.display().to_string(),
            database: config.database_path.display().to_string(),
            table: config.table_name.clone(),
            rows,
            columns: cleaned.width(),
            cleaning_actions,
            missing_columns,
            duration_ms,
        })
    }
}

/// Builder for [`Migration`].
#[derive(Default)]
pub struct MigrationBuilder {
    config: Option<ReportConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(MigrationBuilder: Send);

impl MigrationBuilder {
    pub fn config(mut self, config: ReportConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving updates during the run.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// Shorthand for [`progress_reporter`](Self::progress_reporter) with a
    /// [`ClosureProgressReporter`].
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the migration. Fails if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Migration, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Migration {
            cleaner: SheetCleaner::from_config(&config),
            config,
            progress_reporter: self.progress_reporter,
        })
    }
}
