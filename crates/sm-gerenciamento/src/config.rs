//! Configuration types for migration and reporting.
//!
//! Defaults mirror the fixed layout of the "SM Gerenciamento" export. Use
//! [`ReportConfig::builder()`] to override paths or column names, and
//! [`ReportConfigBuilder::with_env_overrides`] to honor `SM_*` variables.

use crate::schema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// Default SQLite database file.
pub const DEFAULT_DATABASE: &str = "gerenciamento.db";

/// Default workbook exported by the management spreadsheet.
pub const DEFAULT_WORKBOOK: &str = "SM_Gerenciamento_19_20 (6).xlsx";

/// Environment variable overriding the database path.
pub const ENV_DATABASE: &str = "SM_DATABASE";
/// Environment variable overriding the workbook path.
pub const ENV_WORKBOOK: &str = "SM_WORKBOOK";
/// Environment variable overriding the sheet name.
pub const ENV_SHEET: &str = "SM_SHEET";

/// Text encoding of a CSV export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CsvEncoding {
    /// ISO-8859-1, what the spreadsheet's "save as CSV" produces.
    #[default]
    Latin1,
    /// UTF-8 (a leading BOM is tolerated).
    Utf8,
}

/// Configuration shared by the migration pipeline and the metrics layer.
///
/// # Example
///
/// ```rust
/// use sm_gerenciamento::config::ReportConfig;
///
/// let config = ReportConfig::builder()
///     .database_path("/tmp/vendas.db")
///     .sheet_name("Gerenciamento")
///     .build()
///     .unwrap();
/// assert_eq!(config.table_name, "Vendas");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// SQLite database file.
    /// Default: "gerenciamento.db"
    pub database_path: PathBuf,

    /// Source workbook (`.xlsx`) or CSV export.
    pub workbook_path: PathBuf,

    /// Worksheet to read from the workbook.
    /// Default: "Gerenciamento"
    pub sheet_name: String,

    /// Table rebuilt by the migration.
    /// Default: "Vendas"
    pub table_name: String,

    /// Columns coerced to timestamps.
    pub date_columns: Vec<String>,

    /// Currency column normalized to a float and summed by every metric.
    pub amount_column: String,

    /// Service status column.
    pub status_column: String,

    /// Statuses that count as billed revenue. Empty disables the filter.
    pub billed_statuses: Vec<String>,

    /// Encoding used when the input is a CSV export.
    /// Default: Latin1
    pub csv_encoding: CsvEncoding,

    /// Delete the database file before migrating.
    /// Default: true
    pub recreate_database: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE),
            workbook_path: PathBuf::from(DEFAULT_WORKBOOK),
            sheet_name: schema::DEFAULT_SHEET.to_string(),
            table_name: schema::SALES_TABLE.to_string(),
            date_columns: to_strings(&schema::DATE_COLUMNS),
            amount_column: schema::TOTAL_AMOUNT.to_string(),
            status_column: schema::STATUS.to_string(),
            billed_statuses: to_strings(&schema::BILLED_STATUSES),
            csv_encoding: CsvEncoding::default(),
            recreate_database: true,
        }
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl ReportConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ReportConfigBuilder {
        ReportConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let required = [
            ("sheet_name", self.sheet_name.as_str()),
            ("table_name", self.table_name.as_str()),
            ("amount_column", self.amount_column.as_str()),
            ("status_column", self.status_column.as_str()),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigValidationError::EmptyValue(field));
            }
        }

        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigValidationError::EmptyValue("database_path"));
        }

        let mut seen = HashSet::new();
        for column in &self.date_columns {
            if !seen.insert(column.as_str()) {
                return Err(ConfigValidationError::DuplicateDateColumn(column.clone()));
            }
        }

        if seen.contains(self.amount_column.as_str()) {
            return Err(ConfigValidationError::AmountIsDateColumn(
                self.amount_column.clone(),
            ));
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("'{0}' must not be empty")]
    EmptyValue(&'static str),

    #[error("Date column '{0}' listed more than once")]
    DuplicateDateColumn(String),

    #[error("Amount column '{0}' is also configured as a date column")]
    AmountIsDateColumn(String),
}

/// Builder for [`ReportConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct ReportConfigBuilder {
    database_path: Option<PathBuf>,
    workbook_path: Option<PathBuf>,
    sheet_name: Option<String>,
    table_name: Option<String>,
    date_columns: Option<Vec<String>>,
    amount_column: Option<String>,
    status_column: Option<String>,
    billed_statuses: Option<Vec<String>>,
    csv_encoding: Option<CsvEncoding>,
    recreate_database: Option<bool>,
}

impl ReportConfigBuilder {
    /// Set the SQLite database file.
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Set the workbook or CSV export to migrate.
    pub fn workbook_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.workbook_path = Some(path.into());
        self
    }

    /// Set the worksheet name.
    pub fn sheet_name(mut self, name: impl Into<String>) -> Self {
        self.sheet_name = Some(name.into());
        self
    }

    /// Set the destination table.
    pub fn table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = Some(name.into());
        self
    }

    /// Replace the list of date columns.
    pub fn date_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.date_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Set the amount column.
    pub fn amount_column(mut self, column: impl Into<String>) -> Self {
        self.amount_column = Some(column.into());
        self
    }

    /// Set the status column.
    pub fn status_column(mut self, column: impl Into<String>) -> Self {
        self.status_column = Some(column.into());
        self
    }

    /// Replace the billed statuses.
    ///
    /// An empty list makes billing totals ignore the status column.
    pub fn billed_statuses<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.billed_statuses = Some(statuses.into_iter().map(Into::into).collect());
        self
    }

    /// Set the CSV encoding.
    pub fn csv_encoding(mut self, encoding: CsvEncoding) -> Self {
        self.csv_encoding = Some(encoding);
        self
    }

    /// Keep or delete an existing database file before migrating.
    pub fn recreate_database(mut self, recreate: bool) -> Self {
        self.recreate_database = Some(recreate);
        self
    }

    /// Apply `SM_DATABASE`, `SM_WORKBOOK` and `SM_SHEET` from the process
    /// environment. Values already set on the builder win.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Same as [`with_env_overrides`](Self::with_env_overrides) with a custom
    /// lookup.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if self.database_path.is_none() {
            self.database_path = non_empty(ENV_DATABASE).map(PathBuf::from);
        }
        if self.workbook_path.is_none() {
            self.workbook_path = non_empty(ENV_WORKBOOK).map(PathBuf::from);
        }
        if self.sheet_name.is_none() {
            self.sheet_name = non_empty(ENV_SHEET);
        }
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `ReportConfig` or an error if validation fails.
    pub fn build(self) -> Result<ReportConfig, ConfigValidationError> {
        let defaults = ReportConfig::default();
        let config = ReportConfig {
            database_path: self.database_path.unwrap_or(defaults.database_path),
            workbook_path: self.workbook_path.unwrap_or(defaults.workbook_path),
            sheet_name: self.sheet_name.unwrap_or(defaults.sheet_name),
            table_name: self.table_name.unwrap_or(defaults.table_name),
            date_columns: self.date_columns.unwrap_or(defaults.date_columns),
            amount_column: self.amount_column.unwrap_or(defaults.amount_column),
            status_column: self.status_column.unwrap_or(defaults.status_column),
            billed_statuses: self.billed_statuses.unwrap_or(defaults.billed_statuses),
            csv_encoding: self.csv_encoding.unwrap_or(defaults.csv_encoding),
            recreate_database: self.recreate_database.unwrap_or(defaults.recreate_database),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReportConfig::default();
        assert_eq!(config.database_path, PathBuf::from("gerenciamento.db"));
        assert_eq!(config.sheet_name, "Gerenciamento");
        assert_eq!(config.table_name, "Vendas");
        assert_eq!(config.amount_column, "VALOR - VENDA (TOTAL) DESC.");
        assert_eq!(config.date_columns.len(), 5);
        assert_eq!(config.billed_statuses, vec!["Finalizado", "Finalizado Com Faturamento"]);
        assert_eq!(config.csv_encoding, CsvEncoding::Latin1);
        assert!(config.recreate_database);
    }

    #[test]
    fn test_builder_defaults() {
        let config = ReportConfig::builder().build().unwrap();
        assert_eq!(config.table_name, "Vendas");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_custom_values() {
        let config = ReportConfig::builder()
            .database_path("out/teste.db")
            .sheet_name("Plan1")
            .billed_statuses(Vec::<String>::new())
            .csv_encoding(CsvEncoding::Utf8)
            .recreate_database(false)
            .build()
            .unwrap();

        assert_eq!(config.database_path, PathBuf::from("out/teste.db"));
        assert_eq!(config.sheet_name, "Plan1");
        assert!(config.billed_statuses.is_empty());
        assert_eq!(config.csv_encoding, CsvEncoding::Utf8);
        assert!(!config.recreate_database);
    }

    #[test]
    fn test_validation_empty_sheet() {
        let result = ReportConfig::builder().sheet_name("  ").build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::EmptyValue("sheet_name")
        ));
    }

    #[test]
    fn test_validation_duplicate_date_column() {
        let result = ReportConfig::builder()
            .date_columns(["DATA (FATURAMENTO)", "DATA (FATURAMENTO)"])
            .build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::DuplicateDateColumn(_)
        ));
    }

    #[test]
    fn test_validation_amount_is_date_column() {
        let result = ReportConfig::builder()
            .amount_column("DATA (FATURAMENTO)")
            .build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::AmountIsDateColumn(_)
        ));
    }

    #[test]
    fn test_env_overrides() {
        let config = ReportConfig::builder()
            .with_overrides_from(|key| match key {
                ENV_DATABASE => Some("/data/sm.db".to_string()),
                ENV_SHEET => Some("".to_string()),
                _ => None,
            })
            .build()
            .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/data/sm.db"));
        assert_eq!(config.sheet_name, "Gerenciamento");
        assert_eq!(config.workbook_path, PathBuf::from(DEFAULT_WORKBOOK));
    }

    #[test]
    fn test_explicit_values_beat_env() {
        let config = ReportConfig::builder()
            .database_path("cli.db")
            .with_overrides_from(|_| Some("env.db".to_string()))
            .build()
            .unwrap();

        assert_eq!(config.database_path, PathBuf::from("cli.db"));
        assert_eq!(config.workbook_path, PathBuf::from("env.db"));
    }

    #[test]
    fn test_config_serialization() {
        let config = ReportConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: ReportConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(config.table_name, deserialized.table_name);
        assert_eq!(config.csv_encoding, deserialized.csv_encoding);
        assert_eq!(config.date_columns, deserialized.date_columns);
    }
}
