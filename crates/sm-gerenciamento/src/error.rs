//! Custom error types for the reporting pipeline.
//!
//! This module provides the error hierarchy using `thiserror`. Every stage
//! (ingest, cleaning, storage, metrics) returns [`ReportingError`], so a failed
//! query can never be mistaken for "no matching rows".
//!
//! Errors serialize as `{"code", "message"}`; `report --json` prints that
//! object to stdout when it fails.

use serde::Serialize;
use serde::ser::SerializeStruct;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the reporting pipeline.
#[derive(Error, Debug)]
pub enum ReportingError {
    /// Input file does not exist.
    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// Input file has an extension we cannot ingest.
    #[error("Unsupported input format '{0}' (expected .xlsx, .xlsm, .xls, .ods or .csv)")]
    UnsupportedInput(String),

    /// Requested worksheet is not present in the workbook.
    #[error("Sheet '{sheet}' not found (available: {})", available.join(", "))]
    SheetNotFound {
        sheet: String,
        available: Vec<String>,
    },

    /// CSV export bytes do not match the configured encoding.
    #[error("Invalid text encoding: {0}")]
    InvalidEncoding(String),

    /// Worksheet or CSV export has no header row.
    #[error("Source '{0}' has no header row")]
    EmptySource(String),

    /// Table was not found in the store.
    #[error("Table '{0}' not found in database")]
    TableNotFound(String),

    /// Column was not found in the table or dataset.
    #[error("Column '{column}' not found in '{table}'")]
    ColumnNotFound { table: String, column: String },

    /// Cleaning step failed.
    #[error("Cleaning failed: {0}")]
    CleaningFailed(String),

    /// Year/month pair outside the supported range.
    #[error("Invalid reporting period {year}-{month:02} (month must be 1-12)")]
    InvalidPeriod { year: i32, month: u32 },

    /// Report rendering or writing failed.
    #[error("Failed to generate report: {0}")]
    ReportGenerationFailed(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// SQLite error wrapper.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Workbook reader error wrapper.
    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ReportingError>,
    },
}

impl ReportingError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ReportingError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code, used by the CLI's JSON output.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InputNotFound(_) => "INPUT_NOT_FOUND",
            Self::UnsupportedInput(_) => "UNSUPPORTED_INPUT",
            Self::SheetNotFound { .. } => "SHEET_NOT_FOUND",
            Self::InvalidEncoding(_) => "INVALID_ENCODING",
            Self::EmptySource(_) => "EMPTY_SOURCE",
            Self::TableNotFound(_) => "TABLE_NOT_FOUND",
            Self::ColumnNotFound { .. } => "COLUMN_NOT_FOUND",
            Self::CleaningFailed(_) => "CLEANING_FAILED",
            Self::InvalidPeriod { .. } => "INVALID_PERIOD",
            Self::ReportGenerationFailed(_) => "REPORT_GENERATION_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Sqlite(_) => "SQLITE_ERROR",
            Self::Workbook(_) => "WORKBOOK_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// True when the error points at missing or mismatched input rather than
    /// a failure inside the pipeline (wrong path, wrong sheet, schema drift).
    pub fn is_input_error(&self) -> bool {
        match self {
            Self::InputNotFound(_)
            | Self::UnsupportedInput(_)
            | Self::SheetNotFound { .. }
            | Self::InvalidEncoding(_)
            | Self::EmptySource(_)
            | Self::TableNotFound(_)
            | Self::ColumnNotFound { .. } => true,
            Self::WithContext { source, .. } => source.is_input_error(),
            _ => false,
        }
    }
}

impl Serialize for ReportingError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ReportingError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for reporting operations.
pub type Result<T> = std::result::Result<T, ReportingError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ReportingError::Polars(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, rusqlite::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ReportingError::Sqlite(e).with_context(context))
    }
}
