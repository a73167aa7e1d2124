//! Loading the management export into a polars `DataFrame`.
//!
//! Two sources are supported:
//! - the `.xlsx` workbook (sheet selected by exact name), via calamine
//! - the CSV export of the same sheet, via the polars CSV reader
//!
//! [`load_source`] picks the reader from the file extension.

mod csv;
mod workbook;

pub use csv::read_csv_export;
pub use workbook::read_workbook;

use crate::config::ReportConfig;
use crate::error::{ReportingError, Result};
use crate::schema;
use polars::prelude::*;
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

/// Kind of input file, decided by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Workbook,
    Csv,
}

impl SourceFormat {
    /// Detect the format of `path` from its extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(Self::Workbook),
            "csv" => Ok(Self::Csv),
            _ => Err(ReportingError::UnsupportedInput(path.display().to_string())),
        }
    }
}

/// Load the configured input file.
///
/// Logs the shape of the loaded frame and warns about expected headers that
/// are missing from it.
pub fn load_source(config: &ReportConfig) -> Result<DataFrame> {
    let path = config.workbook_path.as_path();
    if !path.exists() {
        return Err(ReportingError::InputNotFound(path.to_path_buf()));
    }

    let df = match SourceFormat::from_path(path)? {
        SourceFormat::Workbook => read_workbook(path, &config.sheet_name)?,
        SourceFormat::Csv => read_csv_export(path, config.csv_encoding)?,
    };

    info!(
        "Loaded {} rows x {} columns from {}",
        df.height(),
        df.width(),
        path.display()
    );

    let headers: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.trim().to_string())
        .collect();
    let missing = schema::missing_columns(&headers);
    if !missing.is_empty() {
        warn!(
            "{} expected column(s) missing from the export: {:?}",
            missing.len(),
            missing
        );
    }

    Ok(df)
}

/// Make header names unique and non-empty.
///
/// Blank headers become `Unnamed: {index}`; repeated headers get a `.1`,
/// `.2`, ... suffix in order of appearance.
pub(crate) fn dedupe_headers<I, S>(headers: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    let mut result = Vec::new();

    for (idx, header) in headers.into_iter().enumerate() {
        let header: String = header.into();
        let base = if header.trim().is_empty() {
            format!("Unnamed: {idx}")
        } else {
            header
        };

        let mut candidate = base.clone();
        let mut suffix = 1;
        while !seen.insert(candidate.clone()) {
            candidate = format!("{base}.{suffix}");
            suffix += 1;
        }
        result.push(candidate);
    }

    result
}
