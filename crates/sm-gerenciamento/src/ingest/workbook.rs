//! Workbook reader built on calamine.

use super::dedupe_headers;
use crate::cleaner::dates::{excel_serial_to_datetime, SQL_TIMESTAMP_FORMAT};
use crate::error::{ReportingError, Result};
use calamine::{Data, Reader, open_workbook_auto};
use polars::prelude::*;
use std::path::Path;
use tracing::debug;

/// A single cell, reduced to what column inference needs.
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Empty,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    fn from_data(data: &Data) -> Self {
        match data {
            Data::Empty | Data::Error(_) => Cell::Empty,
            Data::Int(n) => Cell::Int(*n),
            Data::Float(n) => Cell::Float(*n),
            Data::Bool(b) => Cell::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
            Data::String(s) if s.trim().is_empty() => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            // Date cells go through as text so the date cleaner sees one format.
            Data::DateTime(dt) => excel_serial_to_datetime(dt.as_f64())
                .map(|d| Cell::Text(d.format(SQL_TIMESTAMP_FORMAT).to_string()))
                .unwrap_or(Cell::Empty),
            Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        }
    }

    fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Int(n) => Some(n.to_string()),
            Cell::Float(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{}", *n as i64)),
            Cell::Float(n) => Some(n.to_string()),
            Cell::Text(s) => Some(s.clone()),
        }
    }

    fn is_integral(&self) -> bool {
        match self {
            Cell::Int(_) => true,
            Cell::Float(n) => n.fract() == 0.0 && n.abs() < 9.0e15,
            _ => false,
        }
    }
}

/// Read `sheet` from the workbook at `path`.
///
/// The first row is the header. Each column becomes `Int64` when every
/// populated cell is a whole number, `Float64` when every populated cell is
/// numeric, and `String` otherwise. Rows with no populated cell are skipped.
pub fn read_workbook(path: &Path, sheet: &str) -> Result<DataFrame> {
    let mut workbook = open_workbook_auto(path)?;

    let available = workbook.sheet_names();
    if !available.iter().any(|name| name == sheet) {
        return Err(ReportingError::SheetNotFound {
            sheet: sheet.to_string(),
            available,
        });
    }

    let range = workbook.worksheet_range(sheet)?;
    let mut rows = range.rows();

    let header_row = rows
        .next()
        .ok_or_else(|| ReportingError::EmptySource(format!("{}:{}", path.display(), sheet)))?;
    let headers = dedupe_headers(
        header_row
            .iter()
            .map(|data| Cell::from_data(data).as_text().unwrap_or_default()),
    );

    let mut columns: Vec<Vec<Cell>> = vec![Vec::new(); headers.len()];
    let mut skipped = 0usize;
    for row in rows {
        let cells: Vec<Cell> = row.iter().map(Cell::from_data).collect();
        if cells.iter().all(|c| *c == Cell::Empty) {
            skipped += 1;
            continue;
        }
        for (idx, column) in columns.iter_mut().enumerate() {
            column.push(cells.get(idx).cloned().unwrap_or(Cell::Empty));
        }
    }

    if skipped > 0 {
        debug!("Skipped {} empty rows in sheet '{}'", skipped, sheet);
    }

    let series: Vec<Column> = headers
        .iter()
        .zip(columns)
        .map(|(name, cells)| Column::from(build_series(name, &cells)))
        .collect();

    Ok(DataFrame::new(series)?)
}

/// Build a typed series from one column of cells.
fn build_series(name: &str, cells: &[Cell]) -> Series {
    let populated: Vec<&Cell> = cells.iter().filter(|c| **c != Cell::Empty).collect();
    let all_numeric = !populated.is_empty()
        && populated
            .iter()
            .all(|c| matches!(c, Cell::Int(_) | Cell::Float(_)));

    if all_numeric && populated.iter().all(|c| c.is_integral()) {
        let values: Vec<Option<i64>> = cells
            .iter()
            .map(|c| match c {
                Cell::Int(n) => Some(*n),
                Cell::Float(n) => Some(*n as i64),
                _ => None,
            })
            .collect();
        return Series::new(name.into(), values);
    }

    if all_numeric {
        let values: Vec<Option<f64>> = cells
            .iter()
            .map(|c| match c {
                Cell::Int(n) => Some(*n as f64),
                Cell::Float(n) => Some(*n),
                _ => None,
            })
            .collect();
        return Series::new(name.into(), values);
    }

    let values: Vec<Option<String>> = cells.iter().map(Cell::as_text).collect();
    Series::new(name.into(), values)
}
