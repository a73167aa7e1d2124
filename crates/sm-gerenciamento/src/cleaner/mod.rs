//! Cleaning of the raw export before it is persisted.
//!
//! This module provides:
//! - Header trimming (and de-duplication of headers that collide once trimmed)
//! - Date coercion for the configured date columns ([`dates`])
//! - Currency normalization for the amount column ([`currency`])

pub mod currency;
pub mod dates;

pub use currency::{RawAmount, normalize_amount, parse_brl_amount};
pub use dates::{coerce_date_series, parse_date};

use crate::config::ReportConfig;
use crate::ingest::dedupe_headers;
use anyhow::{Context, Result};
use polars::prelude::*;
use tracing::{debug, info, warn};

/// Applies the migration's cleaning steps to a loaded sheet.
#[derive(Debug, Clone)]
pub struct SheetCleaner {
    date_columns: Vec<String>,
    amount_column: String,
}

impl Default for SheetCleaner {
    fn default() -> Self {
        Self::from_config(&ReportConfig::default())
    }
}

impl SheetCleaner {
    /// Create a cleaner for explicit date and amount columns.
    pub fn new<I, S>(date_columns: I, amount_column: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            date_columns: date_columns.into_iter().map(Into::into).collect(),
            amount_column: amount_column.into(),
        }
    }

    /// Create a cleaner using the columns named in `config`.
    pub fn from_config(config: &ReportConfig) -> Self {
        Self::new(config.date_columns.clone(), config.amount_column.clone())
    }

    /// Run every cleaning step.
    ///
    /// Configured columns absent from the frame are skipped with a warning.
    /// Returns the cleaned frame and a human-readable list of actions taken.
    pub fn clean(&self, df: DataFrame) -> Result<(DataFrame, Vec<String>)> {
        let mut actions = Vec::new();

        info!("Cleaning {} rows...", df.height());

        let mut df = trim_headers(df, &mut actions)?;

        for column in &self.date_columns {
            if !has_column(&df, column) {
                warn!("Date column '{}' not found, skipping", column);
                actions.push(format!("Skipped missing date column '{column}'"));
                continue;
            }

            let series = df.column(column)?.as_materialized_series().clone();
            let (coerced, nulled) = coerce_date_series(&series)
                .with_context(|| format!("Failed to coerce dates in '{column}'"))?;
            df.replace(column, coerced)?;

            debug!("Coerced '{}' to datetime ({} unparseable)", column, nulled);
            actions.push(if nulled > 0 {
                format!("Converted '{column}' to dates ({nulled} unparseable values set to null)")
            } else {
                format!("Converted '{column}' to dates")
            });
        }

        if has_column(&df, &self.amount_column) {
            let series = df.column(&self.amount_column)?.as_materialized_series().clone();
            let normalized = normalize_amount_series(&series)?;
            df.replace(&self.amount_column, normalized)?;
            actions.push(format!("Normalized currency values in '{}'", self.amount_column));
        } else {
            warn!("Amount column '{}' not found, skipping", self.amount_column);
            actions.push(format!("Skipped missing amount column '{}'", self.amount_column));
        }

        Ok((df, actions))
    }
}

fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

/// Strip surrounding whitespace from every header.
fn trim_headers(df: DataFrame, actions: &mut Vec<String>) -> Result<DataFrame> {
    let original: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let trimmed = dedupe_headers(original.iter().map(|name| name.trim().to_string()));

    let renamed = original.iter().zip(&trimmed).filter(|(a, b)| a != b).count();
    if renamed == 0 {
        return Ok(df);
    }

    let columns: Vec<Column> = df
        .get_columns()
        .iter()
        .zip(&trimmed)
        .map(|(column, name)| {
            Column::from(
                column
                    .as_materialized_series()
                    .clone()
                    .with_name(name.as_str().into()),
            )
        })
        .collect();

    actions.push(format!("Trimmed whitespace from {renamed} column name(s)"));
    Ok(DataFrame::new(columns)?)
}

/// Normalize an amount column of any dtype to a non-null `Float64` series.
pub fn normalize_amount_series(series: &Series) -> Result<Series> {
    let name = series.name().clone();

    let values: Vec<f64> = match series.dtype() {
        DataType::String => series
            .str()?
            .into_iter()
            .map(|value| normalize_amount(value.map_or(RawAmount::Missing, RawAmount::Text)))
            .collect(),
        dtype if dtype.is_float() || dtype.is_integer() => series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|value| normalize_amount(value.into()))
            .collect(),
        _ => {
            let as_text = series.cast(&DataType::String)?;
            as_text
                .str()?
                .into_iter()
                .map(|value| normalize_amount(value.map_or(RawAmount::Missing, RawAmount::Text)))
                .collect()
        }
    };

    Ok(Series::new(name, values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{BILLING_DATE, TOTAL_AMOUNT};

    fn sample_frame() -> DataFrame {
        df! {
            " DATA (FATURAMENTO) " => [Some("15/01/2024"), Some("lixo"), None],
            "VALOR - VENDA (TOTAL) DESC." => [Some("R$ 1.234,56"), Some("-"), None],
            "CLIENTE (NOME)" => ["ACME", "Globex", "Initech"],
        }
        .unwrap()
    }

    #[test]
    fn test_trim_headers() {
        let mut actions = Vec::new();
        let df = trim_headers(sample_frame(), &mut actions).unwrap();

        assert!(has_column(&df, BILLING_DATE));
        assert_eq!(actions.len(), 1);
    }

    #[test]
    fn test_trim_headers_noop() {
        let df = df! { "EMISSOR" => ["x"] }.unwrap();
        let mut actions = Vec::new();
        trim_headers(df, &mut actions).unwrap();
        assert!(actions.is_empty());
    }

    #[test]
    fn test_clean_converts_dates_and_amounts() {
        let cleaner = SheetCleaner::new([BILLING_DATE], TOTAL_AMOUNT);
        let (df, actions) = cleaner.clean(sample_frame()).unwrap();

        let dates = df.column(BILLING_DATE).unwrap();
        assert_eq!(
            dates.dtype(),
            &DataType::Datetime(TimeUnit::Milliseconds, None)
        );
        assert_eq!(dates.null_count(), 2);

        let amounts = df.column(TOTAL_AMOUNT).unwrap().as_materialized_series().clone();
        let amounts: Vec<Option<f64>> = amounts.f64().unwrap().into_iter().collect();
        assert_eq!(amounts, vec![Some(1234.56), Some(0.0), Some(0.0)]);

        assert!(actions.iter().any(|a| a.contains("1 unparseable")));
    }

    #[test]
    fn test_clean_skips_missing_columns() {
        let df = df! { "EMISSOR" => ["x", "y"] }.unwrap();
        let (cleaned, actions) = SheetCleaner::default().clean(df).unwrap();

        assert_eq!(cleaned.width(), 1);
        // five date columns plus the amount column
        assert_eq!(actions.iter().filter(|a| a.starts_with("Skipped")).count(), 6);
    }

    #[test]
    fn test_normalize_numeric_amounts() {
        let series = Series::new(TOTAL_AMOUNT.into(), vec![Some(10i64), None]);
        let normalized = normalize_amount_series(&series).unwrap();
        assert_eq!(normalized.dtype(), &DataType::Float64);
        assert_eq!(normalized.f64().unwrap().get(0), Some(10.0));
        assert_eq!(normalized.f64().unwrap().get(1), Some(0.0));
    }
}
