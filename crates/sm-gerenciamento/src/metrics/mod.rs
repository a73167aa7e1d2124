//! Monthly and annual aggregates over the sales table.
//!
//! Every query filters by year in SQLite (`strftime('%Y', ...)`) and buckets
//! by month in Rust, so a date that SQLite cannot read is simply not counted.
//! Query failures are returned as errors, never as empty results.
//!
//! # Example
//!
//! ```rust,no_run
//! use sm_gerenciamento::config::ReportConfig;
//! use sm_gerenciamento::metrics::MetricsEngine;
//! use sm_gerenciamento::store::SalesStore;
//! use std::path::Path;
//!
//! let store = SalesStore::open_read_only(Path::new("gerenciamento.db"))?;
//! let engine = MetricsEngine::new(&store, ReportConfig::default());
//! let billing = engine.billing_monthly(2025)?;
//! println!("Faturamento JAN: {}", billing.get(1));
//! # Ok::<(), sm_gerenciamento::ReportingError>(())
//! ```

mod dashboard;
mod monthly;

pub use dashboard::{DashboardMetrics, PeriodTotals, Variation, VariationClass};
pub use monthly::{MONTH_LABELS, MonthlySeries, month_label};

use crate::config::ReportConfig;
use crate::error::{ReportingError, Result};
use crate::schema::{
    BILLING_DATE, BM_RELEASE_DATE, PO_RECEIPT_DATE, REPORTS_SENT_DATE, SERVICE_END_DATE,
    quote_ident,
};
use crate::store::{DatedAmount, SalesStore, table_ident};
use chrono::Datelike;
use rusqlite::types::Value;
use serde::Serialize;
use tracing::debug;

/// Kind of backlog tracked by [`MetricsEngine::pending`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingKind {
    /// Reports sent, BM not yet released.
    Bm,
    /// Service finished, reports not yet sent.
    Report,
}

impl PendingKind {
    /// Date that must be present.
    pub fn reference_column(&self) -> &'static str {
        match self {
            Self::Bm => REPORTS_SENT_DATE,
            Self::Report => SERVICE_END_DATE,
        }
    }

    /// Date whose absence makes the record pending.
    pub fn dependent_column(&self) -> &'static str {
        match self {
            Self::Bm => BM_RELEASE_DATE,
            Self::Report => REPORTS_SENT_DATE,
        }
    }
}

/// Backlog of one [`PendingKind`] for a year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingSummary {
    pub kind: PendingKind,
    /// Pending records with reference month up to the limit.
    pub count: u64,
    /// Sum of their amounts.
    pub amount: f64,
    /// Pending records per reference month, whole year.
    pub monthly_counts: MonthlySeries<u64>,
}

impl PendingSummary {
    fn empty(kind: PendingKind) -> Self {
        Self {
            kind,
            count: 0,
            amount: 0.0,
            monthly_counts: MonthlySeries::new(),
        }
    }
}

/// Runs the aggregation queries against a [`SalesStore`].
pub struct MetricsEngine<'a> {
    store: &'a SalesStore,
    config: ReportConfig,
}

impl<'a> MetricsEngine<'a> {
    pub fn new(store: &'a SalesStore, config: ReportConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Billed revenue (faturamento) per billing month of `year`.
    ///
    /// Only records whose status is one of the configured billed statuses
    /// count, unless that list is empty.
    pub fn billing_monthly(&self, year: i32) -> Result<MonthlySeries<f64>> {
        let statuses = &self.config.billed_statuses;
        let mut required = vec![BILLING_DATE, self.config.amount_column.as_str()];
        if !statuses.is_empty() {
            required.push(self.config.status_column.as_str());
        }
        self.store.require_columns(&self.config.table_name, &required)?;

        let mut sql = format!(
            "SELECT {date}, {amount} FROM {table} WHERE strftime('%Y', {date}) = ?1",
            date = quote_ident(BILLING_DATE),
            amount = quote_ident(&self.config.amount_column),
            table = table_ident(&self.config.table_name),
        );
        let mut params = vec![Value::Text(year.to_string())];

        if !statuses.is_empty() {
            let placeholders: Vec<String> = (0..statuses.len())
                .map(|i| format!("?{}", i + 2))
                .collect();
            sql.push_str(&format!(
                " AND {} IN ({})",
                quote_ident(&self.config.status_column),
                placeholders.join(", ")
            ));
            params.extend(statuses.iter().map(|s| Value::Text(s.clone())));
        }

        let rows = self.store.query_dated_amounts(&sql, &params)?;
        debug!("Billing {}: {} rows", year, rows.len());
        Ok(sum_by_month(&rows))
    }

    /// Booked sales (vendas) per purchase-order month of `year`. No status
    /// filter.
    pub fn sales_monthly(&self, year: i32) -> Result<MonthlySeries<f64>> {
        self.store.require_columns(
            &self.config.table_name,
            &[PO_RECEIPT_DATE, self.config.amount_column.as_str()],
        )?;

        let sql = format!(
            "SELECT {date}, {amount} FROM {table} WHERE strftime('%Y', {date}) = ?1",
            date = quote_ident(PO_RECEIPT_DATE),
            amount = quote_ident(&self.config.amount_column),
            table = table_ident(&self.config.table_name),
        );
        let rows = self
            .store
            .query_dated_amounts(&sql, &[Value::Text(year.to_string())])?;
        debug!("Sales {}: {} rows", year, rows.len());
        Ok(sum_by_month(&rows))
    }

    /// Pending BMs or reports whose reference date falls in `year`.
    ///
    /// `count` and `amount` cover reference months `1..=month_limit`;
    /// `monthly_counts` covers the whole year. A limit of `0` returns zeros
    /// without touching the database.
    pub fn pending(&self, kind: PendingKind, year: i32, month_limit: u32) -> Result<PendingSummary> {
        if month_limit == 0 {
            return Ok(PendingSummary::empty(kind));
        }
        if month_limit > 12 {
            return Err(ReportingError::InvalidPeriod {
                year,
                month: month_limit,
            });
        }

        let reference = kind.reference_column();
        let dependent = kind.dependent_column();
        self.store.require_columns(
            &self.config.table_name,
            &[reference, dependent, self.config.amount_column.as_str()],
        )?;

        let sql = format!(
            "SELECT {reference}, {amount} FROM {table} \
             WHERE ({reference} IS NOT NULL AND {reference} != '') \
             AND ({dependent} IS NULL OR {dependent} = '') \
             AND strftime('%Y', {reference}) = ?1",
            reference = quote_ident(reference),
            dependent = quote_ident(dependent),
            amount = quote_ident(&self.config.amount_column),
            table = table_ident(&self.config.table_name),
        );
        let rows = self
            .store
            .query_dated_amounts(&sql, &[Value::Text(year.to_string())])?;

        let mut summary = PendingSummary::empty(kind);
        for row in &rows {
            let Some(date) = row.date else { continue };
            let month = date.month();
            summary.monthly_counts.add(month, 1);
            if month <= month_limit {
                summary.count += 1;
                summary.amount += row.amount;
            }
        }

        debug!(
            "Pending {:?} {} (through month {}): {} records",
            kind, year, month_limit, summary.count
        );
        Ok(summary)
    }
}

/// Sum amounts per month, skipping rows without a readable date.
fn sum_by_month(rows: &[DatedAmount]) -> MonthlySeries<f64> {
    let mut series = MonthlySeries::new();
    for row in rows {
        if let Some(date) = row.date {
            series.add(date.month(), row.amount);
        }
    }
    series
}
