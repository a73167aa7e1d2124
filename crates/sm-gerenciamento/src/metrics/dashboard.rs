//! Dashboard KPIs: year-to-date totals, averages and year-over-year variation.
//!
//! The comparison window ends one month before the reporting month, so a
//! month still in progress never skews the average or the variation.

use super::{MetricsEngine, MonthlySeries, PendingKind, PendingSummary};
use crate::error::{ReportingError, Result};
use serde::Serialize;
use tracing::info;

/// Sign of a year-over-year variation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VariationClass {
    Positive,
    Negative,
}

/// Year-over-year change, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Variation {
    pub percent: f64,
    pub class: VariationClass,
}

impl Variation {
    /// `(current - previous) / previous * 100`, or `0` when `previous` is not
    /// positive. Zero counts as positive.
    pub fn between(current: f64, previous: f64) -> Self {
        let percent = if previous > 0.0 {
            (current - previous) / previous * 100.0
        } else {
            0.0
        };
        let class = if percent >= 0.0 {
            VariationClass::Positive
        } else {
            VariationClass::Negative
        };
        Self { percent, class }
    }
}

/// Totals for one measure (billing or sales).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodTotals {
    /// Current year, all twelve months.
    pub monthly: MonthlySeries<f64>,
    /// Previous year, all twelve months.
    pub previous_year_monthly: MonthlySeries<f64>,
    /// Current year through the reporting month.
    pub year_to_date: f64,
    /// Current year through the comparison month.
    pub comparison_total: f64,
    /// Previous year through the comparison month.
    pub previous_year_comparison_total: f64,
    /// `comparison_total` per comparison month; `0` when there is none.
    pub monthly_average: f64,
    pub variation: Variation,
}

impl PeriodTotals {
    pub fn from_series(
        monthly: MonthlySeries<f64>,
        previous_year_monthly: MonthlySeries<f64>,
        month: u32,
    ) -> Self {
        let comparison_month = month.saturating_sub(1);
        let comparison_total = monthly.total_through(comparison_month);
        let previous_year_comparison_total = previous_year_monthly.total_through(comparison_month);
        let monthly_average = if comparison_month > 0 {
            comparison_total / comparison_month as f64
        } else {
            0.0
        };

        Self {
            year_to_date: monthly.total_through(month),
            comparison_total,
            previous_year_comparison_total,
            monthly_average,
            variation: Variation::between(comparison_total, previous_year_comparison_total),
            monthly,
            previous_year_monthly,
        }
    }
}

/// Everything the dashboard shows for one reporting month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardMetrics {
    pub year: i32,
    pub month: u32,
    /// Last complete month used for averages and comparisons.
    pub comparison_month: u32,
    pub previous_year: i32,
    pub billing: PeriodTotals,
    pub sales: PeriodTotals,
    /// Pending BMs through the reporting month.
    pub pending_bm: PendingSummary,
    /// Pending reports through the reporting month.
    pub pending_reports: PendingSummary,
}

impl DashboardMetrics {
    /// Compute every KPI for `month` (1-12) of `year`.
    pub fn compute(engine: &MetricsEngine<'_>, year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(ReportingError::InvalidPeriod { year, month });
        }
        let previous_year = year - 1;

        info!("Computing dashboard metrics for {}-{:02}", year, month);

        let billing = PeriodTotals::from_series(
            engine.billing_monthly(year)?,
            engine.billing_monthly(previous_year)?,
            month,
        );
        let sales = PeriodTotals::from_series(
            engine.sales_monthly(year)?,
            engine.sales_monthly(previous_year)?,
            month,
        );

        Ok(Self {
            year,
            month,
            comparison_month: month - 1,
            previous_year,
            billing,
            sales,
            pending_bm: engine.pending(PendingKind::Bm, year, month)?,
            pending_reports: engine.pending(PendingKind::Report, year, month)?,
        })
    }
}
