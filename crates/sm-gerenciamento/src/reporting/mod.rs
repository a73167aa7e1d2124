//! Report rendering for dashboard KPIs.
//!
//! A [`MetricsReport`] wraps [`DashboardMetrics`] with run metadata and can
//! be rendered two ways:
//! - a plain-text summary for the terminal (`report` subcommand)
//! - JSON on stdout or in a file (`report --json`, `report --output`)
//!
//! Amounts are formatted in Brazilian style by [`format_brl`] and variations
//! by [`format_variation`].
//!
//! # Example
//!
//! ```rust,ignore
//! use sm_gerenciamento::reporting::{MetricsReport, ReportGenerator};
//!
//! let report = MetricsReport::new(config.database_path.as_path(), metrics);
//! println!("{}", report.render_text());
//! ReportGenerator::new().write_to_file(&report, "dashboard.json".as_ref())?;
//! ```

mod generator;

pub use generator::{MetricsReport, ReportFormat, ReportGenerator};

/// Format an amount as Brazilian currency: `R$ 1.234,56`.
///
/// Negative values keep the sign after the symbol (`R$ -10,00`); non-finite
/// values are shown as zero.
///
/// ```
/// use sm_gerenciamento::reporting::format_brl;
///
/// assert_eq!(format_brl(1234.5), "R$ 1.234,50");
/// assert_eq!(format_brl(0.0), "R$ 0,00");
/// ```
pub fn format_brl(value: f64) -> String {
    format!("R$ {}", format_decimal(value))
}

/// Format a percentage with explicit sign and comma decimals: `+12,35%`.
pub fn format_variation(percent: f64) -> String {
    let percent = if percent.is_finite() { percent } else { 0.0 };
    let text = format!("{:+.2}%", percent);
    text.replace('.', ",")
}

/// `1234567.891` -> `1.234.567,89`
fn format_decimal(value: f64) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    let cents = (value.abs() * 100.0).round() as u64;
    let units = cents / 100;
    let fraction = cents % 100;

    let digits = units.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}{},{:02}", sign, grouped, fraction)
}
