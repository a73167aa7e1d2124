use crate::error::{ReportingError, Result};
use crate::metrics::{DashboardMetrics, MONTH_LABELS, PendingSummary, PeriodTotals, month_label};
use chrono::Local;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use super::{format_brl, format_variation};

// ============================================================================
// Report Types
// ============================================================================

/// Dashboard KPIs plus the metadata of the run that produced them.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    /// Local timestamp, `YYYY-MM-DD HH:MM:SS`
    pub generated_at: String,
    /// Database the KPIs were read from
    pub database: String,
    pub year: i32,
    pub month: u32,
    pub metrics: DashboardMetrics,
}

impl MetricsReport {
    pub fn new(database: &Path, metrics: DashboardMetrics) -> Self {
        Self {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            database: database.display().to_string(),
            year: metrics.year,
            month: metrics.month,
            metrics,
        }
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Human-readable summary for the terminal.
    pub fn render_text(&self) -> String {
        let m = &self.metrics;
        let label = month_label(self.month).unwrap_or("?");
        let mut out = String::new();

        let _ = writeln!(out, "SM Gerenciamento - {} {}", label, self.year);
        let _ = writeln!(out, "Gerado em {} | Banco: {}", self.generated_at, self.database);

        write_totals(&mut out, "Faturamento", &m.billing, m.comparison_month, m.previous_year);
        write_totals(&mut out, "Vendas", &m.sales, m.comparison_month, m.previous_year);

        let _ = writeln!(out);
        let _ = writeln!(out, "Pendências (até {})", label);
        write_pending(&mut out, "BMs", &m.pending_bm);
        write_pending(&mut out, "Relatórios", &m.pending_reports);

        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{:<5}{:>20}{:>20}{:>10}{:>10}",
            "Mês", "Faturamento", "Vendas", "BM", "Rel."
        );
        for (idx, label) in MONTH_LABELS.iter().enumerate() {
            let _ = writeln!(
                out,
                "{:<5}{:>20}{:>20}{:>10}{:>10}",
                label,
                format_brl(m.billing.monthly[idx]),
                format_brl(m.sales.monthly[idx]),
                m.pending_bm.monthly_counts[idx],
                m.pending_reports.monthly_counts[idx],
            );
        }

        out
    }
}

fn write_totals(
    out: &mut String,
    title: &str,
    totals: &PeriodTotals,
    comparison_month: u32,
    previous_year: i32,
) {
    let window = match comparison_month {
        0 => "sem mês fechado".to_string(),
        1 => "JAN".to_string(),
        n => format!("JAN-{}", month_label(n).unwrap_or("?")),
    };

    let _ = writeln!(out);
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "  {:<28}{}", "Acumulado no ano:", format_brl(totals.year_to_date));
    let _ = writeln!(
        out,
        "  {:<28}{}",
        format!("Média mensal ({}):", window),
        format_brl(totals.monthly_average)
    );
    let _ = writeln!(
        out,
        "  {:<28}{}",
        format!("Mesmo período {}:", previous_year),
        format_brl(totals.previous_year_comparison_total)
    );
    let _ = writeln!(out, "  {:<28}{}", "Variação:", format_variation(totals.variation.percent));
}

fn write_pending(out: &mut String, title: &str, pending: &PendingSummary) {
    let _ = writeln!(
        out,
        "  {:<12}{:>6} itens  {}",
        format!("{}:", title),
        pending.count,
        format_brl(pending.amount)
    );
}

// ============================================================================
// Output
// ============================================================================

/// Output format of a rendered report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// Renders a [`MetricsReport`] and writes it to a stream or a file.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportGenerator {
    format: ReportFormat,
}

impl ReportGenerator {
    pub fn new(format: ReportFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> ReportFormat {
        self.format
    }

    pub fn render(&self, report: &MetricsReport) -> Result<String> {
        match self.format {
            ReportFormat::Text => Ok(report.render_text()),
            ReportFormat::Json => report.to_json(),
        }
    }

    /// Write the rendered report to `writer`, followed by a newline.
    pub fn write_to<W: Write>(&self, report: &MetricsReport, mut writer: W) -> Result<()> {
        let rendered = self.render(report)?;
        writer.write_all(rendered.as_bytes())?;
        if !rendered.ends_with('\n') {
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write the rendered report to `path`, creating parent directories.
    pub fn write_to_file(&self, report: &MetricsReport, path: &Path) -> Result<PathBuf> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                ReportingError::ReportGenerationFailed(format!(
                    "cannot create {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let file = File::create(path).map_err(|e| {
            ReportingError::ReportGenerationFailed(format!("cannot create {}: {}", path.display(), e))
        })?;
        self.write_to(report, file)?;

        info!("Report saved: {}", path.display());
        Ok(path.to_path_buf())
    }
}
