//! Integration tests for the migration and the dashboard metrics.
//!
//! These tests migrate a Latin-1 CSV export and a small `.xlsx` workbook into
//! a temporary database and compute the KPIs from it.

use pretty_assertions::assert_eq;
use sm_gerenciamento::schema::{
    BILLING_DATE, BM_RELEASE_DATE, PO_RECEIPT_DATE, REPORTS_SENT_DATE, SALES_TABLE,
    SERVICE_END_DATE, TOTAL_AMOUNT,
};
use sm_gerenciamento::{
    CsvEncoding, DashboardMetrics, MetricsEngine, MetricsReport, Migration, MigrationStage,
    ReportConfig, ReportFormat, ReportGenerator, SalesStore, VariationClass, format_brl,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("sm_it_{}_{}", name, std::process::id()));
    fs::remove_dir_all(&dir).ok();
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn config_for(dir: &Path) -> ReportConfig {
    ReportConfig::builder()
        .workbook_path(fixtures_path().join("sm_export_latin1.csv"))
        .database_path(dir.join("gerenciamento.db"))
        .csv_encoding(CsvEncoding::Latin1)
        .build()
        .unwrap()
}

fn workbook_config_for(dir: &Path) -> ReportConfig {
    ReportConfig::builder()
        .workbook_path(fixtures_path().join("sm_gerenciamento.xlsx"))
        .database_path(dir.join("gerenciamento.db"))
        .build()
        .unwrap()
}

fn migrate(dir: &Path) -> ReportConfig {
    let config = config_for(dir);
    Migration::builder()
        .config(config.clone())
        .build()
        .unwrap()
        .run()
        .unwrap();
    config
}

type WorkbookRow = (String, Option<String>, Option<String>, f64, i64);

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

// ============================================================================
// Migration Tests
// ============================================================================

#[test]
fn test_migrate_latin1_csv_export() {
    let dir = temp_dir("migrate");
    let stages = Arc::new(Mutex::new(Vec::new()));
    let stages_clone = stages.clone();

    let summary = Migration::builder()
        .config(config_for(&dir))
        .on_progress(move |update| stages_clone.lock().unwrap().push(update.stage))
        .build()
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(summary.rows, 6);
    assert_eq!(summary.columns, 8);
    assert_eq!(summary.table, SALES_TABLE);
    assert_eq!(summary.missing_columns.len(), 64 - 8);

    let stages = stages.lock().unwrap();
    assert_eq!(stages.first(), Some(&MigrationStage::Loading));
    assert!(stages.contains(&MigrationStage::Cleaning));
    assert!(stages.contains(&MigrationStage::Persisting));
    assert_eq!(stages.last(), Some(&MigrationStage::Complete));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_migrated_column_types() {
    let dir = temp_dir("types");
    let config = migrate(&dir);

    let store = SalesStore::open_read_only(&config.database_path).unwrap();
    let columns = store.table_columns(SALES_TABLE).unwrap();
    let declared = |name: &str| {
        columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.declared_type.clone())
            .unwrap_or_default()
    };

    for date_column in [
        PO_RECEIPT_DATE,
        SERVICE_END_DATE,
        REPORTS_SENT_DATE,
        BM_RELEASE_DATE,
        BILLING_DATE,
    ] {
        assert_eq!(declared(date_column), "TIMESTAMP", "{date_column}");
    }
    assert_eq!(declared(TOTAL_AMOUNT), "REAL");
    assert_eq!(declared("CLIENTE (NOME)"), "TEXT");

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_migrated_values() {
    let dir = temp_dir("values");
    let config = migrate(&dir);

    let store = SalesStore::open_read_only(&config.database_path).unwrap();
    let conn = store.connection();

    let client: String = conn
        .query_row(
            "SELECT \"CLIENTE (NOME)\" FROM Vendas WHERE \"VALOR - VENDA (TOTAL) DESC.\" = 1000.0",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(client, "Açúcar União");

    let billed: String = conn
        .query_row(
            "SELECT \"DATA (FATURAMENTO)\" FROM Vendas WHERE \"CLIENTE (NOME)\" = 'Gerdau'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(billed, "2025-01-20 00:00:00");

    let total: f64 = conn
        .query_row(
            "SELECT SUM(\"VALOR - VENDA (TOTAL) DESC.\") FROM Vendas",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert!(approx(total, 1000.0 + 500.0 + 2500.5 + 750.0 + 300.0 + 999.0));

    let null_bm: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM Vendas WHERE \"DATA (LIBERAÇÃO BM)\" IS NULL",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(null_bm, 3);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_migration_replaces_table() {
    let dir = temp_dir("rerun");
    migrate(&dir);
    let config = migrate(&dir);

    let store = SalesStore::open_read_only(&config.database_path).unwrap();
    assert_eq!(store.row_count(SALES_TABLE).unwrap(), 6);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_migration_missing_input() {
    let dir = temp_dir("missing");
    let config = ReportConfig::builder()
        .workbook_path(dir.join("nao_existe.xlsx"))
        .database_path(dir.join("gerenciamento.db"))
        .build()
        .unwrap();

    let err = Migration::builder()
        .config(config)
        .build()
        .unwrap()
        .run()
        .unwrap_err();
    assert_eq!(err.error_code(), "INPUT_NOT_FOUND");
    assert!(err.is_input_error());

    fs::remove_dir_all(&dir).ok();
}

// ============================================================================
// Workbook Tests
// ============================================================================

#[test]
fn test_migrate_workbook_sheet() {
    let dir = temp_dir("workbook");
    let config = workbook_config_for(&dir);

    let summary = Migration::builder()
        .config(config.clone())
        .build()
        .unwrap()
        .run()
        .unwrap();

    // Row 3 of the sheet is blank
    assert_eq!(summary.rows, 3);
    assert_eq!(summary.columns, 6);

    let store = SalesStore::open_read_only(&config.database_path).unwrap();
    let conn = store.connection();
    let mut statement = conn
        .prepare(
            "SELECT \"CLIENTE (NOME)\", \"DATA (RECEBIMENTO PO)\", \"DATA (FATURAMENTO)\", \
             \"VALOR - VENDA (TOTAL) DESC.\", \"ATENDIMENTO (Nº)\" \
             FROM Vendas ORDER BY \"ATENDIMENTO (Nº)\"",
        )
        .unwrap();
    let rows = statement
        .query_map([], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
        })
        .unwrap()
        .collect::<Result<Vec<WorkbookRow>, _>>()
        .unwrap();

    assert_eq!(rows.len(), 3);

    // Date-formatted cells
    assert_eq!(rows[0].0, "Vale");
    assert_eq!(rows[0].1.as_deref(), Some("2025-01-10 00:00:00"));
    assert_eq!(rows[0].2.as_deref(), Some("2025-01-15 00:00:00"));
    assert!(approx(rows[0].3, 1500.5));

    // Text date and currency text in otherwise typed columns
    assert_eq!(rows[1].0, "Açúcar União");
    assert_eq!(rows[1].1.as_deref(), Some("2025-02-03 00:00:00"));
    assert_eq!(rows[1].2.as_deref(), Some("2025-02-20 00:00:00"));
    assert!(approx(rows[1].3, 2000.0));

    assert_eq!(rows[2].0, "Braskem");
    assert_eq!(rows[2].1.as_deref(), Some("2024-03-01 00:00:00"));
    assert_eq!(rows[2].2, None);
    assert!(approx(rows[2].3, 300.0));
    assert_eq!(rows[2].4, 3);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_migrate_workbook_wrong_sheet() {
    let dir = temp_dir("wrong_sheet");
    let config = ReportConfig::builder()
        .workbook_path(fixtures_path().join("sm_gerenciamento.xlsx"))
        .database_path(dir.join("gerenciamento.db"))
        .sheet_name("Plan1")
        .build()
        .unwrap();

    let err = Migration::builder()
        .config(config.clone())
        .build()
        .unwrap()
        .run()
        .unwrap_err();
    assert_eq!(err.error_code(), "SHEET_NOT_FOUND");
    assert!(err.is_input_error());
    let message = err.to_string();
    assert!(message.contains("Plan1"));
    assert!(message.contains("Resumo, Gerenciamento"));

    // Nothing is written when the sheet is missing
    assert!(!config.database_path.exists());

    fs::remove_dir_all(&dir).ok();
}

// ============================================================================
// Metrics Tests
// ============================================================================

#[test]
fn test_dashboard_metrics_from_migrated_export() {
    let dir = temp_dir("dashboard");
    let config = migrate(&dir);

    let store = SalesStore::open_read_only(&config.database_path).unwrap();
    let engine = MetricsEngine::new(&store, config);
    let metrics = DashboardMetrics::compute(&engine, 2025, 3).unwrap();

    assert_eq!(metrics.comparison_month, 2);
    assert_eq!(metrics.previous_year, 2024);

    // Cancelled record is dated but not billed
    let billing = &metrics.billing;
    assert!(approx(billing.monthly.get(1), 300.0));
    assert!(approx(billing.monthly.get(2), 1000.0));
    assert!(approx(billing.year_to_date, 1300.0));
    assert!(approx(billing.previous_year_comparison_total, 500.0));
    assert!(approx(billing.monthly_average, 650.0));
    assert!(approx(billing.variation.percent, 160.0));
    assert_eq!(billing.variation.class, VariationClass::Positive);

    let sales = &metrics.sales;
    assert!(approx(sales.monthly.get(1), 1300.0));
    assert!(approx(sales.monthly.get(2), 2500.5));
    assert!(approx(sales.monthly.get(3), 750.0));
    assert!(approx(sales.year_to_date, 4550.5));
    assert!(approx(sales.comparison_total, 3800.5));

    assert_eq!(metrics.pending_bm.count, 1);
    assert!(approx(metrics.pending_bm.amount, 2500.5));
    assert_eq!(metrics.pending_bm.monthly_counts.get(2), 1);

    assert_eq!(metrics.pending_reports.count, 1);
    assert!(approx(metrics.pending_reports.amount, 750.0));
    assert_eq!(metrics.pending_reports.monthly_counts.get(3), 1);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_pending_respects_month_limit() {
    let dir = temp_dir("pending_limit");
    let config = migrate(&dir);

    let store = SalesStore::open_read_only(&config.database_path).unwrap();
    let engine = MetricsEngine::new(&store, config);
    let metrics = DashboardMetrics::compute(&engine, 2025, 2).unwrap();

    // Report backlog is dated March, after the limit
    assert_eq!(metrics.pending_reports.count, 0);
    assert_eq!(metrics.pending_reports.monthly_counts.get(3), 1);
    assert_eq!(metrics.pending_bm.count, 1);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_metrics_on_database_without_table() {
    let dir = temp_dir("no_table");
    let db = dir.join("vazio.db");
    SalesStore::open(&db)
        .unwrap()
        .connection()
        .execute_batch("CREATE TABLE Outra (id INTEGER)")
        .unwrap();

    let store = SalesStore::open_read_only(&db).unwrap();
    let engine = MetricsEngine::new(&store, ReportConfig::default());
    let err = DashboardMetrics::compute(&engine, 2025, 6).unwrap_err();
    assert_eq!(err.error_code(), "TABLE_NOT_FOUND");

    fs::remove_dir_all(&dir).ok();
}

// ============================================================================
// Report Tests
// ============================================================================

#[test]
fn test_report_json_and_text() {
    let dir = temp_dir("report");
    let config = migrate(&dir);

    let store = SalesStore::open_read_only(&config.database_path).unwrap();
    let database = config.database_path.clone();
    let engine = MetricsEngine::new(&store, config);
    let metrics = DashboardMetrics::compute(&engine, 2025, 3).unwrap();
    let report = MetricsReport::new(&database, metrics);

    let text = ReportGenerator::new(ReportFormat::Text).render(&report).unwrap();
    assert!(text.contains(&format_brl(1300.0)));
    assert!(text.contains("+160,00%"));

    let path = dir.join("out").join("dashboard.json");
    ReportGenerator::new(ReportFormat::Json)
        .write_to_file(&report, &path)
        .unwrap();
    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["year"], 2025);
    assert_eq!(value["metrics"]["pending_bm"]["count"], 1);
    assert_eq!(value["metrics"]["sales"]["monthly"]["MAR"], 750.0);

    fs::remove_dir_all(&dir).ok();
}
