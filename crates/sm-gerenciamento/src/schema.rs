//! Fixed schema of the "SM Gerenciamento" export.
//!
//! Header strings are matched verbatim, accents and parentheses included.

/// Default name of the table rebuilt on every migration.
pub const SALES_TABLE: &str = "Vendas";

/// Default worksheet holding the records.
pub const DEFAULT_SHEET: &str = "Gerenciamento";

/// Service status ("andamento") of the order.
pub const STATUS: &str = "ATENDIMENTO (ANDAMENTO)";

/// Discounted total sale value, the amount every metric sums.
pub const TOTAL_AMOUNT: &str = "VALOR - VENDA (TOTAL) DESC.";

/// Billing date (faturamento).
pub const BILLING_DATE: &str = "DATA (FATURAMENTO)";

/// Purchase-order receipt date (vendas).
pub const PO_RECEIPT_DATE: &str = "DATA (RECEBIMENTO PO)";

/// Date the reports were sent to the customer.
pub const REPORTS_SENT_DATE: &str = "DATA (ENVIO DOS RELATÓRIOS)";

/// Date the service ended on site.
pub const SERVICE_END_DATE: &str = "DATA (FINAL ATENDIMENTO)";

/// Date the BM (boletim de medição) was released.
pub const BM_RELEASE_DATE: &str = "DATA (LIBERAÇÃO BM)";

/// Statuses that count as billed revenue.
pub const BILLED_STATUSES: [&str; 2] = ["Finalizado", "Finalizado Com Faturamento"];

/// Columns coerced to timestamps during migration.
pub const DATE_COLUMNS: [&str; 5] = [
    BILLING_DATE,
    PO_RECEIPT_DATE,
    REPORTS_SENT_DATE,
    SERVICE_END_DATE,
    BM_RELEASE_DATE,
];

/// Every header of the export, in sheet order.
pub const VENDAS_COLUMNS: [&str; 64] = [
    "ATENDIMENTO (ANDAMENTO)",
    "ATENDIMENTO (Nº)",
    "ATENDIMENTO (TIPO)",
    "ATENDIMENTO (REAGENDAMENTO)",
    "DATA (ABERTURA)",
    "EMISSOR",
    "CLIENTE (NOME)",
    "CLIENTE (UNIDADE)",
    "SERVIÇO (REGIME)",
    "SERVIÇO (LOCAL)",
    "CLIENTE (SOLICITANTE)",
    "CLIENTE (FUNÇÃO)",
    "CLIENTE (TELEFONE)",
    "CLIENTE (EMAIL)",
    "CLIENTE (COMPRADOR)",
    "CLIENTE (FUNÇÃO2)",
    "CLIENTE (TELEFONE2)",
    "CLIENTE (EMAIL2)",
    "SERVIÇO (TIPO)",
    "SERVIÇO (DESCRIÇÃO)",
    "DOCUMENTO",
    "REF DOCUMENTO",
    "REVISÃO",
    "DATA (ENVIO PROPOSTA)",
    "VALIDADE",
    "PRAZO (EM DIAS)",
    "INDICADOR DE QUALIDADE",
    "ATENDIMENTO (STATUS)",
    "ATENDimento (MOTIVO - ANDAMENTO)",
    "RELATÓRIO DE AVALIAÇÃO",
    "DATA (INÍCIO ATENDIMENTO)",
    "REAGENDADO PARA:",
    "DATA (PREVISÃO DE TÉRMINO)",
    "DATA (FINAL ATENDIMENTO)",
    "DATA (ENVIO DOS RELATÓRIOS)",
    "DATA (LIBERAÇÃO BM)",
    "DATA (RECEBIMENTO PO)",
    "Nº PO",
    "VALOR - VENDA (SERVIÇO)",
    "VALOR - VENDA (CONSUMÍVEIS)",
    "VALOR - VENDA (MOBILIZAÇÃO)",
    "VALOR - VENDA (MATERIAIS)",
    "VALOR - VENDA (TOTAL)",
    "DESC (DESCONTO %)",
    "VALOR - VENDA (SERVIÇO) DESC.",
    "VALOR - VENDA (CONSUMÍVEIS) DESC.",
    "VALOR - VENDA (MOBILIZAÇÃO) DESC.",
    "VALOR - VENDA (MATERIAIS) DESC.",
    "VALOR - VENDA (TOTAL) DESC.",
    "VALOR - COMPRA (SERVIÇO)",
    "VALOR - COMPRA (MATERIAIS)",
    "VALOR - COMPRA (TOTAL)",
    "Nº NOTA FISCAL",
    "DATA (FATURAMENTO)",
    "DATA (PRAZO - PAGAMENTO)",
    "DATA (RECEBimento)",
    "(AUX) STATUS (REALIZADO)",
    "(AUX) STATUS (DATA RECEBIMENTO)",
    "(AUX) DATA (PRAZO PAGAMENTO - DIAS)",
    "(AUX) SERVIÇO (BUDGET)",
    "(AUX) SERVIÇO (CONTRATO)",
    "(AUX) SERVIÇO (CONTRATO)2",
    "(AUX) SERVIÇO (CONTRATO)3",
    "(AUX) SERVIÇO (CONTRATO)4",
];

/// Quote an identifier for SQLite (`"name"`, inner quotes doubled).
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Expected headers missing from `columns`.
pub fn missing_columns<S: AsRef<str>>(columns: &[S]) -> Vec<&'static str> {
    VENDAS_COLUMNS
        .iter()
        .copied()
        .filter(|expected| !columns.iter().any(|c| c.as_ref() == *expected))
        .collect()
}
