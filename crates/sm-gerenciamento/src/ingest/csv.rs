//! CSV export reader.

use super::dedupe_headers;
use crate::config::CsvEncoding;
use crate::error::{ReportingError, Result, ResultExt};
use polars::prelude::*;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

const UTF8_BOM: &str = "\u{feff}";

/// Read a CSV export of the management sheet.
///
/// Every column is read as `String`; typing happens in the cleaner. The
/// separator is `,` unless the header line has more `;` than `,`.
pub fn read_csv_export(path: &Path, encoding: CsvEncoding) -> Result<DataFrame> {
    let bytes = std::fs::read(path)?;
    let text =
        decode(&bytes, encoding).context(format!("Failed to decode {}", path.display()))?;
    parse_csv_text(&text).context(format!("Failed to parse CSV {}", path.display()))
}

/// Decode raw bytes with the given encoding.
pub(crate) fn decode(bytes: &[u8], encoding: CsvEncoding) -> Result<String> {
    let text = match encoding {
        // Latin-1 maps every byte to the code point of the same value.
        CsvEncoding::Latin1 => bytes.iter().map(|&b| b as char).collect::<String>(),
        CsvEncoding::Utf8 => String::from_utf8(bytes.to_vec()).map_err(|e| {
            ReportingError::InvalidEncoding(format!(
                "CSV is not valid UTF-8 ({e}); try the latin1 encoding"
            ))
        })?,
    };
    Ok(text.strip_prefix(UTF8_BOM).map(str::to_string).unwrap_or(text))
}

fn detect_separator(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or_default();
    let commas = header.matches(',').count();
    let semicolons = header.matches(';').count();
    if semicolons > commas { b';' } else { b',' }
}

fn parse_csv_text(text: &str) -> Result<DataFrame> {
    if text.trim().is_empty() {
        return Err(ReportingError::EmptySource("CSV export".to_string()));
    }

    let separator = detect_separator(text);
    debug!("Parsing CSV export with separator '{}'", separator as char);

    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .with_parse_options(
            CsvParseOptions::default()
                .with_separator(separator)
                .with_quote_char(Some(b'"')),
        )
        .into_reader_with_file_handle(Cursor::new(text.as_bytes().to_vec()))
        .finish()?;

    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let unique = dedupe_headers(names.clone());
    if unique != names {
        df.set_column_names(unique.iter().map(String::as_str))?;
    }

    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_latin1() {
        // "LIBERAÇÃO" in ISO-8859-1
        let bytes = b"LIBERA\xc7\xc3O";
        assert_eq!(decode(bytes, CsvEncoding::Latin1).unwrap(), "LIBERAÇÃO");
    }

    #[test]
    fn test_decode_utf8_strips_bom() {
        let bytes = "\u{feff}DATA (FATURAMENTO)".as_bytes();
        assert_eq!(decode(bytes, CsvEncoding::Utf8).unwrap(), "DATA (FATURAMENTO)");
    }

    #[test]
    fn test_decode_invalid_utf8() {
        let err = decode(b"LIBERA\xc7\xc3O", CsvEncoding::Utf8).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ENCODING");
        assert!(err.is_input_error());
        assert!(err.to_string().contains("latin1"));
    }

    #[test]
    fn test_detect_separator() {
        assert_eq!(detect_separator("a,b,c\n1,2,3"), b',');
        assert_eq!(detect_separator("a;b;c\n1,5;2;3"), b';');
    }

    #[test]
    fn test_parse_reads_everything_as_text() {
        let text = "ATENDIMENTO (Nº),VALOR - VENDA (TOTAL) DESC.\n1,\"R$ 1.234,56\"\n2,\n";
        let df = parse_csv_text(text).unwrap();

        assert_eq!(df.shape(), (2, 2));
        for column in df.get_columns() {
            assert_eq!(column.dtype(), &DataType::String);
        }

        let amounts = df.column("VALOR - VENDA (TOTAL) DESC.").unwrap();
        let amounts = amounts.as_materialized_series().str().unwrap();
        assert_eq!(amounts.get(0), Some("R$ 1.234,56"));
    }

    #[test]
    fn test_parse_semicolon_export() {
        let text = "STATUS;VALOR\nFinalizado;10,5\n";
        let df = parse_csv_text(text).unwrap();
        assert_eq!(df.shape(), (1, 2));
    }

    #[test]
    fn test_parse_empty_text() {
        assert!(matches!(
            parse_csv_text("  \n"),
            Err(ReportingError::EmptySource(_))
        ));
    }
}
