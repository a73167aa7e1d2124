//! Normalization of Brazilian-locale currency strings.
//!
//! Amounts arrive either as numbers or as text such as `"R$ 1.234,56"`,
//! `"1,234.56"`, `"-"` or an empty cell. [`normalize_amount`] turns any of
//! these into a non-negative `f64`, falling back to `0.0` instead of failing.

/// Currency symbols stripped before parsing.
const CURRENCY_SYMBOLS: [&str; 2] = ["R$", "$"];

/// Placeholder used by the export for "no value".
const DASH_PLACEHOLDER: &str = "-";

/// A raw cell value from the amount column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawAmount<'a> {
    /// Null cell.
    Missing,
    /// Already numeric (may be NaN).
    Number(f64),
    /// Formatted text.
    Text(&'a str),
}

impl From<Option<f64>> for RawAmount<'_> {
    fn from(value: Option<f64>) -> Self {
        value.map_or(RawAmount::Missing, RawAmount::Number)
    }
}

impl<'a> From<&'a str> for RawAmount<'a> {
    fn from(value: &'a str) -> Self {
        RawAmount::Text(value)
    }
}

/// Normalize any raw amount to `f64`.
///
/// Numbers pass through unchanged; NaN and missing values become `0.0`.
pub fn normalize_amount(raw: RawAmount<'_>) -> f64 {
    match raw {
        RawAmount::Missing => 0.0,
        RawAmount::Number(n) if n.is_nan() => 0.0,
        RawAmount::Number(n) => n,
        RawAmount::Text(text) => parse_brl_amount(text),
    }
}

/// Parse a monetary string, tolerating both `1.234,56` and `1,234.56`.
///
/// The rightmost of `,` and `.` is the decimal separator and the other one is
/// dropped. When only one kind of separator is present, a trailing group of
/// exactly three digits means thousands grouping (`"12.345"` is `12345.0`).
/// A repeated decimal separator keeps only the first one as the point
/// (`"1.234.56"` is `1.23456`). Overflowing input yields `0.0`.
///
/// # Example
///
/// ```rust
/// use sm_gerenciamento::cleaner::parse_brl_amount;
///
/// assert_eq!(parse_brl_amount("R$ 1.234,56"), 1234.56);
/// assert_eq!(parse_brl_amount("1,234.56"), 1234.56);
/// assert_eq!(parse_brl_amount("R$ -"), 0.0);
/// ```
pub fn parse_brl_amount(raw: &str) -> f64 {
    let mut text = raw.trim().to_string();
    for symbol in CURRENCY_SYMBOLS {
        text = text.replace(symbol, "");
    }
    let text = text.trim();

    if text.is_empty() || text == DASH_PLACEHOLDER {
        return 0.0;
    }

    let normalized = normalize_separators(text, decimal_separator(text));

    if let Ok(value) = normalized.parse::<f64>()
        && value.is_finite()
    {
        return value;
    }

    // Last resort: every digit, read as a whole amount.
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    digits
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Pick the decimal separator of `text`, if any.
fn decimal_separator(text: &str) -> Option<char> {
    match (text.rfind(','), text.rfind('.')) {
        (Some(comma), Some(dot)) => Some(if comma > dot { ',' } else { '.' }),
        (Some(_), None) => single_kind_separator(text, ','),
        (None, Some(_)) => single_kind_separator(text, '.'),
        (None, None) => None,
    }
}

/// Decide whether a separator that appears alone marks decimals or thousands.
fn single_kind_separator(text: &str, separator: char) -> Option<char> {
    let occurrences = text.matches(separator).count();
    let trailing_digits = text
        .rsplit(separator)
        .next()
        .map(|tail| tail.chars().filter(char::is_ascii_digit).count())
        .unwrap_or(0);

    match (separator, occurrences, trailing_digits) {
        // "12.345", "1.234.567": dots grouping thousands
        ('.', _, 3) => None,
        // "1,234,567": commas grouping thousands
        (',', n, 3) if n > 1 => None,
        _ => Some(separator),
    }
}

/// Keep digits, turning every `decimal` into `.` and dropping everything
/// else. Extra dots are then merged by [`merge_extra_dots`].
fn normalize_separators(text: &str, decimal: Option<char>) -> String {
    let normalized: String = text
        .chars()
        .filter_map(|ch| {
            if ch.is_ascii_digit() {
                Some(ch)
            } else if Some(ch) == decimal {
                Some('.')
            } else {
                None
            }
        })
        .collect();

    merge_extra_dots(normalized)
}

/// Collapse `a.b.c` into `a.bc`: the first dot stays, trailing fragments merge.
fn merge_extra_dots(value: String) -> String {
    let mut parts = value.split('.');
    let head = parts.next().unwrap_or_default().to_string();
    let tail: String = parts.collect();
    if value.contains('.') {
        format!("{head}.{tail}")
    } else {
        head
    }
}
