//! Date coercion for the export's date columns.
//!
//! Values that cannot be read as a date become null, never an error.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta};
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;

/// Timestamp layout persisted to SQLite, readable by `strftime`.
pub const SQL_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Largest Excel serial we accept (9999-12-31).
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

static ISO_DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

static ISO_DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// `DD/MM/YYYY` with an optional `HH:MM[:SS]` suffix. `-` and `.` are
/// accepted as separators too.
static DAY_FIRST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(\d{1,2})[/.-](\d{1,2})[/.-](\d{2}|\d{4})(?:[ T](\d{1,2}):(\d{2})(?::(\d{2}))?)?$",
    )
    .expect("Invalid regex: day-first date")
});

/// Parse a single date string.
///
/// Day-first dates are tried first, then ISO layouts, then Excel serial
/// numbers written as text.
pub fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    // Day-first goes first: chrono's %Y would read "05-02-24" as year 5.
    if let Some(parsed) = parse_day_first(text) {
        return Some(parsed);
    }

    for format in ISO_DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Some(parsed);
        }
    }
    for format in ISO_DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(text, format) {
            return parsed.and_hms_opt(0, 0, 0);
        }
    }

    text.parse::<f64>().ok().and_then(excel_serial_to_datetime)
}

fn parse_day_first(text: &str) -> Option<NaiveDateTime> {
    let caps = DAY_FIRST.captures(text)?;
    let number = |idx: usize| caps.get(idx).and_then(|m| m.as_str().parse::<u32>().ok());

    let day = number(1)?;
    let month = number(2)?;
    let year_text = caps.get(3)?.as_str();
    let mut year: i32 = year_text.parse().ok()?;
    if year_text.len() == 2 {
        year += 2000;
    }

    let hour = number(4).unwrap_or(0);
    let minute = number(5).unwrap_or(0);
    let second = number(6).unwrap_or(0);

    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)
}

/// Convert an Excel serial day number (1900 date system) to a timestamp.
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 1.0 || serial > MAX_EXCEL_SERIAL {
        return None;
    }
    // Day zero is 1899-12-30, which absorbs Excel's 1900 leap-year bug.
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let offset = TimeDelta::try_milliseconds((serial * MILLIS_PER_DAY).round() as i64)?;
    epoch.checked_add_signed(offset)
}

/// Milliseconds since the Unix epoch, treating the value as UTC.
pub fn to_epoch_millis(value: NaiveDateTime) -> i64 {
    value.and_utc().timestamp_millis()
}

/// Format epoch milliseconds as [`SQL_TIMESTAMP_FORMAT`].
pub fn format_sql_timestamp(millis: i64) -> Option<String> {
    DateTime::from_timestamp_millis(millis)
        .map(|d| d.naive_utc().format(SQL_TIMESTAMP_FORMAT).to_string())
}

/// Coerce a column to `Datetime(Milliseconds)`.
///
/// Returns the coerced series and the number of non-null input values that
/// could not be parsed and were nulled.
pub fn coerce_date_series(series: &Series) -> Result<(Series, usize)> {
    let name = series.name().clone();
    let target = DataType::Datetime(TimeUnit::Milliseconds, None);

    let millis: Vec<Option<i64>> = match series.dtype() {
        DataType::Datetime(_, _) | DataType::Date => {
            return Ok((series.cast(&target)?, 0));
        }
        DataType::String => series
            .str()?
            .into_iter()
            .map(|value| value.and_then(parse_date).map(to_epoch_millis))
            .collect(),
        dtype if dtype.is_float() || dtype.is_integer() => series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|value| {
                value
                    .and_then(excel_serial_to_datetime)
                    .map(to_epoch_millis)
            })
            .collect(),
        _ => series
            .cast(&DataType::String)?
            .str()?
            .into_iter()
            .map(|value| value.and_then(parse_date).map(to_epoch_millis))
            .collect(),
    };

    let parsed = millis.iter().filter(|v| v.is_some()).count();
    let nulled = (series.len() - series.null_count()).saturating_sub(parsed);

    let coerced = Series::new(name, millis).cast(&target)?;
    Ok((coerced, nulled))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_parse_iso_layouts() {
        assert_eq!(parse_date("2024-03-15"), Some(dt(2024, 3, 15, 0, 0, 0)));
        assert_eq!(parse_date("2024-03-15 10:20:30"), Some(dt(2024, 3, 15, 10, 20, 30)));
        assert_eq!(parse_date("2024-03-15T10:20:30"), Some(dt(2024, 3, 15, 10, 20, 30)));
        assert_eq!(
            parse_date("2024-03-15 10:20:30.500"),
            Some(dt(2024, 3, 15, 10, 20, 30) + TimeDelta::milliseconds(500))
        );
    }

    #[test]
    fn test_parse_day_first() {
        assert_eq!(parse_date("05/02/2024"), Some(dt(2024, 2, 5, 0, 0, 0)));
        assert_eq!(parse_date("5/2/24"), Some(dt(2024, 2, 5, 0, 0, 0)));
        assert_eq!(parse_date("31.12.2023 08:15"), Some(dt(2023, 12, 31, 8, 15, 0)));
        assert_eq!(parse_date("05-02-24"), Some(dt(2024, 2, 5, 0, 0, 0)));
        assert_eq!(parse_date("13/01/2024 17:45:10"), Some(dt(2024, 1, 13, 17, 45, 10)));
    }

    #[test]
    fn test_day_first_rejects_invalid_calendar_dates() {
        assert_eq!(parse_date("31/02/2024"), None);
        assert_eq!(parse_date("01/13/2024"), None);
    }

    #[test]
    fn test_parse_excel_serial() {
        assert_eq!(parse_date("45306"), Some(dt(2024, 1, 15, 0, 0, 0)));
        assert_eq!(excel_serial_to_datetime(45306.5), Some(dt(2024, 1, 15, 12, 0, 0)));
        assert_eq!(excel_serial_to_datetime(0.0), None);
        assert_eq!(excel_serial_to_datetime(f64::NAN), None);
    }

    #[test]
    fn test_garbage_is_none() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("a definir"), None);
        assert_eq!(parse_date("-"), None);
    }

    #[test]
    fn test_format_sql_timestamp() {
        let millis = to_epoch_millis(dt(2024, 1, 15, 9, 30, 0));
        assert_eq!(format_sql_timestamp(millis).as_deref(), Some("2024-01-15 09:30:00"));
    }

    #[test]
    fn test_coerce_string_series() {
        let series = Series::new(
            "DATA (FATURAMENTO)".into(),
            vec![Some("15/01/2024"), Some("lixo"), None, Some("2024-02-01")],
        );
        let (coerced, nulled) = coerce_date_series(&series).unwrap();

        assert_eq!(coerced.dtype(), &DataType::Datetime(TimeUnit::Milliseconds, None));
        assert_eq!(coerced.null_count(), 2);
        assert_eq!(nulled, 1);

        let millis = coerced.cast(&DataType::Int64).unwrap();
        let first = millis.i64().unwrap().get(0).unwrap();
        assert_eq!(format_sql_timestamp(first).as_deref(), Some("2024-01-15 00:00:00"));
    }

    #[test]
    fn test_coerce_numeric_series_as_excel_serials() {
        let series = Series::new("DATA (RECEBIMENTO PO)".into(), vec![Some(45306.0), None, Some(-3.0)]);
        let (coerced, nulled) = coerce_date_series(&series).unwrap();

        assert_eq!(coerced.null_count(), 2);
        assert_eq!(nulled, 1);
    }
}
