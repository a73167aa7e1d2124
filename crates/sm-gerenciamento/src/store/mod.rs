//! SQLite persistence for the sales table.
//!
//! The table is rebuilt wholesale on every migration: `DROP`, `CREATE` and
//! one `INSERT` per row, all inside a single transaction. Column names are
//! kept verbatim (quoted), and declared types follow the frame's dtypes:
//!
//! | polars dtype          | SQLite type |
//! |-----------------------|-------------|
//! | floats                | `REAL`      |
//! | integers, booleans    | `INTEGER`   |
//! | datetimes, dates      | `TIMESTAMP` (stored as `YYYY-MM-DD HH:MM:SS` text) |
//! | everything else       | `TEXT`      |

use crate::cleaner::dates::{format_sql_timestamp, parse_date};
use crate::cleaner::parse_brl_amount;
use crate::error::{ReportingError, Result, ResultExt};
use crate::schema::quote_ident;
use chrono::NaiveDateTime;
use polars::prelude::*;
use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags, params, params_from_iter};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Declared SQLite type of a persisted column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Real,
    Integer,
    Text,
    Timestamp,
}

impl SqlType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Real => "REAL",
            Self::Integer => "INTEGER",
            Self::Text => "TEXT",
            Self::Timestamp => "TIMESTAMP",
        }
    }

    /// SQLite type used for a polars dtype.
    pub fn for_dtype(dtype: &DataType) -> Self {
        match dtype {
            d if d.is_float() => Self::Real,
            d if d.is_integer() => Self::Integer,
            DataType::Boolean => Self::Integer,
            DataType::Datetime(_, _) | DataType::Date => Self::Timestamp,
            _ => Self::Text,
        }
    }
}

/// Column metadata from `PRAGMA table_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableColumn {
    pub name: String,
    pub declared_type: String,
}

/// One `(date, amount)` row returned by a metrics query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatedAmount {
    pub date: Option<NaiveDateTime>,
    pub amount: f64,
}

/// Handle to the SQLite database holding the sales table.
pub struct SalesStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SalesStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .context(format!("Failed to open database {}", path.display()))?;
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an existing database without write access.
    pub fn open_read_only(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ReportingError::InputNotFound(path.to_path_buf()));
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .context(format!("Failed to open database {}", path.display()))?;
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Delete the database file at `path`, if present, and open a fresh one.
    pub fn recreate(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Database {} already exists and will be replaced", path.display());
            std::fs::remove_file(path)?;
        }
        Self::open(path)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
            path: None,
        })
    }

    /// Database file, `None` when in memory.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Underlying connection, for ad-hoc queries.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Replace `table` with the contents of `df`.
    ///
    /// Returns the number of rows written. Nothing changes if any statement
    /// fails.
    pub fn replace_table(&mut self, table: &str, df: &DataFrame) -> Result<usize> {
        if df.width() == 0 {
            return Err(ReportingError::EmptySource(format!(
                "frame for table '{table}' has no columns"
            )));
        }

        let mut names = Vec::with_capacity(df.width());
        let mut types = Vec::with_capacity(df.width());
        let mut columns = Vec::with_capacity(df.width());
        for column in df.get_columns() {
            let series = column.as_materialized_series();
            let (sql_type, values) = column_values(series)
                .context(format!("Failed to convert column '{}'", series.name()))?;
            names.push(series.name().to_string());
            types.push(sql_type);
            columns.push(values);
        }

        let quoted = table_ident(table);
        let create = format!(
            "CREATE TABLE {quoted} ({})",
            names
                .iter()
                .zip(&types)
                .map(|(name, ty)| format!("{} {}", quote_ident(name), ty.as_sql()))
                .collect::<Vec<_>>()
                .join(", ")
        );
        let insert = format!(
            "INSERT INTO {quoted} ({}) VALUES ({})",
            names.iter().map(|n| quote_ident(n)).collect::<Vec<_>>().join(", "),
            (1..=names.len()).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ")
        );
        debug!("{}", create);

        let rows = df.height();
        let tx = self.conn.transaction()?;
        tx.execute(&format!("DROP TABLE IF EXISTS {quoted}"), [])?;
        tx.execute(&create, [])?;
        {
            let mut stmt = tx.prepare(&insert)?;
            for row in 0..rows {
                stmt.execute(params_from_iter(columns.iter().map(|values| &values[row])))
                    .context(format!("Failed to insert row {}", row + 1))?;
            }
        }
        tx.commit()?;

        info!("Wrote {} rows x {} columns to table '{}'", rows, names.len(), table);
        Ok(rows)
    }

    /// Whether `table` exists.
    pub fn table_exists(&self, table: &str) -> Result<bool> {
        let mut stmt = self
            .conn
            .prepare("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1")?;
        Ok(stmt.exists(params![table])?)
    }

    /// Columns of `table`, in declaration order. Empty when the table is absent.
    pub fn table_columns(&self, table: &str) -> Result<Vec<TableColumn>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")?;
        let columns = stmt
            .query_map(params![table], |row| {
                Ok(TableColumn {
                    name: row.get(0)?,
                    declared_type: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(columns)
    }

    /// Fail with `TableNotFound` / `ColumnNotFound` unless `table` has every
    /// column in `required`.
    pub fn require_columns(&self, table: &str, required: &[&str]) -> Result<()> {
        let columns = self.table_columns(table)?;
        if columns.is_empty() {
            return Err(ReportingError::TableNotFound(table.to_string()));
        }
        for name in required {
            if !columns.iter().any(|c| c.name == *name) {
                return Err(ReportingError::ColumnNotFound {
                    table: table.to_string(),
                    column: name.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Number of rows in `table`.
    pub fn row_count(&self, table: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", table_ident(table)),
            [],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as usize)
    }

    /// Run `sql`, which must select a date and an amount, in that order.
    ///
    /// Dates stored as text are parsed with the cleaner's rules; amounts stored
    /// as text go through the currency normalizer, and nulls count as `0.0`.
    pub fn query_dated_amounts(&self, sql: &str, params: &[Value]) -> Result<Vec<DatedAmount>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                let date: Value = row.get(0)?;
                let amount: Value = row.get(1)?;
                Ok(DatedAmount {
                    date: value_to_datetime(&date),
                    amount: value_to_amount(&amount),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        debug!("Query returned {} rows", rows.len());
        Ok(rows)
    }
}

/// Quote a table name for interpolation into SQL.
pub fn table_ident(table: &str) -> String {
    quote_ident(table)
}

fn value_to_datetime(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Text(text) => parse_date(text),
        _ => None,
    }
}

fn value_to_amount(value: &Value) -> f64 {
    match value {
        Value::Real(v) if v.is_finite() => *v,
        Value::Integer(v) => *v as f64,
        Value::Text(text) => parse_brl_amount(text),
        _ => 0.0,
    }
}

/// Convert a series to SQLite values plus its declared type.
fn column_values(series: &Series) -> Result<(SqlType, Vec<Value>)> {
    let sql_type = SqlType::for_dtype(series.dtype());

    let values = match sql_type {
        SqlType::Real => series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| match v {
                Some(v) if !v.is_nan() => Value::Real(v),
                _ => Value::Null,
            })
            .collect(),
        SqlType::Integer => series
            .cast(&DataType::Int64)?
            .i64()?
            .into_iter()
            .map(|v| v.map_or(Value::Null, Value::Integer))
            .collect(),
        SqlType::Timestamp => series
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
            .cast(&DataType::Int64)?
            .i64()?
            .into_iter()
            .map(|v| {
                v.and_then(format_sql_timestamp)
                    .map_or(Value::Null, Value::Text)
            })
            .collect(),
        SqlType::Text => series
            .cast(&DataType::String)?
            .str()?
            .into_iter()
            .map(|v| v.map_or(Value::Null, |s| Value::Text(s.to_string())))
            .collect(),
    };

    Ok((sql_type, values))
}
