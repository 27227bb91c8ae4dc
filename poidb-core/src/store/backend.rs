//! Capability interface for backing-store connections.
//!
//! The engine issues SQLite-dialect statements with positional parameters
//! through [`Backend`]. Adapters own the connection, statement caching and
//! transaction primitives; everything else lives in the engine.

use thiserror::Error;

/// A positional bind parameter or a column value read back from a row.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL `NULL`.
    Null,
    /// A 64-bit signed integer.
    Integer(i64),
    /// A double-precision float.
    Real(f64),
    /// UTF-8 text.
    Text(String),
}

impl SqlValue {
    const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::Text(_) => "text",
        }
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Option<i64>> for SqlValue {
    fn from(value: Option<i64>) -> Self {
        value.map_or(Self::Null, Self::Integer)
    }
}

/// Errors raised by backends and by typed row access.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The SQLite driver reported a failure.
    #[cfg(feature = "store-sqlite")]
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    /// A column held a value of an unexpected type.
    #[error("column {index} holds a {found} value, expected {expected}")]
    ColumnType {
        /// Zero-based column index.
        index: usize,
        /// Type requested by the caller.
        expected: &'static str,
        /// Type stored in the row.
        found: &'static str,
    },
    /// The row has fewer columns than requested.
    #[error("row has no column {index}")]
    MissingColumn {
        /// Zero-based column index.
        index: usize,
    },
}

/// A materialised result row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    values: Vec<SqlValue>,
}

impl Row {
    /// Wrap column values in a row.
    pub fn new(values: Vec<SqlValue>) -> Self {
        Self { values }
    }

    fn value(&self, index: usize) -> Result<&SqlValue, BackendError> {
        self.values
            .get(index)
            .ok_or(BackendError::MissingColumn { index })
    }

    /// Read an integer column.
    pub fn integer(&self, index: usize) -> Result<i64, BackendError> {
        match self.value(index)? {
            SqlValue::Integer(value) => Ok(*value),
            other => Err(type_error(index, "integer", other)),
        }
    }

    /// Read a real column. Integer values that fit in `i32` widen to `f64`.
    pub fn real(&self, index: usize) -> Result<f64, BackendError> {
        match self.value(index)? {
            SqlValue::Real(value) => Ok(*value),
            // SQLite may hand back integral reals as integers.
            other @ SqlValue::Integer(value) => i32::try_from(*value)
                .map(f64::from)
                .map_err(|_| type_error(index, "real", other)),
            other => Err(type_error(index, "real", other)),
        }
    }

    /// Read a text column.
    pub fn text(&self, index: usize) -> Result<&str, BackendError> {
        match self.value(index)? {
            SqlValue::Text(value) => Ok(value),
            other => Err(type_error(index, "text", other)),
        }
    }

    /// Read a nullable integer column.
    pub fn optional_integer(&self, index: usize) -> Result<Option<i64>, BackendError> {
        match self.value(index)? {
            SqlValue::Null => Ok(None),
            SqlValue::Integer(value) => Ok(Some(*value)),
            other => Err(type_error(index, "integer", other)),
        }
    }

    /// Read a nullable text column.
    pub fn optional_text(&self, index: usize) -> Result<Option<&str>, BackendError> {
        match self.value(index)? {
            SqlValue::Null => Ok(None),
            SqlValue::Text(value) => Ok(Some(value)),
            other => Err(type_error(index, "text", other)),
        }
    }
}

fn type_error(index: usize, expected: &'static str, found: &SqlValue) -> BackendError {
    BackendError::ColumnType {
        index,
        expected,
        found: found.kind(),
    }
}

/// A connection to a backing store.
///
/// Parameters bind by position, starting at `?1`. Transactions are explicit:
/// the engine calls [`Backend::begin`] and always finishes with either
/// [`Backend::commit`] or [`Backend::rollback`].
pub trait Backend {
    /// Execute a statement and return the number of changed rows.
    fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<usize, BackendError>;

    /// Run a query and materialise every row.
    fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, BackendError>;

    /// Execute one or more parameterless statements.
    fn execute_batch(&self, sql: &str) -> Result<(), BackendError>;

    /// Open a transaction.
    fn begin(&self) -> Result<(), BackendError>;

    /// Commit the open transaction.
    fn commit(&self) -> Result<(), BackendError>;

    /// Abandon the open transaction.
    fn rollback(&self) -> Result<(), BackendError>;

    /// Release cached statements and the connection itself.
    fn close(self) -> Result<(), BackendError>
    where
        Self: Sized;
}
