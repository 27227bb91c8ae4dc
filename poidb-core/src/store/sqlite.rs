//! SQLite adapter for the [`Backend`] capability.

use std::{fmt, path::Path};

use rusqlite::{
    Connection, OpenFlags, params_from_iter,
    types::{ToSqlOutput, Value, ValueRef},
};

use super::backend::{Backend, BackendError, Row, SqlValue};

/// Prepared statements kept per connection. Bounding-box queries vary in
/// shape with the number of tag patterns, so leave room beyond the fixed
/// statement set.
const STATEMENT_CACHE_CAPACITY: usize = 64;

/// [`Backend`] over a `rusqlite` connection.
///
/// Statements are served from the connection's prepared-statement cache, so
/// repeated lookups reuse their compiled form.
pub struct SqliteBackend {
    connection: Connection,
}

impl fmt::Debug for SqliteBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteBackend")
            .field("path", &self.connection.path())
            .finish_non_exhaustive()
    }
}

impl SqliteBackend {
    /// Open the database at `path`.
    ///
    /// Writable connections create the file when it does not exist;
    /// read-only connections require it to exist already.
    pub fn open(path: &Path, read_only: bool) -> Result<Self, BackendError> {
        let access = if read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY
        } else {
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
        };
        let connection = Connection::open_with_flags(path, access | OpenFlags::SQLITE_OPEN_NO_MUTEX)?;
        Ok(Self::from_connection(connection))
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, BackendError> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    fn from_connection(connection: Connection) -> Self {
        connection.set_prepared_statement_cache_capacity(STATEMENT_CACHE_CAPACITY);
        Self { connection }
    }
}

struct Param<'a>(&'a SqlValue);

impl rusqlite::ToSql for Param<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self.0 {
            SqlValue::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            SqlValue::Integer(value) => ToSqlOutput::Borrowed(ValueRef::Integer(*value)),
            SqlValue::Real(value) => ToSqlOutput::Borrowed(ValueRef::Real(*value)),
            SqlValue::Text(value) => ToSqlOutput::Borrowed(ValueRef::Text(value.as_bytes())),
        })
    }
}

fn bind(params: &[SqlValue]) -> impl rusqlite::Params + '_ {
    params_from_iter(params.iter().map(Param))
}

fn column_value(value: Value, index: usize) -> Result<SqlValue, BackendError> {
    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::Integer(value) => Ok(SqlValue::Integer(value)),
        Value::Real(value) => Ok(SqlValue::Real(value)),
        Value::Text(value) => Ok(SqlValue::Text(value)),
        Value::Blob(_) => Err(BackendError::ColumnType {
            index,
            expected: "scalar",
            found: "blob",
        }),
    }
}

impl Backend for SqliteBackend {
    fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<usize, BackendError> {
        let mut statement = self.connection.prepare_cached(sql)?;
        Ok(statement.execute(bind(params))?)
    }

    fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, BackendError> {
        let mut statement = self.connection.prepare_cached(sql)?;
        let columns = statement.column_count();
        let mut rows = statement.query(bind(params))?;
        let mut materialised = Vec::new();
        while let Some(row) = rows.next()? {
            let values = (0..columns)
                .map(|index| column_value(row.get(index)?, index))
                .collect::<Result<Vec<_>, BackendError>>()?;
            materialised.push(Row::new(values));
        }
        Ok(materialised)
    }

    fn execute_batch(&self, sql: &str) -> Result<(), BackendError> {
        Ok(self.connection.execute_batch(sql)?)
    }

    fn begin(&self) -> Result<(), BackendError> {
        self.execute_batch("BEGIN")
    }

    fn commit(&self) -> Result<(), BackendError> {
        self.execute_batch("COMMIT")
    }

    fn rollback(&self) -> Result<(), BackendError> {
        self.execute_batch("ROLLBACK")
    }

    fn close(self) -> Result<(), BackendError> {
        self.connection.flush_prepared_statement_cache();
        self.connection
            .close()
            .map_err(|(_connection, source)| BackendError::Sqlite(source))
    }
}
