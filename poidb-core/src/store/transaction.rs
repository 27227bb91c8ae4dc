//! Explicit transaction scope shared by every multi-statement mutation.

use log::{error, warn};

use super::{Backend, StoreError};

/// Run `work` inside a transaction.
///
/// A failure inside `work` or at commit issues an explicit `ROLLBACK`. If the
/// rollback fails too, the rollback failure is returned and the original
/// error is logged.
pub(crate) fn in_transaction<T, F>(
    backend: &dyn Backend,
    operation: &'static str,
    work: F,
) -> Result<T, StoreError>
where
    F: FnOnce(&dyn Backend) -> Result<T, StoreError>,
{
    backend.begin().map_err(|source| StoreError::Transaction {
        stage: "begin",
        source,
    })?;

    let err = match work(backend) {
        Ok(value) => match backend.commit() {
            Ok(()) => return Ok(value),
            Err(source) => StoreError::Transaction {
                stage: "commit",
                source,
            },
        },
        Err(err) => err,
    };

    warn!("Rolling back {operation}: {err}");
    if let Err(source) = backend.rollback() {
        error!("Rollback of {operation} failed; original error: {err}");
        return Err(StoreError::Transaction {
            stage: "rollback",
            source,
        });
    }
    Err(err)
}

#[cfg(all(test, feature = "store-sqlite"))]
mod tests {
    use super::*;
    use crate::store::{BackendError, SqliteBackend};
    use rstest::{fixture, rstest};

    #[fixture]
    fn backend() -> SqliteBackend {
        let backend = SqliteBackend::open_in_memory().expect("open in-memory database");
        backend
            .execute_batch("CREATE TABLE sample (id INTEGER PRIMARY KEY)")
            .expect("create table");
        backend
    }

    fn rows(backend: &SqliteBackend) -> i64 {
        backend.query("SELECT count(*) FROM sample", &[]).expect("count rows")[0]
            .integer(0)
            .expect("count")
    }

    #[rstest]
    fn commits_successful_work(backend: SqliteBackend) {
        let value = in_transaction(&backend, "insert sample", |tx| {
            tx.execute("INSERT INTO sample VALUES (1)", &[])
                .map_err(StoreError::query("insert sample"))?;
            Ok(42)
        })
        .expect("transaction succeeds");
        assert_eq!(value, 42);
        assert_eq!(rows(&backend), 1);
    }

    #[rstest]
    fn rolls_back_failed_work(backend: SqliteBackend) {
        let err = in_transaction(&backend, "insert sample", |tx| {
            tx.execute("INSERT INTO sample VALUES (1)", &[])
                .map_err(StoreError::query("insert sample"))?;
            tx.execute("INSERT INTO sample VALUES (1)", &[])
                .map_err(StoreError::query("insert sample"))?;
            Ok(())
        })
        .expect_err("duplicate key");

        assert!(matches!(err, StoreError::Query { operation: "insert sample", .. }));
        assert_eq!(rows(&backend), 0);
        // No transaction is left open.
        backend.begin().expect("begin a fresh transaction");
        backend.rollback().expect("rollback");
    }

    #[rstest]
    fn begin_failure_is_a_transaction_error(backend: SqliteBackend) {
        backend.begin().expect("outer transaction");
        let err = in_transaction(&backend, "nested", |_| Ok(())).expect_err("nested begin");
        assert!(matches!(
            err,
            StoreError::Transaction {
                stage: "begin",
                source: BackendError::Sqlite(_),
            }
        ));
    }
}
