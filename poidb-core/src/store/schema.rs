//! Table layout of a POI store.
//!
//! Table and column names are part of the on-disk format shared with other
//! tools, so they must not change.

use log::debug;

use super::{Backend, BackendError, StoreError, transaction::in_transaction};

/// Tables a valid store must contain.
pub const TABLE_NAMES: [&str; 7] = [
    "metadata",
    "poi_categories",
    "poi_data",
    "poi_index",
    "poi_cmap",
    "poi_tagkeys",
    "poi_tagvalues",
];

/// Number of tables a valid store must contain.
pub const NUMBER_OF_TABLES: i64 = 7;

const COUNT_TABLES: &str = "SELECT count(name) FROM sqlite_master WHERE name IN \
     ('metadata', 'poi_categories', 'poi_data', 'poi_index', 'poi_cmap', 'poi_tagkeys', 'poi_tagvalues')";

/// Drop statements, dependents first.
const DROP_STEPS: [(&str, &str); 7] = [
    ("drop metadata", "DROP TABLE IF EXISTS metadata"),
    ("drop poi_index", "DROP TABLE IF EXISTS poi_index"),
    ("drop poi_data", "DROP TABLE IF EXISTS poi_data"),
    ("drop poi_tagkeys", "DROP TABLE IF EXISTS poi_tagkeys"),
    ("drop poi_tagvalues", "DROP TABLE IF EXISTS poi_tagvalues"),
    ("drop poi_cmap", "DROP TABLE IF EXISTS poi_cmap"),
    ("drop poi_categories", "DROP TABLE IF EXISTS poi_categories"),
];

const CREATE_STEPS: [(&str, &str); 7] = [
    (
        "create poi_categories",
        "CREATE TABLE poi_categories (id INTEGER, name TEXT, parent INTEGER, PRIMARY KEY (id))",
    ),
    (
        "create poi_cmap",
        "CREATE TABLE poi_cmap (id INTEGER, category INTEGER NOT NULL, PRIMARY KEY (id, category))",
    ),
    (
        "create poi_tagkeys",
        "CREATE TABLE poi_tagkeys (id INTEGER, key TEXT, PRIMARY KEY (id), UNIQUE (key))",
    ),
    (
        "create poi_tagvalues",
        "CREATE TABLE poi_tagvalues (id INTEGER, value TEXT, PRIMARY KEY (id), UNIQUE (value))",
    ),
    (
        "create poi_data",
        // One value per key and POI: later inserts for the same key replace
        // the earlier value.
        "CREATE TABLE poi_data (id INTEGER, key INTEGER, value INTEGER, PRIMARY KEY (id, key))",
    ),
    (
        "create poi_index",
        // The rectangle columns hold 32-bit floats rounded outwards; `lat`
        // and `lon` keep the exact coordinates.
        "CREATE VIRTUAL TABLE poi_index USING rtree(id, minLat, maxLat, minLon, maxLon, +lat, +lon)",
    ),
    (
        "create metadata",
        "CREATE TABLE metadata (name TEXT, value TEXT)",
    ),
];

/// Count how many of the required tables exist.
pub(crate) fn count_tables(backend: &dyn Backend) -> Result<i64, StoreError> {
    table_count(backend).map_err(StoreError::schema("count tables"))
}

/// The first read of a freshly opened store; fails when the file is not a
/// database.
pub(crate) fn table_count(backend: &dyn Backend) -> Result<i64, BackendError> {
    backend
        .query(COUNT_TABLES, &[])?
        .first()
        .map_or(Ok(0), |row| row.integer(0))
}

/// Whether every required table exists.
pub(crate) fn is_valid(backend: &dyn Backend) -> Result<bool, StoreError> {
    Ok(count_tables(backend)? == NUMBER_OF_TABLES)
}

/// Drop and recreate every table inside one transaction.
///
/// Destructive: existing POIs, categories and metadata are lost.
pub(crate) fn create_tables(backend: &dyn Backend) -> Result<(), StoreError> {
    debug!("Creating POI store tables");
    in_transaction(backend, "schema creation", |tx| {
        DROP_STEPS
            .iter()
            .chain(CREATE_STEPS.iter())
            .try_for_each(|&(step, sql)| tx.execute_batch(sql).map_err(StoreError::schema(step)))
    })
}
