use std::path::PathBuf;

use thiserror::Error;

use crate::UnknownCategoryError;

use super::backend::BackendError;

/// Errors raised by [`PoiPersistenceManager`](super::PoiPersistenceManager).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be opened or created.
    #[error("failed to open POI store at {path:?}")]
    Open {
        /// Location of the store on disk.
        path: PathBuf,
        /// Source error returned by the backend.
        #[source]
        source: BackendError,
    },
    /// Creating or validating the schema failed.
    #[error("failed to execute schema step '{step}'")]
    Schema {
        /// Schema step that failed.
        step: &'static str,
        /// Source error returned by the backend.
        #[source]
        source: BackendError,
    },
    /// A read-only store does not carry the required tables.
    #[error("POI store has {found} of {expected} required tables")]
    InvalidSchema {
        /// Number of required tables present.
        found: i64,
        /// Number of required tables.
        expected: i64,
    },
    /// A category association references an unknown category.
    #[error(transparent)]
    UnknownCategory(#[from] UnknownCategoryError),
    /// A statement failed while reading or mutating the store.
    #[error("failed to {operation}")]
    Query {
        /// Operation being executed.
        operation: &'static str,
        /// Source error returned by the backend.
        #[source]
        source: BackendError,
    },
    /// Beginning, committing or rolling back a transaction failed.
    #[error("failed to {stage} transaction")]
    Transaction {
        /// Transaction stage that failed.
        stage: &'static str,
        /// Source error returned by the backend.
        #[source]
        source: BackendError,
    },
    /// A POI carries a location outside the WGS84 range.
    #[error("POI {id} has an invalid location ({latitude}, {longitude})")]
    InvalidLocation {
        /// Identifier of the offending POI.
        id: i64,
        /// Latitude in degrees.
        latitude: f64,
        /// Longitude in degrees.
        longitude: f64,
    },
    /// A mutation was attempted on a read-only store.
    #[error("POI store was opened read-only")]
    ReadOnly,
    /// The manager has already been closed.
    #[error("POI store is closed")]
    Closed,
}

impl StoreError {
    pub(crate) fn query(operation: &'static str) -> impl FnOnce(BackendError) -> Self {
        move |source| Self::Query { operation, source }
    }

    pub(crate) fn schema(step: &'static str) -> impl FnOnce(BackendError) -> Self {
        move |source| Self::Schema { step, source }
    }
}
