//! Persistence engine for points of interest.
//!
//! The engine is split into focused submodules:
//! - [`backend`] defines the capability a backing-store connection offers.
//! - `schema` creates and validates the seven-table layout.
//! - `normalizer` maps tags and categories onto dictionary and association
//!   tables.
//! - [`query`] compiles bounding-box searches into parameterised SQL.
//! - `manager` hosts [`PoiPersistenceManager`], which coordinates the above
//!   under explicit transactions.
//!
//! The SQL dialect is SQLite's; the spatial index is an R\*-tree virtual
//! table provided by the backing engine.

pub mod backend;
mod error;
mod manager;
mod normalizer;
pub mod query;
mod schema;
#[cfg(feature = "store-sqlite")]
mod sqlite;
mod transaction;

use std::path::PathBuf;

pub use backend::{Backend, BackendError, Row, SqlValue};
pub use error::StoreError;
pub use manager::PoiPersistenceManager;
pub use normalizer::TagPurge;
pub use schema::{NUMBER_OF_TABLES, TABLE_NAMES};
#[cfg(feature = "store-sqlite")]
pub use sqlite::SqliteBackend;

/// Location and access mode of a store on disk.
///
/// # Examples
/// ```
/// use poidb_core::StoreConfig;
///
/// let config = StoreConfig::read_only("pois.db");
/// assert!(config.read_only);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StoreConfig {
    /// Path to the store file.
    pub path: PathBuf,
    /// Open without write access. Missing stores are not created.
    #[cfg_attr(feature = "serde", serde(default))]
    pub read_only: bool,
}

impl StoreConfig {
    /// Configuration for a writable store, created when absent.
    pub fn writable(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            read_only: false,
        }
    }

    /// Configuration for an existing store opened read-only.
    pub fn read_only(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            read_only: true,
        }
    }
}
