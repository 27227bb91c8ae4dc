//! Facade crate for the POI persistence engine.
//!
//! This crate re-exports the core domain types and exposes the SQLite-backed
//! store behind a feature flag.

#![forbid(unsafe_code)]

pub use poidb_core::{
    CategoryFilter, CategoryManager, CategoryTree, FileInfo, MetadataKey, PoiCategory,
    PoiPersistenceManager, PointOfInterest, StoreConfig, StoreError, Tag, TagPattern, TagPurge,
    Tags, UnknownCategoryError,
};

#[cfg(feature = "store-sqlite")]
pub use poidb_core::SqliteBackend;

/// Storage engine internals: backends, query compilation and schema constants.
pub use poidb_core::store;
