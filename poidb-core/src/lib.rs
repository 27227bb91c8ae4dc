//! Core domain types and persistence engine for POI stores.
//!
//! A store keeps points of interest in a relational backing store with an
//! R\*-tree spatial index. Tag keys and values are deduplicated into
//! dictionary tables, and each POI records its category memberships.
//!
//! The [`store`] module holds the engine: schema management, the tag and
//! category normaliser, the bounding-box query compiler and the
//! [`PoiPersistenceManager`] that coordinates them. Backends plug in through
//! the [`store::Backend`] trait; the SQLite adapter ships behind the
//! `store-sqlite` feature.
#![forbid(unsafe_code)]

mod category;
mod file_info;
mod poi;
pub mod store;
pub mod test_support;

pub use category::{CategoryFilter, CategoryManager, CategoryTree, PoiCategory, UnknownCategoryError};
pub use file_info::{FileInfo, MetadataKey};
pub use poi::{PointOfInterest, Tag, TagPattern, Tags};
pub use store::{PoiPersistenceManager, StoreConfig, StoreError, TagPurge};

#[cfg(feature = "store-sqlite")]
pub use store::SqliteBackend;
