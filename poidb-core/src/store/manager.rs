//! Orchestration of reads and writes over one store handle.

use geo::{Coord, Rect};
use log::{debug, error};

use crate::{
    CategoryFilter, CategoryTree, FileInfo, PoiCategory, PointOfInterest, TagPattern,
};

use super::{
    Backend, BackendError, NUMBER_OF_TABLES, Row, StoreError, TagPurge, normalizer,
    query::{RectQuery, compile_rect_query},
    schema,
    transaction::in_transaction,
};

#[cfg(feature = "store-sqlite")]
use super::{SqliteBackend, StoreConfig};
#[cfg(feature = "store-sqlite")]
use std::path::{Path, PathBuf};

const LOAD_CATEGORIES: &str = "SELECT id, name, parent FROM poi_categories";
const INSERT_CATEGORY: &str = "INSERT OR REPLACE INTO poi_categories VALUES (?1, ?2, ?3)";
const FIND_BY_ID: &str = "SELECT id, lat, lon FROM poi_index WHERE id = ?1";
// Column order is id, minLat, maxLat, minLon, maxLon, lat, lon; points
// repeat each coordinate.
const INSERT_INDEX: &str =
    "INSERT OR REPLACE INTO poi_index VALUES (?1, ?2, ?2, ?3, ?3, ?2, ?3)";
const DELETE_INDEX: &str = "DELETE FROM poi_index WHERE id = ?1";
const FIND_METADATA: &str = "SELECT name, value FROM metadata";
const DELETE_METADATA: &str = "DELETE FROM metadata";
const INSERT_METADATA: &str = "INSERT INTO metadata VALUES (?1, ?2)";

/// Persistence manager for a POI store.
///
/// The manager owns one backend connection and the category tree loaded from
/// it. Reads take `&self`; mutations take `&mut self` and run inside explicit
/// transactions that roll back on any failure. Once closed, every operation
/// fails with [`StoreError::Closed`].
///
/// # Examples
/// ```
/// use geo::Coord;
/// use poidb_core::{PoiPersistenceManager, PointOfInterest};
///
/// # fn main() -> Result<(), poidb_core::StoreError> {
/// let mut store = PoiPersistenceManager::in_memory()?;
/// let poi = PointOfInterest::at(1, Coord { x: 13.5, y: 52.5 });
/// store.insert_point_of_interest(&poi)?;
///
/// assert_eq!(store.find_point_by_id(1)?, Some(poi));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct PoiPersistenceManager<B: Backend> {
    backend: Option<B>,
    categories: CategoryTree,
    read_only: bool,
}

#[cfg(feature = "store-sqlite")]
impl PoiPersistenceManager<SqliteBackend> {
    /// Open the SQLite store at `path`.
    ///
    /// Writable stores are created when absent and have their tables
    /// recreated when the schema is incomplete. Read-only stores must exist
    /// and carry a valid schema.
    pub fn open(path: impl AsRef<Path>, read_only: bool) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let backend = SqliteBackend::open(path, read_only).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        // A file that is not a database only fails on its first read.
        let found = schema::table_count(&backend).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(
            "Opened POI store at {} (read_only={read_only})",
            path.display()
        );
        Self::with_table_count(backend, read_only, found)
    }

    /// Open the store described by `config`.
    pub fn open_with(config: &StoreConfig) -> Result<Self, StoreError> {
        Self::open(&config.path, config.read_only)
    }

    /// Create a writable store held in memory.
    pub fn in_memory() -> Result<Self, StoreError> {
        let backend = SqliteBackend::open_in_memory().map_err(|source| StoreError::Open {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        Self::with_backend(backend, false)
    }
}

impl<B: Backend> PoiPersistenceManager<B> {
    /// Wrap an open backend connection.
    ///
    /// Validates the schema first. A writable store with missing tables has
    /// all tables recreated; a read-only one fails with
    /// [`StoreError::InvalidSchema`].
    pub fn with_backend(backend: B, read_only: bool) -> Result<Self, StoreError> {
        let found = schema::count_tables(&backend)?;
        Self::with_table_count(backend, read_only, found)
    }

    fn with_table_count(backend: B, read_only: bool, found: i64) -> Result<Self, StoreError> {
        if found != NUMBER_OF_TABLES {
            if read_only {
                return Err(StoreError::InvalidSchema {
                    found,
                    expected: NUMBER_OF_TABLES,
                });
            }
            schema::create_tables(&backend)?;
        }
        let categories = load_categories(&backend)?;
        debug!("Loaded {} POI categories", categories.len());
        Ok(Self {
            backend: Some(backend),
            categories,
            read_only,
        })
    }

    fn backend(&self) -> Result<&B, StoreError> {
        self.backend.as_ref().ok_or(StoreError::Closed)
    }

    fn writable_backend(&self) -> Result<&B, StoreError> {
        let backend = self.backend()?;
        if self.read_only {
            return Err(StoreError::ReadOnly);
        }
        Ok(backend)
    }

    /// Whether the store was opened without write access.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Whether [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        self.backend.is_none()
    }

    /// Whether every required table exists.
    pub fn is_valid(&self) -> Result<bool, StoreError> {
        schema::is_valid(self.backend()?)
    }

    /// Categories known to the store.
    pub fn category_manager(&self) -> &CategoryTree {
        &self.categories
    }

    /// Look up one POI. Returns `None` when no POI has the identifier.
    pub fn find_point_by_id(&self, id: i64) -> Result<Option<PointOfInterest>, StoreError> {
        let backend = self.backend()?;
        let rows = backend
            .query(FIND_BY_ID, &[id.into()])
            .map_err(StoreError::query("find index row"))?;
        rows.first()
            .map(|row| hydrate(backend, &self.categories, row))
            .transpose()
    }

    /// POIs inside `bounds` that pass `filter` and match every pattern.
    ///
    /// Boundary points are included. `None` applies no category restriction;
    /// a `limit` of 0 returns every match. Results arrive in the backing
    /// engine's order, which is not stable across calls.
    pub fn find_in_rect(
        &self,
        bounds: &Rect<f64>,
        filter: Option<&CategoryFilter>,
        patterns: &[TagPattern],
        limit: usize,
    ) -> Result<Vec<PointOfInterest>, StoreError> {
        let backend = self.backend()?;
        let compiled = compile_rect_query(&RectQuery {
            bounds,
            filter,
            patterns,
            limit,
        });
        let rows = backend
            .query(compiled.sql(), &compiled.params())
            .map_err(StoreError::query("search bounding box"))?;
        rows.iter()
            .map(|row| hydrate(backend, &self.categories, row))
            .collect()
    }

    /// Insert one POI.
    pub fn insert_point_of_interest(&mut self, poi: &PointOfInterest) -> Result<(), StoreError> {
        self.insert_points_of_interest(std::slice::from_ref(poi))
    }

    /// Insert a batch of POIs in one transaction.
    ///
    /// Nothing from the batch is kept when any POI fails, including a POI
    /// with an out-of-range location or a category it already belongs to.
    pub fn insert_points_of_interest(
        &mut self,
        pois: &[PointOfInterest],
    ) -> Result<(), StoreError> {
        let backend = self.writable_backend()?;
        in_transaction(backend, "POI insert", |tx| {
            pois.iter().try_for_each(|poi| insert_one(tx, poi))
        })?;
        debug!("Inserted {} POIs", pois.len());
        Ok(())
    }

    /// Delete a POI with its tag and category associations.
    pub fn remove_point_of_interest(&mut self, poi: &PointOfInterest) -> Result<(), StoreError> {
        self.remove_point_by_id(poi.id).map(|_| ())
    }

    /// Delete the POI with `id`. Returns whether an index row was removed.
    ///
    /// Dictionary entries stay behind; see
    /// [`remove_unreferenced_tags`](Self::remove_unreferenced_tags).
    pub fn remove_point_by_id(&mut self, id: i64) -> Result<bool, StoreError> {
        let backend = self.writable_backend()?;
        in_transaction(backend, "POI removal", |tx| {
            let removed = tx
                .execute(DELETE_INDEX, &[id.into()])
                .map_err(StoreError::query("delete index row"))?;
            normalizer::delete_associations(tx, id)?;
            Ok(removed > 0)
        })
    }

    /// Delete tag keys and values no POI references any more.
    pub fn remove_unreferenced_tags(&mut self) -> Result<TagPurge, StoreError> {
        let backend = self.writable_backend()?;
        let purge = in_transaction(backend, "tag cleanup", normalizer::purge_unreferenced_tags)?;
        debug!(
            "Removed {} unreferenced tag keys and {} tag values",
            purge.keys, purge.values
        );
        Ok(purge)
    }

    /// Insert or replace categories and add them to the category tree.
    pub fn insert_categories(&mut self, categories: &[PoiCategory]) -> Result<(), StoreError> {
        let backend = self.writable_backend()?;
        in_transaction(backend, "category insert", |tx| {
            insert_category_rows(tx, categories)
        })?;
        self.categories.extend(categories.iter().cloned());
        Ok(())
    }

    /// Write categories, optional metadata and POIs in one transaction.
    ///
    /// Either everything is stored or, on any failure, nothing is: the
    /// category tree and the metadata table keep their previous contents.
    pub fn import(
        &mut self,
        categories: &[PoiCategory],
        info: Option<&FileInfo>,
        pois: &[PointOfInterest],
    ) -> Result<(), StoreError> {
        let backend = self.writable_backend()?;
        in_transaction(backend, "import", |tx| {
            insert_category_rows(tx, categories)?;
            if let Some(metadata) = info {
                replace_metadata(tx, metadata)?;
            }
            pois.iter().try_for_each(|poi| insert_one(tx, poi))
        })?;
        self.categories.extend(categories.iter().cloned());
        debug!(
            "Imported {} categories and {} POIs",
            categories.len(),
            pois.len()
        );
        Ok(())
    }

    /// Decode the store's metadata table.
    pub fn poi_file_info(&self) -> Result<FileInfo, StoreError> {
        let rows = self
            .backend()?
            .query(FIND_METADATA, &[])
            .map_err(StoreError::query("read metadata"))?;
        let entries = rows
            .iter()
            .map(|row| Ok((row.text(0)?, row.optional_text(1)?)))
            .collect::<Result<Vec<_>, BackendError>>()
            .map_err(StoreError::query("decode metadata"))?;
        Ok(FileInfo::from_metadata(entries))
    }

    /// Replace the store's metadata with `info`.
    pub fn write_file_info(&mut self, info: &FileInfo) -> Result<(), StoreError> {
        let backend = self.writable_backend()?;
        in_transaction(backend, "metadata write", |tx| replace_metadata(tx, info))
    }

    /// Release the connection. Safe to call more than once.
    ///
    /// Release failures are logged rather than returned.
    pub fn close(&mut self) {
        self.categories.clear();
        let Some(backend) = self.backend.take() else {
            return;
        };
        match backend.close() {
            Ok(()) => debug!("Closed POI store"),
            Err(err) => error!("Failed to close POI store connection: {err}"),
        }
    }
}

impl<B: Backend> Drop for PoiPersistenceManager<B> {
    fn drop(&mut self) {
        self.close();
    }
}

fn load_categories(backend: &dyn Backend) -> Result<CategoryTree, StoreError> {
    let rows = backend
        .query(LOAD_CATEGORIES, &[])
        .map_err(StoreError::query("load categories"))?;
    rows.iter()
        .map(|row| -> Result<PoiCategory, BackendError> {
            Ok(PoiCategory::new(
                row.integer(0)?,
                row.text(1)?,
                row.optional_integer(2)?,
            ))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(CategoryTree::from_categories)
        .map_err(StoreError::query("decode categories"))
}

fn insert_category_rows(backend: &dyn Backend, categories: &[PoiCategory]) -> Result<(), StoreError> {
    categories.iter().try_for_each(|category| {
        backend
            .execute(
                INSERT_CATEGORY,
                &[
                    category.id.into(),
                    category.name.as_str().into(),
                    category.parent.into(),
                ],
            )
            .map(|_| ())
            .map_err(StoreError::query("insert category"))
    })
}

fn replace_metadata(backend: &dyn Backend, info: &FileInfo) -> Result<(), StoreError> {
    backend
        .execute(DELETE_METADATA, &[])
        .map_err(StoreError::query("clear metadata"))?;
    info.to_metadata().into_iter().try_for_each(|(name, value)| {
        backend
            .execute(INSERT_METADATA, &[name.into(), value.into()])
            .map(|_| ())
            .map_err(StoreError::query("insert metadata"))
    })
}

fn insert_one(backend: &dyn Backend, poi: &PointOfInterest) -> Result<(), StoreError> {
    if !poi.has_valid_location() {
        return Err(StoreError::InvalidLocation {
            id: poi.id,
            latitude: poi.latitude(),
            longitude: poi.longitude(),
        });
    }
    backend
        .execute(
            INSERT_INDEX,
            &[poi.id.into(), poi.latitude().into(), poi.longitude().into()],
        )
        .map_err(StoreError::query("insert index row"))?;
    normalizer::insert_tags(backend, poi.id, &poi.tags)?;
    normalizer::insert_categories(backend, poi.id, &poi.categories)
}

fn hydrate(
    backend: &dyn Backend,
    categories: &CategoryTree,
    row: &Row,
) -> Result<PointOfInterest, StoreError> {
    let decode = StoreError::query("decode index row");
    let (id, latitude, longitude) = (|| -> Result<_, BackendError> {
        Ok((row.integer(0)?, row.real(1)?, row.real(2)?))
    })()
    .map_err(decode)?;
    Ok(PointOfInterest::new(
        id,
        Coord {
            x: longitude,
            y: latitude,
        },
        normalizer::find_tags_by_id(backend, id)?,
        normalizer::find_categories_by_id(backend, categories, id)?,
    ))
}

#[cfg(all(test, feature = "store-sqlite"))]
mod tests {
    use super::*;
    use crate::{CategoryManager, Tag, test_support::seeded_store};
    use rstest::{fixture, rstest};
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    type Store = PoiPersistenceManager<SqliteBackend>;

    #[fixture]
    fn store() -> Store {
        seeded_store().expect("open seeded store")
    }

    fn point(id: i64, lat: f64, lon: f64) -> PointOfInterest {
        PointOfInterest::at(id, Coord { x: lon, y: lat })
    }

    #[rstest]
    fn fresh_store_is_valid_and_empty(store: Store) {
        assert!(store.is_valid().expect("validity"));
        assert_eq!(store.find_point_by_id(1).expect("lookup"), None);
    }

    #[rstest]
    fn inserted_categories_refresh_the_tree(mut store: Store) {
        store
            .insert_categories(&[PoiCategory::new(100, "Museum", Some(1))])
            .expect("insert category");
        assert_eq!(
            store.category_manager().category(100).map(|c| c.name.as_str()),
            Ok("Museum")
        );
    }

    #[rstest]
    fn invalid_location_rolls_back_the_batch(mut store: Store) {
        let err = store
            .insert_points_of_interest(&[point(1, 10.0, 10.0), point(2, 91.0, 0.0)])
            .expect_err("latitude out of range");
        assert!(matches!(err, StoreError::InvalidLocation { id: 2, .. }));
        assert_eq!(store.find_point_by_id(1).expect("lookup"), None);
    }

    #[rstest]
    fn failed_import_leaves_categories_and_metadata_untouched(mut store: Store) {
        let before = FileInfo {
            comment: Some("before".into()),
            ..FileInfo::default()
        };
        store.write_file_info(&before).expect("write metadata");
        let known = store.category_manager().len();

        let err = store
            .import(
                &[PoiCategory::new(100, "Museum", None)],
                Some(&FileInfo {
                    comment: Some("after".into()),
                    ..FileInfo::default()
                }),
                &[point(1, 10.0, 10.0), point(2, 0.0, 181.0)],
            )
            .expect_err("longitude out of range");

        assert!(matches!(err, StoreError::InvalidLocation { id: 2, .. }));
        assert_eq!(store.poi_file_info().expect("read metadata"), before);
        assert_eq!(store.category_manager().len(), known);
        assert!(store.category_manager().category(100).is_err());
        assert_eq!(store.find_point_by_id(1).expect("lookup"), None);
    }

    #[rstest]
    fn import_writes_everything_together(mut store: Store) {
        let info = FileInfo {
            writer: Some("poidb".into()),
            ..FileInfo::default()
        };
        store
            .import(
                &[PoiCategory::new(100, "Museum", Some(1))],
                Some(&info),
                &[point(1, 52.516275, 13.377704)],
            )
            .expect("import");

        assert_eq!(store.poi_file_info().expect("read metadata"), info);
        assert!(store.category_manager().category(100).is_ok());
        assert_eq!(
            store.find_point_by_id(1).expect("lookup"),
            Some(point(1, 52.516275, 13.377704))
        );
    }

    #[rstest]
    fn non_database_file_fails_to_open() {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("notes.db");
        std::fs::write(&path, "this is plain text, not an SQLite database file".repeat(20))
            .expect("write plain file");

        for read_only in [true, false] {
            let err = Store::open(&path, read_only).expect_err("not a database");
            assert!(
                matches!(err, StoreError::Open { path: ref p, .. } if p == &path),
                "read_only={read_only}: {err:?}"
            );
        }
    }

    #[rstest]
    fn removal_reports_whether_a_poi_existed(mut store: Store) {
        store
            .insert_point_of_interest(&point(1, 10.0, 10.0))
            .expect("insert");
        assert!(store.remove_point_by_id(1).expect("remove"));
        assert!(!store.remove_point_by_id(1).expect("remove again"));
    }

    #[rstest]
    fn file_info_round_trips_through_metadata(mut store: Store) {
        let info = FileInfo {
            bounds: Some(Rect::new(
                Coord { x: 13.0, y: 52.0 },
                Coord { x: 14.0, y: 53.0 },
            )),
            comment: Some("Berlin extract".into()),
            date: Some(SystemTime::UNIX_EPOCH + Duration::from_millis(1_700_000_000_000)),
            language: Some("de".into()),
            version: Some(2),
            ways: true,
            writer: Some("poidb".into()),
        };
        store.write_file_info(&info).expect("write metadata");
        assert_eq!(store.poi_file_info().expect("read metadata"), info);

        store
            .write_file_info(&FileInfo::default())
            .expect("replace metadata");
        assert_eq!(
            store.poi_file_info().expect("read metadata"),
            FileInfo::default()
        );
    }

    #[rstest]
    fn categories_survive_reopening() {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("pois.db");
        let mut store = Store::open(&path, false).expect("create store");
        store
            .insert_categories(&[PoiCategory::new(7, "Cafe", None)])
            .expect("insert category");
        store.close();

        let reopened = Store::open(&path, true).expect("reopen read-only");
        assert_eq!(reopened.category_manager().len(), 1);
    }

    #[rstest]
    fn read_only_store_rejects_mutations() {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("pois.db");
        drop(Store::open(&path, false).expect("create store"));

        let mut store = Store::open(&path, true).expect("open read-only");
        assert!(store.is_read_only());
        let poi = point(1, 0.0, 0.0);
        assert!(matches!(
            store.insert_point_of_interest(&poi),
            Err(StoreError::ReadOnly)
        ));
        assert!(matches!(
            store.remove_point_of_interest(&poi),
            Err(StoreError::ReadOnly)
        ));
        assert!(matches!(
            store.remove_unreferenced_tags(),
            Err(StoreError::ReadOnly)
        ));
        assert!(matches!(
            store.write_file_info(&FileInfo::default()),
            Err(StoreError::ReadOnly)
        ));
        assert_eq!(store.find_point_by_id(1).expect("reads still work"), None);
    }

    #[rstest]
    fn read_only_store_requires_a_valid_schema() {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("empty.db");
        rusqlite::Connection::open(&path)
            .and_then(|conn| conn.execute_batch("CREATE TABLE metadata (name TEXT, value TEXT)"))
            .expect("create partial store");

        let err = Store::open(&path, true).expect_err("invalid schema");
        assert!(matches!(
            err,
            StoreError::InvalidSchema {
                found: 1,
                expected: NUMBER_OF_TABLES
            }
        ));
    }

    #[rstest]
    fn read_only_open_of_missing_file_fails() {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("missing.db");
        let err = Store::open(&path, true).expect_err("missing store");
        assert!(matches!(err, StoreError::Open { path: ref p, .. } if p == &path));
    }

    #[rstest]
    fn writable_open_repairs_an_incomplete_schema() {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("partial.db");
        rusqlite::Connection::open(&path)
            .and_then(|conn| conn.execute_batch("CREATE TABLE metadata (name TEXT, value TEXT)"))
            .expect("create partial store");

        let store = Store::open(&path, false).expect("open writable");
        assert!(store.is_valid().expect("validity"));
    }

    #[rstest]
    fn closed_store_rejects_every_call(mut store: Store) {
        store.close();
        store.close();
        assert!(store.is_closed());
        assert!(store.category_manager().is_empty());
        assert!(matches!(store.is_valid(), Err(StoreError::Closed)));
        assert!(matches!(store.find_point_by_id(1), Err(StoreError::Closed)));
        assert!(matches!(store.poi_file_info(), Err(StoreError::Closed)));
        assert!(matches!(
            store.insert_point_of_interest(&point(1, 0.0, 0.0)),
            Err(StoreError::Closed)
        ));
    }

    #[rstest]
    fn zero_limit_returns_every_match(mut store: Store) {
        let pois: Vec<_> = (1..=30)
            .map(|id| {
                let mut poi = point(id, 1.0, 1.0);
                poi.tags.insert(Tag::new("amenity", "bench"));
                poi
            })
            .collect();
        store.insert_points_of_interest(&pois).expect("insert");
        let bounds = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 2.0, y: 2.0 });

        assert_eq!(store.find_in_rect(&bounds, None, &[], 0).expect("search").len(), 30);
        assert_eq!(store.find_in_rect(&bounds, None, &[], 7).expect("search").len(), 7);
    }
}
