//! Shared fixtures for unit, behaviour and CLI tests.

use std::collections::BTreeSet;

use geo::Coord;

use crate::{CategoryManager, CategoryTree, PoiCategory, PointOfInterest, Tag};

#[cfg(feature = "store-sqlite")]
use crate::{PoiPersistenceManager, SqliteBackend, StoreError};

/// A small two-level category tree.
///
/// ```text
/// 1 Amenity
/// ├── 7 Cafe
/// └── 8 Bar
///     └── 9 Pub
/// 20 Shop
/// └── 21 Bakery
/// ```
pub fn category_tree() -> CategoryTree {
    CategoryTree::from_categories([
        PoiCategory::new(1, "Amenity", None),
        PoiCategory::new(7, "Cafe", Some(1)),
        PoiCategory::new(8, "Bar", Some(1)),
        PoiCategory::new(9, "Pub", Some(8)),
        PoiCategory::new(20, "Shop", None),
        PoiCategory::new(21, "Bakery", Some(20)),
    ])
}

/// A POI without tags or categories at `(latitude, longitude)`.
pub fn poi(id: i64, latitude: f64, longitude: f64) -> PointOfInterest {
    PointOfInterest::at(
        id,
        Coord {
            x: longitude,
            y: latitude,
        },
    )
}

/// Builder for POIs with tags and categories from [`category_tree`].
///
/// # Examples
/// ```
/// use poidb_core::test_support::PoiBuilder;
///
/// let poi = PoiBuilder::new(1, 10.0, 10.0)
///     .tag("amenity", "cafe")
///     .category(7)
///     .build();
/// assert_eq!(poi.tag_value("amenity"), Some("cafe"));
/// assert_eq!(poi.categories.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct PoiBuilder {
    id: i64,
    location: Coord<f64>,
    tags: BTreeSet<Tag>,
    categories: BTreeSet<PoiCategory>,
}

impl PoiBuilder {
    /// Start a POI at `(latitude, longitude)`.
    pub fn new(id: i64, latitude: f64, longitude: f64) -> Self {
        Self {
            id,
            location: Coord {
                x: longitude,
                y: latitude,
            },
            tags: BTreeSet::new(),
            categories: BTreeSet::new(),
        }
    }

    /// Add a tag.
    #[must_use]
    pub fn tag(mut self, key: &str, value: &str) -> Self {
        self.tags.insert(Tag::new(key, value));
        self
    }

    /// Add a category from the fixture tree. Identifiers outside the tree
    /// get a placeholder root category.
    #[must_use]
    pub fn category(mut self, id: i64) -> Self {
        let category = category_tree()
            .category(id)
            .cloned()
            .unwrap_or_else(|_| PoiCategory::new(id, format!("Category {id}"), None));
        self.categories.insert(category);
        self
    }

    /// Finish the POI.
    pub fn build(self) -> PointOfInterest {
        PointOfInterest::new(self.id, self.location, self.tags, self.categories)
    }
}

/// Writable in-memory store seeded with [`category_tree`].
#[cfg(feature = "store-sqlite")]
pub fn seeded_store() -> Result<PoiPersistenceManager<SqliteBackend>, StoreError> {
    let mut store = PoiPersistenceManager::in_memory()?;
    let categories: Vec<_> = category_tree().iter().cloned().collect();
    store.insert_categories(&categories)?;
    Ok(store)
}
