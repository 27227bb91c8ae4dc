//! Maps tags and category memberships onto the dictionary and association
//! tables.
//!
//! Tag keys and values are deduplicated into `poi_tagkeys` and
//! `poi_tagvalues`; `poi_data` ties a POI to one `(key, value)` pair per key.
//! Category memberships live in `poi_cmap`. Dictionary rows are never removed
//! here; see [`purge_unreferenced_tags`].

use std::collections::BTreeSet;

use crate::{CategoryManager, PoiCategory, Tag, Tags};

use super::{Backend, BackendError, SqlValue, StoreError};

const INSERT_TAG_KEY: &str = "INSERT OR IGNORE INTO poi_tagkeys (key) VALUES (?1)";
const INSERT_TAG_VALUE: &str = "INSERT OR IGNORE INTO poi_tagvalues (value) VALUES (?1)";
const INSERT_TAG_ASSOCIATION: &str = "INSERT OR REPLACE INTO poi_data VALUES (?1, \
     (SELECT id FROM poi_tagkeys WHERE key = ?2), \
     (SELECT id FROM poi_tagvalues WHERE value = ?3))";
const FIND_TAGS_BY_ID: &str = "SELECT poi_tagkeys.key, poi_tagvalues.value \
     FROM poi_data \
     JOIN poi_tagkeys ON poi_data.key = poi_tagkeys.id \
     JOIN poi_tagvalues ON poi_data.value = poi_tagvalues.id \
     WHERE poi_data.id = ?1";
const DELETE_TAGS_BY_ID: &str = "DELETE FROM poi_data WHERE id = ?1";

const INSERT_CATEGORY_ASSOCIATION: &str = "INSERT INTO poi_cmap VALUES (?1, ?2)";
const FIND_CATEGORIES_BY_ID: &str = "SELECT category FROM poi_cmap WHERE id = ?1";
const DELETE_CATEGORIES_BY_ID: &str = "DELETE FROM poi_cmap WHERE id = ?1";

const DELETE_UNREFERENCED_TAG_KEYS: &str = "DELETE FROM poi_tagkeys WHERE id IN \
     (SELECT id FROM poi_tagkeys EXCEPT SELECT key FROM poi_data)";
const DELETE_UNREFERENCED_TAG_VALUES: &str = "DELETE FROM poi_tagvalues WHERE id IN \
     (SELECT id FROM poi_tagvalues EXCEPT SELECT value FROM poi_data)";

/// Dictionary rows removed by an overhead cleanup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TagPurge {
    /// Tag keys no longer referenced by any POI.
    pub keys: usize,
    /// Tag values no longer referenced by any POI.
    pub values: usize,
}

/// Associate `tags` with the POI, registering unseen keys and values.
///
/// A tag whose key the POI already carries replaces the earlier value, so
/// within one call the last tag iterated for a key wins.
pub(crate) fn insert_tags(
    backend: &dyn Backend,
    poi_id: i64,
    tags: &Tags,
) -> Result<(), StoreError> {
    for Tag { key, value } in tags {
        backend
            .execute(INSERT_TAG_KEY, &[key.as_str().into()])
            .map_err(StoreError::query("register tag key"))?;
        backend
            .execute(INSERT_TAG_VALUE, &[value.as_str().into()])
            .map_err(StoreError::query("register tag value"))?;
        backend
            .execute(
                INSERT_TAG_ASSOCIATION,
                &[poi_id.into(), key.as_str().into(), value.as_str().into()],
            )
            .map_err(StoreError::query("associate tag"))?;
    }
    Ok(())
}

/// Reconstruct the literal tags associated with a POI.
pub(crate) fn find_tags_by_id(backend: &dyn Backend, poi_id: i64) -> Result<Tags, StoreError> {
    let rows = backend
        .query(FIND_TAGS_BY_ID, &[poi_id.into()])
        .map_err(StoreError::query("find tags"))?;
    rows.iter()
        .map(|row| -> Result<Tag, BackendError> {
            let key = row.text(0)?;
            let value = row.text(1)?;
            Ok(Tag::new(key, value))
        })
        .collect::<Result<Tags, _>>()
        .map_err(StoreError::query("decode tags"))
}

/// Associate categories with the POI.
///
/// Fails when the POI already belongs to one of the categories.
pub(crate) fn insert_categories(
    backend: &dyn Backend,
    poi_id: i64,
    categories: &BTreeSet<PoiCategory>,
) -> Result<(), StoreError> {
    for category in categories {
        backend
            .execute(
                INSERT_CATEGORY_ASSOCIATION,
                &[poi_id.into(), category.id.into()],
            )
            .map_err(StoreError::query("associate category"))?;
    }
    Ok(())
}

/// Resolve the categories associated with a POI.
pub(crate) fn find_categories_by_id(
    backend: &dyn Backend,
    manager: &dyn CategoryManager,
    poi_id: i64,
) -> Result<BTreeSet<PoiCategory>, StoreError> {
    let rows = backend
        .query(FIND_CATEGORIES_BY_ID, &[poi_id.into()])
        .map_err(StoreError::query("find categories"))?;
    let mut categories = BTreeSet::new();
    for row in rows {
        let id = row
            .integer(0)
            .map_err(StoreError::query("decode categories"))?;
        categories.insert(manager.category(id)?.clone());
    }
    Ok(categories)
}

/// Remove every tag and category association of a POI.
pub(crate) fn delete_associations(backend: &dyn Backend, poi_id: i64) -> Result<(), StoreError> {
    let id = [SqlValue::Integer(poi_id)];
    backend
        .execute(DELETE_TAGS_BY_ID, &id)
        .map_err(StoreError::query("delete tag associations"))?;
    backend
        .execute(DELETE_CATEGORIES_BY_ID, &id)
        .map_err(StoreError::query("delete category associations"))?;
    Ok(())
}

/// Delete dictionary entries that no association references.
pub(crate) fn purge_unreferenced_tags(backend: &dyn Backend) -> Result<TagPurge, StoreError> {
    let keys = backend
        .execute(DELETE_UNREFERENCED_TAG_KEYS, &[])
        .map_err(StoreError::query("delete unreferenced tag keys"))?;
    let values = backend
        .execute(DELETE_UNREFERENCED_TAG_VALUES, &[])
        .map_err(StoreError::query("delete unreferenced tag values"))?;
    Ok(TagPurge { keys, values })
}

#[cfg(all(test, feature = "store-sqlite"))]
mod tests {
    use super::*;
    use crate::store::{SqliteBackend, schema};
    use crate::{CategoryTree, UnknownCategoryError};
    use rstest::{fixture, rstest};

    #[fixture]
    fn backend() -> SqliteBackend {
        let backend = SqliteBackend::open_in_memory().expect("open in-memory database");
        schema::create_tables(&backend).expect("create tables");
        backend
    }

    fn count(backend: &SqliteBackend, sql: &str) -> i64 {
        backend.query(sql, &[]).expect("count rows")[0]
            .integer(0)
            .expect("count")
    }

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs.iter().map(|(k, v)| Tag::new(*k, *v)).collect()
    }

    #[rstest]
    fn tags_round_trip_through_dictionaries(backend: SqliteBackend) {
        let stored = tags(&[("amenity", "cafe"), ("name", "Joe's")]);
        insert_tags(&backend, 1, &stored).expect("insert tags");
        assert_eq!(find_tags_by_id(&backend, 1).expect("find tags"), stored);
    }

    #[rstest]
    fn shared_keys_and_values_use_one_dictionary_row(backend: SqliteBackend) {
        let shared = tags(&[("amenity", "cafe")]);
        for poi_id in 0..1000 {
            insert_tags(&backend, poi_id, &shared).expect("insert tags");
        }
        assert_eq!(count(&backend, "SELECT count(*) FROM poi_tagkeys"), 1);
        assert_eq!(count(&backend, "SELECT count(*) FROM poi_tagvalues"), 1);
        assert_eq!(count(&backend, "SELECT count(*) FROM poi_data"), 1000);
    }

    #[rstest]
    fn later_value_for_a_key_replaces_earlier_one(backend: SqliteBackend) {
        insert_tags(&backend, 5, &tags(&[("amenity", "cafe")])).expect("first insert");
        insert_tags(&backend, 5, &tags(&[("amenity", "bar")])).expect("second insert");
        assert_eq!(
            find_tags_by_id(&backend, 5).expect("find tags"),
            tags(&[("amenity", "bar")])
        );
    }

    #[rstest]
    fn categories_resolve_through_the_manager(backend: SqliteBackend) {
        let tree = CategoryTree::from_categories([
            PoiCategory::new(7, "Cafe", None),
            PoiCategory::new(8, "Bar", None),
        ]);
        let memberships: BTreeSet<_> = tree.iter().cloned().collect();
        insert_categories(&backend, 3, &memberships).expect("insert categories");
        assert_eq!(
            find_categories_by_id(&backend, &tree, 3).expect("find categories"),
            memberships
        );
    }

    #[rstest]
    fn duplicate_category_association_fails(backend: SqliteBackend) {
        let memberships = BTreeSet::from([PoiCategory::new(7, "Cafe", None)]);
        insert_categories(&backend, 3, &memberships).expect("first insert");
        let err = insert_categories(&backend, 3, &memberships).expect_err("duplicate pair");
        assert!(matches!(
            err,
            StoreError::Query {
                operation: "associate category",
                ..
            }
        ));
    }

    #[rstest]
    fn unresolvable_category_is_reported(backend: SqliteBackend) {
        let memberships = BTreeSet::from([PoiCategory::new(42, "Ghost", None)]);
        insert_categories(&backend, 3, &memberships).expect("insert categories");
        let err = find_categories_by_id(&backend, &CategoryTree::default(), 3)
            .expect_err("unknown category");
        assert!(matches!(
            err,
            StoreError::UnknownCategory(UnknownCategoryError { id: 42 })
        ));
    }

    #[rstest]
    fn purge_removes_only_unreferenced_entries(backend: SqliteBackend) {
        insert_tags(&backend, 1, &tags(&[("amenity", "bar")])).expect("insert first");
        insert_tags(&backend, 2, &tags(&[("amenity", "bar"), ("name", "Joe's")]))
            .expect("insert second");
        delete_associations(&backend, 2).expect("delete second");

        let purge = purge_unreferenced_tags(&backend).expect("purge");

        assert_eq!(purge, TagPurge { keys: 1, values: 1 });
        assert_eq!(count(&backend, "SELECT count(*) FROM poi_tagkeys"), 1);
        assert_eq!(
            find_tags_by_id(&backend, 1).expect("find tags"),
            tags(&[("amenity", "bar")])
        );
    }
}
