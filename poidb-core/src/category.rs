//! POI categories, the category manager seam and category filters.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

/// A node in the category tree.
///
/// Categories are ordered by identifier first, so sets of categories iterate
/// in id order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoiCategory {
    /// Unique category identifier.
    pub id: i64,
    /// Human-readable title.
    pub name: String,
    /// Identifier of the parent category; `None` for roots.
    pub parent: Option<i64>,
}

impl PoiCategory {
    /// Construct a category.
    pub fn new(id: i64, name: impl Into<String>, parent: Option<i64>) -> Self {
        Self {
            id,
            name: name.into(),
            parent,
        }
    }
}

/// Raised when a category identifier cannot be resolved.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("unknown POI category {id}")]
pub struct UnknownCategoryError {
    /// Identifier that failed to resolve.
    pub id: i64,
}

/// Resolves category identifiers to category objects.
pub trait CategoryManager {
    /// Look up the category with the given identifier.
    fn category(&self, id: i64) -> Result<&PoiCategory, UnknownCategoryError>;

    /// Direct children of the category with the given identifier.
    fn children(&self, id: i64) -> Vec<&PoiCategory>;
}

/// In-memory category tree keyed by category identifier.
///
/// # Examples
/// ```
/// use poidb_core::{CategoryManager, CategoryTree, PoiCategory};
///
/// let tree = CategoryTree::from_categories([
///     PoiCategory::new(1, "Food", None),
///     PoiCategory::new(2, "Cafe", Some(1)),
/// ]);
///
/// assert_eq!(tree.category(2).map(|c| c.name.as_str()), Ok("Cafe"));
/// assert_eq!(tree.children(1).len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryTree {
    categories: BTreeMap<i64, PoiCategory>,
}

impl CategoryTree {
    /// Build a tree from a collection of categories. Later duplicates replace
    /// earlier ones.
    pub fn from_categories<I>(categories: I) -> Self
    where
        I: IntoIterator<Item = PoiCategory>,
    {
        let mut tree = Self::default();
        tree.extend(categories);
        tree
    }

    /// Insert or replace categories.
    pub fn extend<I>(&mut self, categories: I)
    where
        I: IntoIterator<Item = PoiCategory>,
    {
        self.categories
            .extend(categories.into_iter().map(|category| (category.id, category)));
    }

    /// Categories without a parent.
    pub fn roots(&self) -> impl Iterator<Item = &PoiCategory> {
        self.categories
            .values()
            .filter(|category| category.parent.is_none())
    }

    /// All categories in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &PoiCategory> {
        self.categories.values()
    }

    /// Number of categories in the tree.
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Whether the tree holds no categories.
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.categories.clear();
    }
}

impl CategoryManager for CategoryTree {
    fn category(&self, id: i64) -> Result<&PoiCategory, UnknownCategoryError> {
        self.categories.get(&id).ok_or(UnknownCategoryError { id })
    }

    fn children(&self, id: i64) -> Vec<&PoiCategory> {
        self.categories
            .values()
            .filter(|category| category.parent == Some(id))
            .collect()
    }
}

/// White-list predicate restricting bounding-box queries to categories.
///
/// An empty filter accepts nothing. Queries that should not be restricted by
/// category pass no filter at all.
///
/// # Examples
/// ```
/// use poidb_core::{CategoryFilter, CategoryTree, PoiCategory};
///
/// # fn main() -> Result<(), poidb_core::UnknownCategoryError> {
/// let tree = CategoryTree::from_categories([
///     PoiCategory::new(1, "Food", None),
///     PoiCategory::new(2, "Cafe", Some(1)),
///     PoiCategory::new(3, "Transport", None),
/// ]);
/// let mut filter = CategoryFilter::new();
/// filter.accept_tree(&tree, 1)?;
///
/// assert!(filter.accepts(2));
/// assert!(!filter.accepts(3));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryFilter {
    accepted: BTreeSet<i64>,
}

impl CategoryFilter {
    /// Create a filter that accepts nothing yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a filter accepting exactly the given identifiers.
    pub fn any_of<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = i64>,
    {
        Self {
            accepted: ids.into_iter().collect(),
        }
    }

    /// Accept a single category, without its descendants.
    pub fn accept(&mut self, id: i64) -> &mut Self {
        self.accepted.insert(id);
        self
    }

    /// Accept a category and every category below it.
    pub fn accept_tree(
        &mut self,
        manager: &dyn CategoryManager,
        id: i64,
    ) -> Result<&mut Self, UnknownCategoryError> {
        let root = manager.category(id)?;
        let mut pending = vec![root.id];
        while let Some(current) = pending.pop() {
            if self.accepted.insert(current) {
                pending.extend(manager.children(current).into_iter().map(|child| child.id));
            }
        }
        Ok(self)
    }

    /// Whether the category passes the filter.
    pub fn accepts(&self, id: i64) -> bool {
        self.accepted.contains(&id)
    }

    /// Accepted identifiers in ascending order.
    pub fn accepted_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.accepted.iter().copied()
    }

    /// Whether the filter accepts no category.
    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }
}
