//! JSON shapes for POIs read from import documents and printed by commands.

use std::collections::{BTreeMap, BTreeSet};

use geo::Coord;
use poidb_core::{CategoryManager, PoiCategory, PointOfInterest, Tag};
use serde::{Deserialize, Serialize};

use crate::CliError;

/// A POI with its tags as a map and its categories as identifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct PoiRecord {
    pub(crate) id: i64,
    pub(crate) latitude: f64,
    pub(crate) longitude: f64,
    #[serde(default)]
    pub(crate) tags: BTreeMap<String, String>,
    #[serde(default)]
    pub(crate) categories: Vec<i64>,
}

impl From<&PointOfInterest> for PoiRecord {
    fn from(poi: &PointOfInterest) -> Self {
        Self {
            id: poi.id,
            latitude: poi.latitude(),
            longitude: poi.longitude(),
            tags: poi
                .tags
                .iter()
                .map(|tag| (tag.key.clone(), tag.value.clone()))
                .collect(),
            categories: poi.categories.iter().map(|category| category.id).collect(),
        }
    }
}

impl PoiRecord {
    /// Resolve category identifiers through `manager`.
    pub(crate) fn into_poi(self, manager: &dyn CategoryManager) -> Result<PointOfInterest, CliError> {
        let categories = self
            .categories
            .iter()
            .map(|id| {
                manager
                    .category(*id)
                    .cloned()
                    .map_err(|_| CliError::UnknownCategory {
                        poi: self.id,
                        category: *id,
                    })
            })
            .collect::<Result<BTreeSet<_>, _>>()?;
        let tags = self
            .tags
            .into_iter()
            .map(|(key, value)| Tag::new(key, value))
            .collect();
        Ok(PointOfInterest::new(
            self.id,
            Coord {
                x: self.longitude,
                y: self.latitude,
            },
            tags,
            categories,
        ))
    }
}

/// Contents of a file passed to `poidb import`.
///
/// `metadata` holds raw metadata entries such as `"bounds":
/// "52.3,13.0,52.7,13.8"`; they are decoded like rows of the metadata
/// table. When absent the store's metadata is left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct ImportDocument {
    #[serde(default)]
    pub(crate) categories: Vec<PoiCategory>,
    #[serde(default)]
    pub(crate) metadata: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub(crate) pois: Vec<PoiRecord>,
}
