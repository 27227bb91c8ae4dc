use std::collections::BTreeSet;

use geo::Coord;

use crate::PoiCategory;

/// Set of free-form tags attached to a point of interest.
pub type Tags = BTreeSet<Tag>;

/// A free-form key/value annotation, e.g. `amenity=cafe`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    /// Construct a tag from its key and value.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A tag filter used by bounding-box queries.
///
/// The key must match exactly. The value is an SQL `LIKE` pattern, so `%`
/// matches any run of characters and `_` matches a single character. Matching
/// is ASCII case-insensitive, as SQLite's `LIKE` is.
///
/// # Examples
/// ```
/// use poidb_core::TagPattern;
///
/// let pattern = TagPattern::new("cuisine", "ital%");
/// assert_eq!(pattern.key, "cuisine");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TagPattern {
    pub key: String,
    pub value: String,
}

impl TagPattern {
    /// Construct a pattern matching `key` exactly and `value` with `LIKE`.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A geolocated entity with tags and category memberships.
///
/// Coordinates are WGS84 with `x = longitude` and `y = latitude`. The `id` is
/// assigned by the caller and must be unique within a store.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use poidb_core::{PointOfInterest, Tag, Tags};
///
/// let poi = PointOfInterest::new(
///     1,
///     Coord { x: 13.375, y: 52.5 },
///     Tags::from([Tag::new("amenity", "cafe")]),
///     Default::default(),
/// );
///
/// assert_eq!(poi.latitude(), 52.5);
/// assert_eq!(poi.tag_value("amenity"), Some("cafe"));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PointOfInterest {
    pub id: i64,
    pub location: Coord<f64>,
    pub tags: Tags,
    pub categories: BTreeSet<PoiCategory>,
}

impl PointOfInterest {
    /// Construct a `PointOfInterest` from its parts.
    pub fn new(
        id: i64,
        location: Coord<f64>,
        tags: Tags,
        categories: BTreeSet<PoiCategory>,
    ) -> Self {
        Self {
            id,
            location,
            tags,
            categories,
        }
    }

    /// Construct a `PointOfInterest` without tags or categories.
    ///
    /// # Examples
    /// ```
    /// use geo::Coord;
    /// use poidb_core::PointOfInterest;
    ///
    /// let poi = PointOfInterest::at(7, Coord { x: 0.0, y: 0.0 });
    /// assert!(poi.tags.is_empty());
    /// assert!(poi.categories.is_empty());
    /// ```
    pub fn at(id: i64, location: Coord<f64>) -> Self {
        Self::new(id, location, Tags::new(), BTreeSet::new())
    }

    /// Latitude in degrees.
    pub fn latitude(&self) -> f64 {
        self.location.y
    }

    /// Longitude in degrees.
    pub fn longitude(&self) -> f64 {
        self.location.x
    }

    /// Return the value of the first tag carrying `key`.
    pub fn tag_value(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|tag| tag.key == key)
            .map(|tag| tag.value.as_str())
    }

    /// Whether the location lies within the WGS84 coordinate range.
    ///
    /// `NaN` and infinite components fail the range checks.
    pub(crate) fn has_valid_location(&self) -> bool {
        let Coord { x: lon, y: lat } = self.location;
        (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn poi_exposes_tag_values() {
        let mut poi = PointOfInterest::at(1, Coord { x: 0.0, y: 0.0 });
        poi.tags.insert(Tag::new("name", "Joe's"));
        assert_eq!(poi.tag_value("name"), Some("Joe's"));
        assert_eq!(poi.tag_value("amenity"), None);
    }

    #[rstest]
    #[case(Coord { x: 0.0, y: 90.0 }, true)]
    #[case(Coord { x: -180.0, y: -90.0 }, true)]
    #[case(Coord { x: 0.0, y: 90.5 }, false)]
    #[case(Coord { x: 181.0, y: 0.0 }, false)]
    #[case(Coord { x: f64::NAN, y: 0.0 }, false)]
    #[case(Coord { x: 0.0, y: f64::INFINITY }, false)]
    fn validates_wgs84_range(#[case] location: Coord<f64>, #[case] valid: bool) {
        assert_eq!(PointOfInterest::at(1, location).has_valid_location(), valid);
    }
}
