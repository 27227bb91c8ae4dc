//! Store-level metadata and its decoding from the `metadata` table.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use geo::{Coord, Rect};
use log::warn;

/// Metadata keys recognised by [`FileInfo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataKey {
    /// Bounding box covering the store, `minLat,minLon,maxLat,maxLon`.
    Bounds,
    /// Free-form comment.
    Comment,
    /// Creation date in milliseconds since the Unix epoch.
    Date,
    /// Preferred language code.
    Language,
    /// Store format version.
    Version,
    /// Whether way geometries were included when the store was written.
    Ways,
    /// Name of the program that wrote the store.
    Writer,
}

impl MetadataKey {
    /// Every recognised key.
    pub const ALL: [Self; 7] = [
        Self::Bounds,
        Self::Comment,
        Self::Date,
        Self::Language,
        Self::Version,
        Self::Ways,
        Self::Writer,
    ];

    /// Name stored in the `metadata.name` column.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bounds => "bounds",
            Self::Comment => "comment",
            Self::Date => "date",
            Self::Language => "language",
            Self::Version => "version",
            Self::Ways => "ways",
            Self::Writer => "writer",
        }
    }

    /// Parse a metadata name; unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == name)
    }
}

/// Structured view of a store's metadata.
///
/// # Examples
/// ```
/// use poidb_core::FileInfo;
///
/// let info = FileInfo::from_metadata([
///     ("bounds", Some("52.0,13.0,53.0,14.0")),
///     ("writer", Some("poidb")),
///     ("ways", Some("true")),
///     ("unrelated", Some("ignored")),
/// ]);
///
/// let bounds = info.bounds.expect("bounds decoded");
/// assert_eq!(bounds.min().y, 52.0);
/// assert_eq!(info.writer.as_deref(), Some("poidb"));
/// assert!(info.ways);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FileInfo {
    pub bounds: Option<Rect<f64>>,
    pub comment: Option<String>,
    pub date: Option<SystemTime>,
    pub language: Option<String>,
    pub version: Option<i32>,
    pub ways: bool,
    pub writer: Option<String>,
}

impl FileInfo {
    /// Decode metadata rows. Unknown names are ignored and malformed values
    /// of recognised names are skipped.
    pub fn from_metadata<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
    {
        let mut info = Self::default();
        for (name, value) in rows {
            let (Some(key), Some(value)) = (MetadataKey::from_name(name), value) else {
                continue;
            };
            info.apply(key, value);
        }
        info
    }

    fn apply(&mut self, key: MetadataKey, value: &str) {
        match key {
            MetadataKey::Bounds => match parse_bounds(value) {
                Some(bounds) => self.bounds = Some(bounds),
                None => skip_value(key, value),
            },
            MetadataKey::Comment => self.comment = Some(value.to_owned()),
            MetadataKey::Date => match parse_date(value) {
                Some(date) => self.date = Some(date),
                None => skip_value(key, value),
            },
            MetadataKey::Language => self.language = Some(value.to_owned()),
            MetadataKey::Version => match value.trim().parse() {
                Ok(version) => self.version = Some(version),
                Err(_) => skip_value(key, value),
            },
            MetadataKey::Ways => self.ways = value.trim().eq_ignore_ascii_case("true"),
            MetadataKey::Writer => self.writer = Some(value.to_owned()),
        }
    }

    /// Encode the populated fields as metadata rows.
    ///
    /// # Examples
    /// ```
    /// use poidb_core::FileInfo;
    ///
    /// let info = FileInfo {
    ///     comment: Some("sample".into()),
    ///     ..FileInfo::default()
    /// };
    /// let rows = info.to_metadata();
    /// assert!(rows.contains(&("comment", "sample".to_string())));
    /// assert!(rows.contains(&("ways", "false".to_string())));
    /// ```
    pub fn to_metadata(&self) -> Vec<(&'static str, String)> {
        let mut rows = Vec::new();
        if let Some(bounds) = self.bounds {
            rows.push((MetadataKey::Bounds.as_str(), format_bounds(&bounds)));
        }
        if let Some(comment) = &self.comment {
            rows.push((MetadataKey::Comment.as_str(), comment.clone()));
        }
        if let Some(millis) = self.date.and_then(format_date) {
            rows.push((MetadataKey::Date.as_str(), millis));
        }
        if let Some(language) = &self.language {
            rows.push((MetadataKey::Language.as_str(), language.clone()));
        }
        if let Some(version) = self.version {
            rows.push((MetadataKey::Version.as_str(), version.to_string()));
        }
        rows.push((MetadataKey::Ways.as_str(), self.ways.to_string()));
        if let Some(writer) = &self.writer {
            rows.push((MetadataKey::Writer.as_str(), writer.clone()));
        }
        rows
    }
}

fn skip_value(key: MetadataKey, value: &str) {
    warn!(
        "Skipped metadata entry: name={}, value={:?} (unparseable)",
        key.as_str(),
        value
    );
}

fn parse_bounds(value: &str) -> Option<Rect<f64>> {
    let mut parts = value.split(',').map(|part| part.trim().parse::<f64>());
    let (Some(Ok(min_lat)), Some(Ok(min_lon)), Some(Ok(max_lat)), Some(Ok(max_lon)), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return None;
    };
    Some(Rect::new(
        Coord {
            x: min_lon,
            y: min_lat,
        },
        Coord {
            x: max_lon,
            y: max_lat,
        },
    ))
}

fn format_bounds(bounds: &Rect<f64>) -> String {
    let min = bounds.min();
    let max = bounds.max();
    format!("{},{},{},{}", min.y, min.x, max.y, max.x)
}

fn parse_date(value: &str) -> Option<SystemTime> {
    let millis: u64 = value.trim().parse().ok()?;
    UNIX_EPOCH.checked_add(Duration::from_millis(millis))
}

fn format_date(date: SystemTime) -> Option<String> {
    let millis = date.duration_since(UNIX_EPOCH).ok()?.as_millis();
    Some(millis.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn decodes_every_recognised_key() {
        let info = FileInfo::from_metadata([
            ("bounds", Some("-1.5,-2.5,3.5,4.5")),
            ("comment", Some("Berlin extract")),
            ("date", Some("1500000000000")),
            ("language", Some("de")),
            ("version", Some("2")),
            ("ways", Some("TRUE")),
            ("writer", Some("poidb-cli")),
        ]);

        let bounds = info.bounds.expect("bounds");
        assert_eq!(bounds.min(), Coord { x: -2.5, y: -1.5 });
        assert_eq!(bounds.max(), Coord { x: 4.5, y: 3.5 });
        assert_eq!(info.comment.as_deref(), Some("Berlin extract"));
        assert_eq!(
            info.date,
            Some(UNIX_EPOCH + Duration::from_millis(1_500_000_000_000))
        );
        assert_eq!(info.language.as_deref(), Some("de"));
        assert_eq!(info.version, Some(2));
        assert!(info.ways);
        assert_eq!(info.writer.as_deref(), Some("poidb-cli"));
    }

    #[rstest]
    #[case("bounds", "1,2,3")]
    #[case("bounds", "1,2,3,4,5")]
    #[case("bounds", "north,2,3,4")]
    #[case("date", "yesterday")]
    #[case("date", "-5")]
    #[case("version", "v2")]
    fn skips_malformed_values(#[case] name: &str, #[case] value: &str) {
        let info = FileInfo::from_metadata([(name, Some(value))]);
        assert_eq!(info, FileInfo::default());
    }

    #[rstest]
    fn ignores_unknown_keys_and_null_values() {
        let info = FileInfo::from_metadata([("tile_format", Some("png")), ("comment", None)]);
        assert_eq!(info, FileInfo::default());
    }

    #[rstest]
    fn ways_defaults_to_false_for_other_text() {
        let info = FileInfo::from_metadata([("ways", Some("yes"))]);
        assert!(!info.ways);
    }

    #[rstest]
    fn encoded_rows_decode_to_the_same_info() {
        let info = FileInfo {
            bounds: Some(Rect::new(
                Coord { x: 13.0, y: 52.0 },
                Coord { x: 14.0, y: 53.0 },
            )),
            comment: Some("c".into()),
            date: Some(UNIX_EPOCH + Duration::from_millis(42)),
            language: Some("en".into()),
            version: Some(3),
            ways: true,
            writer: Some("w".into()),
        };
        let rows = info.to_metadata();
        let decoded =
            FileInfo::from_metadata(rows.iter().map(|(name, value)| (*name, Some(value.as_str()))));
        assert_eq!(decoded, info);
    }
}
