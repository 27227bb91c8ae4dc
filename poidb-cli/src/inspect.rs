//! Read-only commands: `info`, `find` and `search`.

use std::{collections::BTreeMap, io::Write};

use camino::Utf8PathBuf;
use clap::Parser;
use geo::{Coord, Rect};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use poidb_core::{CategoryFilter, PoiCategory, StoreError, TagPattern};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_BOUNDS, ARG_CATEGORY, ARG_DATABASE, ARG_LIMIT, ARG_POI_ID, ARG_TAG, CliError,
    ENV_FIND_DATABASE, ENV_FIND_ID, ENV_INFO_DATABASE, ENV_SEARCH_BOUNDS, ENV_SEARCH_DATABASE,
    record::PoiRecord, require_database, store, write_json,
};

/// CLI arguments for the `info` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(name = "info", about = "Print store metadata and categories")]
#[ortho_config(prefix = "POIDB")]
pub(crate) struct InfoArgs {
    /// Path to the SQLite POI store.
    #[arg(long = ARG_DATABASE, short = 'd', value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
}

/// Resolved `info` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InfoConfig {
    pub(crate) database: Utf8PathBuf,
}

impl TryFrom<InfoArgs> for InfoConfig {
    type Error = CliError;

    fn try_from(args: InfoArgs) -> Result<Self, Self::Error> {
        Ok(Self {
            database: require_database(args.database, ENV_INFO_DATABASE)?,
        })
    }
}

#[derive(Debug, Serialize)]
struct StoreReport<'a> {
    metadata: BTreeMap<&'static str, String>,
    categories: Vec<&'a PoiCategory>,
}

pub(crate) fn run_info(args: InfoArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    info(&InfoConfig::try_from(merged)?, writer)
}

pub(crate) fn info(config: &InfoConfig, writer: &mut dyn Write) -> Result<(), CliError> {
    let store = store::open_existing(&config.database, true)?;
    let report = StoreReport {
        metadata: store.poi_file_info()?.to_metadata().into_iter().collect(),
        categories: store.category_manager().iter().collect(),
    };
    write_json(writer, &report)
}

/// CLI arguments for the `find` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(name = "find", about = "Print one POI by identifier")]
#[ortho_config(prefix = "POIDB")]
pub(crate) struct FindArgs {
    /// Path to the SQLite POI store.
    #[arg(long = ARG_DATABASE, short = 'd', value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Identifier of the POI.
    #[arg(value_name = "id")]
    #[serde(default)]
    pub(crate) id: Option<i64>,
}

/// Resolved `find` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FindConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) id: i64,
}

impl TryFrom<FindArgs> for FindConfig {
    type Error = CliError;

    fn try_from(args: FindArgs) -> Result<Self, Self::Error> {
        let database = require_database(args.database, ENV_FIND_DATABASE)?;
        let id = args.id.ok_or(CliError::MissingArgument {
            field: ARG_POI_ID,
            env: ENV_FIND_ID,
        })?;
        Ok(Self { database, id })
    }
}

pub(crate) fn run_find(args: FindArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    find(&FindConfig::try_from(merged)?, writer)
}

pub(crate) fn find(config: &FindConfig, writer: &mut dyn Write) -> Result<(), CliError> {
    let store = store::open_existing(&config.database, true)?;
    let poi = store
        .find_point_by_id(config.id)?
        .ok_or(CliError::PoiNotFound { id: config.id })?;
    write_json(writer, &PoiRecord::from(&poi))
}

/// CLI arguments for the `search` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "search",
    long_about = "Search POIs whose location falls inside a bounding box. \
                 Categories include their descendants; tag patterns use SQL \
                 LIKE wildcards and must all match.",
    about = "Search POIs inside a bounding box"
)]
#[ortho_config(prefix = "POIDB")]
pub(crate) struct SearchArgs {
    /// Path to the SQLite POI store.
    #[arg(long = ARG_DATABASE, short = 'd', value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Bounding box as `minLat,minLon,maxLat,maxLon`.
    #[arg(long = ARG_BOUNDS, value_name = "box", allow_hyphen_values = true)]
    #[serde(default)]
    pub(crate) bounds: Option<String>,
    /// Restrict results to a category and its descendants. Repeatable.
    #[arg(long = ARG_CATEGORY, value_name = "id")]
    #[serde(default)]
    pub(crate) category: Vec<i64>,
    /// Require a tag as `key=pattern`. Repeatable.
    #[arg(long = ARG_TAG, value_name = "key=pattern")]
    #[serde(default)]
    pub(crate) tag: Vec<String>,
    /// Maximum number of POIs to print; 0 prints every match.
    #[arg(long = ARG_LIMIT, value_name = "n")]
    #[serde(default)]
    pub(crate) limit: Option<usize>,
}

/// Resolved `search` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SearchConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) bounds: Rect<f64>,
    pub(crate) categories: Vec<i64>,
    pub(crate) patterns: Vec<TagPattern>,
    pub(crate) limit: usize,
}

impl TryFrom<SearchArgs> for SearchConfig {
    type Error = CliError;

    fn try_from(args: SearchArgs) -> Result<Self, Self::Error> {
        let database = require_database(args.database, ENV_SEARCH_DATABASE)?;
        let bounds = args.bounds.ok_or(CliError::MissingArgument {
            field: ARG_BOUNDS,
            env: ENV_SEARCH_BOUNDS,
        })?;
        let patterns = args
            .tag
            .iter()
            .map(|value| parse_tag_pattern(value))
            .collect::<Result<_, _>>()?;
        Ok(Self {
            database,
            bounds: parse_bounds(&bounds)?,
            categories: args.category,
            patterns,
            limit: args.limit.unwrap_or(0),
        })
    }
}

/// Parse `minLat,minLon,maxLat,maxLon`.
pub(crate) fn parse_bounds(value: &str) -> Result<Rect<f64>, CliError> {
    let invalid = || CliError::InvalidBounds {
        value: value.to_owned(),
    };
    let degrees = value
        .split(',')
        .map(|part| part.trim().parse::<f64>().ok().filter(|deg| deg.is_finite()))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(invalid)?;
    let &[min_lat, min_lon, max_lat, max_lon] = degrees.as_slice() else {
        return Err(invalid());
    };
    Ok(Rect::new(
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

/// Parse `key=pattern`. The key must not be empty; the pattern may be.
pub(crate) fn parse_tag_pattern(value: &str) -> Result<TagPattern, CliError> {
    match value.split_once('=') {
        Some((key, pattern)) if !key.is_empty() => Ok(TagPattern::new(key, pattern)),
        _ => Err(CliError::InvalidTagPattern {
            value: value.to_owned(),
        }),
    }
}

pub(crate) fn run_search(args: SearchArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    search(&SearchConfig::try_from(merged)?, writer)
}

/// Print matches ordered by identifier.
pub(crate) fn search(config: &SearchConfig, writer: &mut dyn Write) -> Result<(), CliError> {
    let store = store::open_existing(&config.database, true)?;
    let filter = if config.categories.is_empty() {
        None
    } else {
        let mut filter = CategoryFilter::new();
        for id in &config.categories {
            filter
                .accept_tree(store.category_manager(), *id)
                .map_err(StoreError::from)?;
        }
        Some(filter)
    };
    let mut records: Vec<_> = store
        .find_in_rect(&config.bounds, filter.as_ref(), &config.patterns, config.limit)?
        .iter()
        .map(PoiRecord::from)
        .collect();
    records.sort_by_key(|record| record.id);
    write_json(writer, &records)
}
