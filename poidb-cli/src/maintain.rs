//! Mutating maintenance commands: `remove` and `purge`.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use poidb_core::TagPurge;
use serde::{Deserialize, Serialize};

use crate::{
    ARG_DATABASE, ARG_POI_ID, CliError, ENV_PURGE_DATABASE, ENV_REMOVE_DATABASE, ENV_REMOVE_ID,
    require_database, store, write_json,
};

/// CLI arguments for the `remove` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(name = "remove", about = "Delete one POI with its tags and categories")]
#[ortho_config(prefix = "POIDB")]
pub(crate) struct RemoveArgs {
    /// Path to the SQLite POI store.
    #[arg(long = ARG_DATABASE, short = 'd', value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Identifier of the POI.
    #[arg(value_name = "id")]
    #[serde(default)]
    pub(crate) id: Option<i64>,
}

/// Resolved `remove` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RemoveConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) id: i64,
}

impl TryFrom<RemoveArgs> for RemoveConfig {
    type Error = CliError;

    fn try_from(args: RemoveArgs) -> Result<Self, Self::Error> {
        let database = require_database(args.database, ENV_REMOVE_DATABASE)?;
        let id = args.id.ok_or(CliError::MissingArgument {
            field: ARG_POI_ID,
            env: ENV_REMOVE_ID,
        })?;
        Ok(Self { database, id })
    }
}

#[derive(Debug, Serialize)]
struct Removed {
    removed: i64,
}

pub(crate) fn run_remove(args: RemoveArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    remove(&RemoveConfig::try_from(merged)?, writer)
}

pub(crate) fn remove(config: &RemoveConfig, writer: &mut dyn Write) -> Result<(), CliError> {
    let mut store = store::open_existing(&config.database, false)?;
    if !store.remove_point_by_id(config.id)? {
        return Err(CliError::PoiNotFound { id: config.id });
    }
    write_json(writer, &Removed { removed: config.id })
}

/// CLI arguments for the `purge` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "purge",
    about = "Delete tag keys and values no POI references"
)]
#[ortho_config(prefix = "POIDB")]
pub(crate) struct PurgeArgs {
    /// Path to the SQLite POI store.
    #[arg(long = ARG_DATABASE, short = 'd', value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
}

/// Resolved `purge` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PurgeConfig {
    pub(crate) database: Utf8PathBuf,
}

impl TryFrom<PurgeArgs> for PurgeConfig {
    type Error = CliError;

    fn try_from(args: PurgeArgs) -> Result<Self, Self::Error> {
        Ok(Self {
            database: require_database(args.database, ENV_PURGE_DATABASE)?,
        })
    }
}

pub(crate) fn run_purge(args: PurgeArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let purge = purge(&PurgeConfig::try_from(merged)?)?;
    write_json(writer, &purge)
}

pub(crate) fn purge(config: &PurgeConfig) -> Result<TagPurge, CliError> {
    let mut store = store::open_existing(&config.database, false)?;
    Ok(store.remove_unreferenced_tags()?)
}
