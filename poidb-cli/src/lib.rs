//! Command-line interface for inspecting and loading POI stores.
#![forbid(unsafe_code)]

use std::io::Write;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use serde::Serialize;

mod error;
mod fs;
mod import;
mod inspect;
mod maintain;
mod record;
mod store;

pub use error::CliError;

use import::ImportArgs;
use inspect::{FindArgs, InfoArgs, SearchArgs};
use maintain::{PurgeArgs, RemoveArgs};

pub(crate) const ARG_DATABASE: &str = "database";
pub(crate) const ARG_POI_ID: &str = "id";
pub(crate) const ARG_BOUNDS: &str = "bounds";
pub(crate) const ARG_CATEGORY: &str = "category";
pub(crate) const ARG_TAG: &str = "tag";
pub(crate) const ARG_LIMIT: &str = "limit";
pub(crate) const ARG_IMPORT_SOURCE: &str = "source";

pub(crate) const ENV_INFO_DATABASE: &str = "POIDB_CMDS_INFO_DATABASE";
pub(crate) const ENV_FIND_DATABASE: &str = "POIDB_CMDS_FIND_DATABASE";
pub(crate) const ENV_FIND_ID: &str = "POIDB_CMDS_FIND_ID";
pub(crate) const ENV_SEARCH_DATABASE: &str = "POIDB_CMDS_SEARCH_DATABASE";
pub(crate) const ENV_SEARCH_BOUNDS: &str = "POIDB_CMDS_SEARCH_BOUNDS";
pub(crate) const ENV_IMPORT_DATABASE: &str = "POIDB_CMDS_IMPORT_DATABASE";
pub(crate) const ENV_IMPORT_SOURCE: &str = "POIDB_CMDS_IMPORT_SOURCE";
pub(crate) const ENV_REMOVE_DATABASE: &str = "POIDB_CMDS_REMOVE_DATABASE";
pub(crate) const ENV_REMOVE_ID: &str = "POIDB_CMDS_REMOVE_ID";
pub(crate) const ENV_PURGE_DATABASE: &str = "POIDB_CMDS_PURGE_DATABASE";

/// Run the CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let mut stdout = std::io::stdout().lock();
    match cli.command {
        Command::Info(args) => inspect::run_info(args, &mut stdout),
        Command::Find(args) => inspect::run_find(args, &mut stdout),
        Command::Search(args) => inspect::run_search(args, &mut stdout),
        Command::Import(args) => import::run_import(args, &mut stdout),
        Command::Remove(args) => maintain::run_remove(args, &mut stdout),
        Command::Purge(args) => maintain::run_purge(args, &mut stdout),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "poidb",
    about = "Inspect and load SQLite POI stores",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print store metadata and categories.
    Info(InfoArgs),
    /// Print one POI by identifier.
    Find(FindArgs),
    /// Search POIs inside a bounding box.
    Search(SearchArgs),
    /// Load categories, metadata and POIs from a JSON document.
    Import(ImportArgs),
    /// Delete one POI.
    Remove(RemoveArgs),
    /// Delete tag dictionary entries no POI references.
    Purge(PurgeArgs),
}

pub(crate) fn require_database(
    database: Option<Utf8PathBuf>,
    env: &'static str,
) -> Result<Utf8PathBuf, CliError> {
    database.ok_or(CliError::MissingArgument {
        field: ARG_DATABASE,
        env,
    })
}

/// Write `value` as pretty-printed JSON followed by a newline.
pub(crate) fn write_json<T: Serialize>(writer: &mut dyn Write, value: &T) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(value).map_err(CliError::SerialiseOutput)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteOutput)?;
    writer.write_all(b"\n").map_err(CliError::WriteOutput)?;
    Ok(())
}

#[cfg(test)]
mod tests;
