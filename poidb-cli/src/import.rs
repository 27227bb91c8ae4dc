//! `import` command: load a JSON document into a writable store.

use std::io::{BufReader, Write};

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use poidb_core::FileInfo;
use serde::{Deserialize, Serialize};

use crate::{
    ARG_DATABASE, ARG_IMPORT_SOURCE, CliError, ENV_IMPORT_DATABASE, ENV_IMPORT_SOURCE, fs,
    record::ImportDocument, require_database, store, write_json,
};

/// CLI arguments for the `import` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "import",
    long_about = "Load categories, metadata and POIs from a JSON document. \
                 The store and its parent directories are created when \
                 absent; the whole document is written in one transaction.",
    about = "Load a JSON document into a POI store"
)]
#[ortho_config(prefix = "POIDB")]
pub(crate) struct ImportArgs {
    /// Path to the SQLite POI store.
    #[arg(long = ARG_DATABASE, short = 'd', value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Path to the JSON document.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) source: Option<Utf8PathBuf>,
}

/// Resolved `import` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImportConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) source: Utf8PathBuf,
}

impl TryFrom<ImportArgs> for ImportConfig {
    type Error = CliError;

    fn try_from(args: ImportArgs) -> Result<Self, Self::Error> {
        let database = require_database(args.database, ENV_IMPORT_DATABASE)?;
        let source = args.source.ok_or(CliError::MissingArgument {
            field: ARG_IMPORT_SOURCE,
            env: ENV_IMPORT_SOURCE,
        })?;
        Ok(Self { database, source })
    }
}

/// Counts reported after a successful import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) struct ImportSummary {
    pub(crate) categories: usize,
    pub(crate) pois: usize,
    pub(crate) metadata: bool,
}

pub(crate) fn run_import(args: ImportArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let summary = import(&ImportConfig::try_from(merged)?)?;
    write_json(writer, &summary)
}

/// Validate the whole document, then write it in one transaction.
///
/// Records resolve against the store's categories plus the document's own,
/// so a rejected document leaves the store unchanged.
pub(crate) fn import(config: &ImportConfig) -> Result<ImportSummary, CliError> {
    fs::require_file(&config.source, ARG_IMPORT_SOURCE)?;
    let document = load_document(&config.source)?;
    let mut store = store::open_or_create(&config.database)?;

    let mut known = store.category_manager().clone();
    known.extend(document.categories.iter().cloned());
    let pois = document
        .pois
        .into_iter()
        .map(|record| record.into_poi(&known))
        .collect::<Result<Vec<_>, _>>()?;
    let info = document.metadata.as_ref().map(|entries| {
        FileInfo::from_metadata(
            entries
                .iter()
                .map(|(name, value)| (name.as_str(), Some(value.as_str()))),
        )
    });

    store.import(&document.categories, info.as_ref(), &pois)?;

    info!(
        "Imported {} categories and {} POIs into {}",
        document.categories.len(),
        pois.len(),
        config.database
    );
    Ok(ImportSummary {
        categories: document.categories.len(),
        pois: pois.len(),
        metadata: info.is_some(),
    })
}

/// Decode an import document from disk.
pub(crate) fn load_document(path: &Utf8Path) -> Result<ImportDocument, CliError> {
    let file = fs::open_utf8_file(path).map_err(|source| CliError::OpenImport {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| CliError::ParseImport {
        path: path.to_path_buf(),
        source,
    })
}
