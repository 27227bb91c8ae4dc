//! Error types emitted by the POI store CLI.
//!
//! Store errors carry backend sources and are boxed to keep `CliError`
//! small.

use std::sync::Arc;

use camino::Utf8PathBuf;
use poidb_core::StoreError;
use thiserror::Error;

/// Errors emitted by the POI store CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// A referenced input path does not exist on disk.
    #[error("{field} path {path:?} does not exist")]
    MissingSourceFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path exists but is not a file.
    #[error("{field} path {path:?} exists but is not a file")]
    SourcePathNotFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected due to an IO error.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        field: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Creating the directory that will hold a new store failed.
    #[error("failed to create parent directory for {path:?}: {source}")]
    CreateParentDir {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// `--bounds` was not four comma-separated coordinates.
    #[error("invalid bounds {value:?} (expected minLat,minLon,maxLat,maxLon)")]
    InvalidBounds { value: String },
    /// `--tag` was not a `key=pattern` pair.
    #[error("invalid tag pattern {value:?} (expected key=pattern)")]
    InvalidTagPattern { value: String },
    /// Opening the import document failed.
    #[error("failed to open import document at {path:?}: {source}")]
    OpenImport {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The import document could not be decoded.
    #[error("failed to parse import document at {path:?}: {source}")]
    ParseImport {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// An imported POI references a category neither the document nor the
    /// store defines.
    #[error("POI {poi} references unknown category {category}")]
    UnknownCategory { poi: i64, category: i64 },
    /// No POI carries the requested identifier.
    #[error("no POI with id {id}")]
    PoiNotFound { id: i64 },
    /// The POI store reported a failure.
    #[error("POI store operation failed: {0}")]
    Store(#[source] Box<StoreError>),
    /// Serialising command output failed.
    #[error("failed to serialise output: {0}")]
    SerialiseOutput(#[source] serde_json::Error),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        Self::Store(Box::new(err))
    }
}
