//! Opening stores named on the command line.

use camino::Utf8Path;
use poidb_core::{PoiPersistenceManager, SqliteBackend, StoreConfig};

use crate::{ARG_DATABASE, CliError, fs};

pub(crate) type Store = PoiPersistenceManager<SqliteBackend>;

/// Open a store that must already exist.
pub(crate) fn open_existing(path: &Utf8Path, read_only: bool) -> Result<Store, CliError> {
    fs::require_file(path, ARG_DATABASE)?;
    let config = StoreConfig {
        path: path.as_std_path().to_path_buf(),
        read_only,
    };
    Ok(Store::open_with(&config)?)
}

/// Open a writable store, creating it and its parent directories if absent.
pub(crate) fn open_or_create(path: &Utf8Path) -> Result<Store, CliError> {
    fs::ensure_parent_dir(path).map_err(|source| CliError::CreateParentDir {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Store::open_with(&StoreConfig::writable(path.as_std_path()))?)
}
