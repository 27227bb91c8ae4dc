//! Test helpers for writing import documents and capturing command output.

use super::*;
use serde_json::{Value, json};
use std::fs;
use tempfile::TempDir;

/// Temporary workspace holding an import document and a store path.
pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        Self { _dir: dir, root }
    }

    pub(super) fn path(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }

    pub(super) fn write(&self, name: &str, contents: &Value) -> Utf8PathBuf {
        let path = self.path(name);
        fs::write(&path, contents.to_string()).expect("write document");
        path
    }
}

/// A document with a small category tree, metadata and three POIs.
pub(super) fn sample_document() -> Value {
    json!({
        "categories": [
            { "id": 1, "name": "Amenity", "parent": null },
            { "id": 7, "name": "Cafe", "parent": 1 },
            { "id": 8, "name": "Bar", "parent": 1 }
        ],
        "metadata": {
            "comment": "Sample extract",
            "bounds": "10,10,30,30",
            "writer": "poidb-tests"
        },
        "pois": [
            {
                "id": 1,
                "latitude": 10.0,
                "longitude": 10.0,
                "tags": { "amenity": "cafe", "name": "Joe's" },
                "categories": [7]
            },
            {
                "id": 2,
                "latitude": 20.0,
                "longitude": 20.0,
                "tags": { "amenity": "bar", "name": "Corner" },
                "categories": [8]
            },
            {
                "id": 3,
                "latitude": 30.0,
                "longitude": 30.0,
                "tags": { "amenity": "bar" },
                "categories": [8]
            }
        ]
    })
}

/// Import [`sample_document`] into `store.db` below a nested directory.
pub(super) fn imported_store(workspace: &Workspace) -> Utf8PathBuf {
    let source = workspace.write("document.json", &sample_document());
    let database = workspace.path("nested/dir/store.db");
    import::import(&import::ImportConfig {
        database: database.clone(),
        source,
    })
    .expect("import sample document");
    database
}

/// Run `command` against a buffer and decode the JSON it printed.
pub(super) fn capture(
    command: impl FnOnce(&mut dyn std::io::Write) -> Result<(), CliError>,
) -> Value {
    let mut buffer = Vec::new();
    command(&mut buffer).expect("command succeeds");
    serde_json::from_slice(&buffer).expect("command prints JSON")
}
