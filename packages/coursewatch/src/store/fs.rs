//! Filesystem snapshot backend: one JSON file per resource key.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use super::SnapshotBackend;
use crate::error::StoreError;
use crate::types::ResourceKind;

/// Stores each collection as `<root>/<key>.json`.
///
/// Writes go through a sibling temp file plus rename, so a crash in the
/// middle of a write never leaves a torn snapshot behind.
pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Conventional layout: one subdirectory per resource kind under the
    /// configured snapshot directory.
    pub fn for_kind(snapshot_dir: &Path, kind: ResourceKind) -> Self {
        Self::new(snapshot_dir.join(kind.as_str()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl SnapshotBackend for FsBackend {
    async fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root).await?;

        let final_path = self.root.join(format!("{key}.json"));
        let tmp_path = self.root.join(format!("{key}.json.tmp"));

        fs::write(&tmp_path, bytes).await?;
        fs::rename(&tmp_path, &final_path).await?;
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            // No directory yet means nothing was ever persisted.
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(error.into()),
        };

        let mut blobs = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            let bytes = fs::read(&path).await?;
            blobs.push((stem.to_string(), bytes));
        }

        Ok(blobs)
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.root.join(format!("{key}.json"));
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }
}
