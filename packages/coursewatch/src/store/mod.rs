//! Last-known-state cache: an in-memory collection per resource key,
//! mirrored to durable storage.
//!
//! The in-memory side is authoritative while the process runs. The
//! durable side exists so a restart resumes from the last known state
//! instead of treating every course as never-fetched (which would
//! suppress real events and replay nothing).

mod fs;

pub use fs::FsBackend;

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreError;
use crate::types::{ResourceKey, ResourceKind};

/// Durable side of the snapshot store: opaque blobs addressed by the
/// storage key of a [`ResourceKey`].
///
/// Write failures must not take a tick down; the store logs and keeps
/// going on its in-memory state.
#[async_trait]
pub trait SnapshotBackend: Send + Sync {
    /// Persist one serialized collection under `key`.
    async fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError>;

    /// Read every stored collection. Called once at startup.
    async fn read_all(&self) -> Result<Vec<(String, Vec<u8>)>, StoreError>;

    /// Delete one stored collection. Removing an absent key is not an
    /// error; the engine never calls this, operator tooling does.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// In-memory snapshots for one resource kind, with a durable mirror.
///
/// Absence of a key means "never fetched", which is different from a
/// present-but-empty collection: only the former suppresses diffing.
pub struct SnapshotStore<T> {
    kind: ResourceKind,
    entries: DashMap<String, Vec<T>>,
    backend: Arc<dyn SnapshotBackend>,
}

impl<T> SnapshotStore<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub fn new(kind: ResourceKind, backend: Arc<dyn SnapshotBackend>) -> Self {
        Self {
            kind,
            entries: DashMap::new(),
            backend,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Read every durable snapshot into memory. Call once, before the
    /// first tick.
    ///
    /// Missing storage is an empty store. A blob that no longer parses
    /// is logged and skipped, leaving its key in the never-fetched
    /// state rather than failing startup.
    pub async fn load(&self) -> Result<usize, StoreError> {
        let blobs = self.backend.read_all().await?;
        let mut loaded = 0;

        for (key, bytes) in blobs {
            match serde_json::from_slice::<Vec<T>>(&bytes) {
                Ok(items) => {
                    self.entries.insert(key, items);
                    loaded += 1;
                }
                Err(error) => {
                    tracing::warn!(
                        kind = %self.kind,
                        key = %key,
                        %error,
                        "skipping unparsable snapshot blob"
                    );
                }
            }
        }

        tracing::debug!(kind = %self.kind, loaded, "snapshot store loaded");
        Ok(loaded)
    }

    /// Last known collection for `key`, or `None` if never fetched.
    pub fn get(&self, key: &ResourceKey) -> Option<Vec<T>> {
        self.entries
            .get(&key.storage_key())
            .map(|entry| entry.clone())
    }

    /// Replace the in-memory collection wholesale. Does not persist.
    pub fn set(&self, key: &ResourceKey, items: Vec<T>) {
        self.entries.insert(key.storage_key(), items);
    }

    /// Mirror one collection to durable storage.
    ///
    /// Failures are logged and swallowed; the in-memory value stays
    /// authoritative and the next size change retries the write.
    pub async fn persist(&self, key: &ResourceKey, items: &[T]) {
        let bytes = match serde_json::to_vec(items) {
            Ok(bytes) => bytes,
            Err(error) => {
                tracing::warn!(kind = %self.kind, key = %key, %error, "snapshot serialization failed");
                return;
            }
        };

        if let Err(error) = self.backend.write(&key.storage_key(), &bytes).await {
            tracing::warn!(
                kind = %self.kind,
                key = %key,
                %error,
                "snapshot persist failed; keeping in-memory state"
            );
        }
    }

    /// Number of keys with a cached collection.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> std::fmt::Debug for SnapshotStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore")
            .field("kind", &self.kind)
            .field("entries", &self.entries.len())
            .finish()
    }
}
