//! Watcher orchestration shared by the three resource types.
//!
//! Each watcher runs the same cycle on its own cadence: enumerate
//! targets, resolve a session cookie, fetch the remote collection,
//! update the snapshot, and emit events for the additions that survive
//! the per-type filters. What differs per type lives in the submodules;
//! the snapshot update sequence and the credential plumbing live here.

pub mod announcements;
pub mod grades;
pub mod inbox;

pub use announcements::AnnouncementWatcher;
pub use grades::GradeWatcher;
pub use inbox::InboxWatcher;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::bus::EventBus;
use crate::diff;
use crate::error::WatchResult;
use crate::items::Identified;
use crate::store::SnapshotStore;
use crate::traits::{CredentialResolver, CredentialSink, Directory};
use crate::types::{Credential, ResourceKey, ResourceKind, UserId};

/// One pollable resource type. The scheduler only sees this surface.
#[async_trait]
pub trait Watcher: Send + Sync {
    fn kind(&self) -> ResourceKind;

    /// One full enumerate, fetch, diff, emit cycle.
    async fn tick(&self) -> WatchResult<TickReport>;
}

/// Counters describing what one tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Targets the directory produced for this tick
    pub targets: usize,
    /// Remote collection fetches that succeeded
    pub fetched: usize,
    /// Targets skipped before any fetch attempt (no users, no cookie,
    /// unread gate)
    pub skipped: usize,
    /// Fetch attempts the remote system rejected as unauthorized
    pub unauthorized: usize,
    /// Transient fetch or enrichment failures
    pub transient_failures: usize,
    /// Events emitted onto the bus
    pub events: usize,
}

/// Collaborator handles shared by every watcher.
#[derive(Clone)]
pub struct WatchDeps {
    pub directory: Arc<dyn Directory>,
    pub credentials: Arc<dyn CredentialResolver>,
    pub credential_sink: Arc<dyn CredentialSink>,
    pub bus: EventBus,
}

/// What a successful fetch did to the snapshot for one key.
#[derive(Debug)]
pub(crate) enum SnapshotOutcome<T> {
    /// First population of this key; persisted, never emits
    FirstSeen,
    /// Same collection size; memory replaced, nothing persisted
    Unchanged,
    /// Collection size changed; persisted, `fresh` holds the additions
    /// in fetch order
    Changed { fresh: Vec<T> },
}

/// Snapshot update sequence every watcher runs after a successful fetch:
/// capture the old collection, replace memory unconditionally, persist
/// only on first population or size change, and report the additions.
///
/// Equal size means no change by definition here, even when ids moved,
/// so a simultaneous add-and-remove goes undetected until the counts
/// drift apart again.
pub(crate) async fn apply_fetch<T>(
    store: &SnapshotStore<T>,
    key: &ResourceKey,
    fetched: Vec<T>,
) -> SnapshotOutcome<T>
where
    T: Identified + Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    let previous = store.get(key);
    store.set(key, fetched.clone());

    match previous {
        None => {
            store.persist(key, &fetched).await;
            SnapshotOutcome::FirstSeen
        }
        Some(old) if old.len() == fetched.len() => SnapshotOutcome::Unchanged,
        Some(old) => {
            store.persist(key, &fetched).await;
            SnapshotOutcome::Changed {
                fresh: diff::new_items(&fetched, &old),
            }
        }
    }
}

/// Resolve a cookie for `user` and validate its shape.
///
/// Missing and invalid cookies both come back as `None`; the caller
/// skips the target without treating it as a failure.
pub(crate) async fn usable_credential(
    resolver: &dyn CredentialResolver,
    user: &UserId,
) -> Option<Credential> {
    let credential = resolver.cookie_for(user).await?;
    if !credential.is_valid() {
        tracing::debug!(user = %user, "session cookie failed validation; skipping");
        return None;
    }
    Some(credential)
}

/// Report a rejected cookie to the credential sink.
pub(crate) async fn report_unauthorized(
    sink: &dyn CredentialSink,
    user: &UserId,
    kind: ResourceKind,
) {
    tracing::warn!(user = %user, watcher = %kind, "session cookie rejected; reporting for invalidation");
    sink.report_invalid(user, &format!("{kind} fetch rejected by the remote system"))
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{announcement, MemoryBackend};
    use crate::types::CourseId;

    fn store() -> (Arc<MemoryBackend>, SnapshotStore<crate::items::Announcement>) {
        let backend = Arc::new(MemoryBackend::new());
        let store = SnapshotStore::new(ResourceKind::Announcements, backend.clone());
        (backend, store)
    }

    fn key() -> ResourceKey {
        ResourceKey::announcements(&CourseId::new("42"))
    }

    #[tokio::test]
    async fn first_fetch_persists_without_additions() {
        let (backend, store) = store();

        let outcome = apply_fetch(&store, &key(), vec![announcement("a1")]).await;

        assert!(matches!(outcome, SnapshotOutcome::FirstSeen));
        assert_eq!(backend.writes(), vec!["42".to_string()]);
        assert_eq!(store.get(&key()).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn equal_size_replaces_memory_without_persisting() {
        let (backend, store) = store();
        apply_fetch(&store, &key(), vec![announcement("a1")]).await;

        let outcome = apply_fetch(&store, &key(), vec![announcement("a2")]).await;

        assert!(matches!(outcome, SnapshotOutcome::Unchanged));
        // Only the first-seen write went through.
        assert_eq!(backend.writes().len(), 1);
        // Memory still follows the latest fetch.
        assert_eq!(store.get(&key()).unwrap()[0].id, "a2");
    }

    #[tokio::test]
    async fn growth_persists_and_reports_additions() {
        let (backend, store) = store();
        apply_fetch(&store, &key(), vec![announcement("a1")]).await;

        let outcome = apply_fetch(
            &store,
            &key(),
            vec![announcement("a1"), announcement("a2")],
        )
        .await;

        match outcome {
            SnapshotOutcome::Changed { fresh } => {
                assert_eq!(fresh.len(), 1);
                assert_eq!(fresh[0].id, "a2");
            }
            other => panic!("expected Changed, got {other:?}"),
        }
        assert_eq!(backend.writes().len(), 2);
    }

    #[tokio::test]
    async fn shrink_persists_and_reports_nothing() {
        let (backend, store) = store();
        apply_fetch(
            &store,
            &key(),
            vec![announcement("a1"), announcement("a2")],
        )
        .await;

        let outcome = apply_fetch(&store, &key(), vec![announcement("a1")]).await;

        match outcome {
            SnapshotOutcome::Changed { fresh } => assert!(fresh.is_empty()),
            other => panic!("expected Changed, got {other:?}"),
        }
        assert_eq!(backend.writes().len(), 2);
        assert_eq!(store.get(&key()).unwrap().len(), 1);
    }
}
