//! Change-Detection Engine for Remote Course Resources
//!
//! Watches announcements, grades, and inbox messages on a remote course
//! platform for many registered users, and emits a domain event exactly
//! when previously-unseen content appears.
//!
//! # Design Philosophy
//!
//! **"Only additions are news"**
//!
//! - Poll on fixed intervals, diff against the last known state
//! - Report additions only; edits and removals are not events
//! - Snapshots advance only on a successful fetch
//! - One target's failure never touches another target
//! - Everything remote stays behind collaborator traits
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use coursewatch::{
//!     scheduler, AnnouncementWatcher, EventBus, FsBackend, HeartbeatRegistry,
//!     ResourceKind, SnapshotStore, WatchConfig, WatchDeps,
//! };
//!
//! let config = WatchConfig::from_env()?;
//! let deps = WatchDeps {
//!     directory: registry.clone(),        // host's Directory impl
//!     credentials: sessions.clone(),      // host's CredentialResolver impl
//!     credential_sink: sessions,          // host's CredentialSink impl
//!     bus: EventBus::with_capacity(config.bus_capacity),
//! };
//!
//! let store = Arc::new(SnapshotStore::new(
//!     ResourceKind::Announcements,
//!     Arc::new(FsBackend::for_kind(&config.snapshot_dir, ResourceKind::Announcements)),
//! ));
//! store.load().await?;
//!
//! let watcher = Arc::new(AnnouncementWatcher::new(
//!     deps.clone(),
//!     platform_client,                    // host's AnnouncementFetcher impl
//!     store,
//!     config.announcement_window,
//! ));
//!
//! let mut delivery = deps.bus.subscribe();
//! let scheduler = scheduler::start(
//!     vec![(watcher, config.announcement_interval)],
//!     HeartbeatRegistry::new(),
//! )
//! .await?;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Collaborator contracts (directory, credentials, fetchers)
//! - [`types`] - Identifiers, credentials, resource keys
//! - [`items`] - Fetched item types and their identity
//! - [`watch`] - The three watchers and their shared tick machinery
//! - [`store`] - Snapshot cache with durable JSON mirror
//! - [`diff`] - Additions-only set difference
//! - [`recency`] - Per-item admission predicates
//! - [`bus`] - Broadcast fan-out of update events
//! - [`scheduler`] - Fixed-interval tick scheduling and heartbeats
//! - [`testing`] - Scripted mock collaborators

pub mod bus;
pub mod config;
pub mod diff;
pub mod error;
pub mod events;
pub mod items;
pub mod recency;
pub mod scheduler;
pub mod store;
pub mod testing;
pub mod traits;
pub mod types;
pub mod watch;

// Re-export core types at crate root
pub use bus::EventBus;
pub use config::WatchConfig;
pub use error::{
    ConfigError, DirectoryError, DirectoryResult, FetchError, FetchResult, StoreError, WatchError,
    WatchResult,
};
pub use events::{EventEnvelope, UpdateEvent};
pub use items::{
    Announcement, Grade, GradeFeedback, GradeStatus, Identified, InboxForum, InboxPost,
};
pub use scheduler::{Heartbeat, HeartbeatRegistry};
pub use store::{FsBackend, SnapshotBackend, SnapshotStore};
pub use traits::{
    AnnouncementFetcher, CredentialResolver, CredentialSink, Directory, GradeFetcher, InboxFetcher,
};
pub use types::{CourseId, CourseInfo, Credential, ForumId, ResourceKey, ResourceKind, UserId};
pub use watch::{
    AnnouncementWatcher, GradeWatcher, InboxWatcher, TickReport, WatchDeps, Watcher,
};
