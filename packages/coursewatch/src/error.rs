//! Typed errors for the watch engine.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so watchers can
//! match on failure classes when deciding how a tick proceeds.

use thiserror::Error;

use crate::types::UserId;

/// Errors surfaced by a remote resource fetch.
///
/// The class decides what a watcher does with the target: `Unauthorized`
/// is reported for credential invalidation, everything else is logged and
/// retried implicitly on the next tick. The target's snapshot is left
/// untouched either way.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The remote system rejected the session cookie
    #[error("session cookie for user {user} rejected by the remote system")]
    Unauthorized {
        /// Owner of the rejected cookie
        user: UserId,
    },

    /// Network failure, remote 5xx, or unparsable response
    #[error("transient fetch failure: {message}")]
    Transient {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl FetchError {
    /// Transient failure from a bare message.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
            source: None,
        }
    }

    /// Transient failure wrapping an underlying error.
    pub fn transient_from<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transient {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// True when the failure must invalidate the credential that made it.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

/// Watch-target enumeration failed.
///
/// There is no partial enumeration: the tick that hits this aborts,
/// keeping every snapshot written earlier in the same tick.
#[derive(Debug, Error)]
#[error("directory enumeration failed: {message}")]
pub struct DirectoryError {
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl DirectoryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn from_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Errors from the durable snapshot mirror.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem operation failed
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot could not be serialized
    #[error("snapshot serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Invalid engine configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable holds a non-numeric value
    #[error("{var} must be a positive integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
}

/// Errors that terminate a watcher tick or scheduler startup.
#[derive(Debug, Error)]
pub enum WatchError {
    /// Tick aborted before any target was processed
    #[error("tick aborted: {0}")]
    Directory(#[from] DirectoryError),

    /// Scheduler could not be built or started
    #[error("scheduler error: {0}")]
    Scheduler(#[from] tokio_cron_scheduler::JobSchedulerError),

    /// Durable snapshots could not be read at startup
    #[error("snapshot load failed: {0}")]
    Load(#[from] StoreError),
}

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for directory enumeration.
pub type DirectoryResult<T> = std::result::Result<T, DirectoryError>;

/// Result type alias for watcher ticks and scheduler operations.
pub type WatchResult<T> = std::result::Result<T, WatchError>;
