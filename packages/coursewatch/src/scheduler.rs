//! Fixed-interval scheduling of watcher ticks using tokio-cron-scheduler.
//!
//! One repeated job per watcher, each on its own period. Ticks fire on
//! schedule regardless of whether the previous tick finished; per-key
//! snapshot updates keep an overlap harmless, it just re-fetches.
//!
//! ```text
//! JobScheduler (per-watcher period)
//!     │
//!     └─► watcher.tick()
//!             ├─ Ok(report)  → log + record heartbeat
//!             └─ Err(error)  → log, next interval retries implicitly
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::error::WatchResult;
use crate::types::ResourceKind;
use crate::watch::{TickReport, Watcher};

/// Completion record of the most recent successful tick.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Heartbeat {
    pub completed_at: DateTime<Utc>,
    pub report: TickReport,
}

/// Last successful tick per watcher kind.
///
/// Failed ticks leave the previous heartbeat in place, so a stale
/// `completed_at` is the host's signal that a watcher stopped making
/// progress. The engine itself never reads these back.
#[derive(Debug, Clone, Default)]
pub struct HeartbeatRegistry {
    inner: Arc<DashMap<ResourceKind, Heartbeat>>,
}

impl HeartbeatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, kind: ResourceKind, report: TickReport) {
        self.inner.insert(
            kind,
            Heartbeat {
                completed_at: Utc::now(),
                report,
            },
        );
    }

    pub fn last(&self, kind: ResourceKind) -> Option<Heartbeat> {
        self.inner.get(&kind).map(|beat| beat.clone())
    }
}

/// Register one repeated job per watcher and start the scheduler.
///
/// The returned handle keeps the jobs alive; shut it down (or drop the
/// runtime) to stop polling.
pub async fn start(
    watchers: Vec<(Arc<dyn Watcher>, Duration)>,
    heartbeats: HeartbeatRegistry,
) -> WatchResult<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    for (watcher, period) in watchers {
        let kind = watcher.kind();
        let beats = heartbeats.clone();

        let job = Job::new_repeated_async(period, move |_uuid, _lock| {
            let watcher = watcher.clone();
            let beats = beats.clone();
            Box::pin(async move {
                run_tick(watcher, beats).await;
            })
        })?;

        scheduler.add(job).await?;
        tracing::info!(watcher = %kind, period_secs = period.as_secs(), "watcher scheduled");
    }

    scheduler.start().await?;
    tracing::info!("watch scheduler started");
    Ok(scheduler)
}

async fn run_tick(watcher: Arc<dyn Watcher>, beats: HeartbeatRegistry) {
    let kind = watcher.kind();
    tracing::debug!(watcher = %kind, "tick started");

    match watcher.tick().await {
        Ok(report) => {
            tracing::info!(
                watcher = %kind,
                targets = report.targets,
                fetched = report.fetched,
                skipped = report.skipped,
                unauthorized = report.unauthorized,
                transient_failures = report.transient_failures,
                events = report.events,
                "tick completed"
            );
            beats.record(kind, report);
        }
        Err(error) => {
            tracing::error!(watcher = %kind, %error, "tick failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    struct CountingWatcher {
        ticks: AtomicUsize,
    }

    #[async_trait]
    impl Watcher for CountingWatcher {
        fn kind(&self) -> ResourceKind {
            ResourceKind::Announcements
        }

        async fn tick(&self) -> WatchResult<TickReport> {
            self.ticks.fetch_add(1, Ordering::SeqCst);
            Ok(TickReport {
                targets: 1,
                ..TickReport::default()
            })
        }
    }

    struct FailingWatcher;

    #[async_trait]
    impl Watcher for FailingWatcher {
        fn kind(&self) -> ResourceKind {
            ResourceKind::Grades
        }

        async fn tick(&self) -> WatchResult<TickReport> {
            Err(crate::error::DirectoryError::new("directory down").into())
        }
    }

    // Repeated jobs have second granularity, so these tests run on real
    // seconds rather than millisecond periods.
    #[tokio::test]
    async fn scheduler_ticks_watchers_repeatedly() {
        let watcher = Arc::new(CountingWatcher {
            ticks: AtomicUsize::new(0),
        });
        let heartbeats = HeartbeatRegistry::new();

        let mut scheduler = start(
            vec![(watcher.clone(), Duration::from_secs(1))],
            heartbeats.clone(),
        )
        .await
        .unwrap();

        tokio::time::sleep(Duration::from_millis(2500)).await;
        scheduler.shutdown().await.unwrap();

        assert!(watcher.ticks.load(Ordering::SeqCst) >= 2);
        let beat = heartbeats.last(ResourceKind::Announcements).unwrap();
        assert_eq!(beat.report.targets, 1);
    }

    #[tokio::test]
    async fn failed_ticks_leave_no_heartbeat() {
        let heartbeats = HeartbeatRegistry::new();

        let mut scheduler = start(
            vec![(Arc::new(FailingWatcher), Duration::from_secs(1))],
            heartbeats.clone(),
        )
        .await
        .unwrap();

        tokio::time::sleep(Duration::from_millis(1500)).await;
        scheduler.shutdown().await.unwrap();

        assert!(heartbeats.last(ResourceKind::Grades).is_none());
    }

    #[tokio::test]
    async fn heartbeats_track_the_latest_report() {
        let heartbeats = HeartbeatRegistry::new();

        heartbeats.record(ResourceKind::Inbox, TickReport::default());
        heartbeats.record(
            ResourceKind::Inbox,
            TickReport {
                events: 3,
                ..TickReport::default()
            },
        );

        assert_eq!(heartbeats.last(ResourceKind::Inbox).unwrap().report.events, 3);
    }
}
