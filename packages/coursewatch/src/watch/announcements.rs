//! Course announcement watcher.
//!
//! Announcements are course-wide, so one fetch per course serves every
//! registered user. Any user's session can read the board; the watcher
//! walks the course's users in directory order until one cookie works.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use super::{
    apply_fetch, report_unauthorized, usable_credential, SnapshotOutcome, TickReport, WatchDeps,
    Watcher,
};
use crate::error::{FetchError, WatchResult};
use crate::events::UpdateEvent;
use crate::items::Announcement;
use crate::recency;
use crate::store::SnapshotStore;
use crate::traits::AnnouncementFetcher;
use crate::types::{CourseInfo, ResourceKey, ResourceKind, UserId};

pub struct AnnouncementWatcher {
    deps: WatchDeps,
    fetcher: Arc<dyn AnnouncementFetcher>,
    store: Arc<SnapshotStore<Announcement>>,
    window: chrono::Duration,
}

impl AnnouncementWatcher {
    pub fn new(
        deps: WatchDeps,
        fetcher: Arc<dyn AnnouncementFetcher>,
        store: Arc<SnapshotStore<Announcement>>,
        window: chrono::Duration,
    ) -> Self {
        Self {
            deps,
            fetcher,
            store,
            window,
        }
    }

    /// Fetch the course board with the first cookie that works.
    ///
    /// Users whose cookie is missing or fails validation are passed over
    /// silently. A rejected cookie is reported and the next user tried;
    /// a transient failure just moves on. `None` with no attempt made
    /// counts the course as skipped.
    async fn fetch_with_any_user(
        &self,
        course: &CourseInfo,
        users: &[UserId],
        report: &mut TickReport,
    ) -> Option<Vec<Announcement>> {
        let mut attempted = false;

        for user in users {
            let Some(credential) = usable_credential(self.deps.credentials.as_ref(), user).await
            else {
                continue;
            };
            attempted = true;

            match self.fetcher.fetch(&credential, &course.id).await {
                Ok(items) => {
                    report.fetched += 1;
                    return Some(items);
                }
                Err(FetchError::Unauthorized { user }) => {
                    report.unauthorized += 1;
                    report_unauthorized(
                        self.deps.credential_sink.as_ref(),
                        &user,
                        ResourceKind::Announcements,
                    )
                    .await;
                }
                Err(error) => {
                    report.transient_failures += 1;
                    tracing::warn!(
                        course_id = %course.id,
                        user = %user,
                        %error,
                        "announcement fetch failed; trying next user"
                    );
                }
            }
        }

        if !attempted {
            report.skipped += 1;
            tracing::debug!(course_id = %course.id, "no usable session cookie; skipping course");
        }
        None
    }

    fn emit_fresh(&self, course: &CourseInfo, fresh: Vec<Announcement>, report: &mut TickReport) {
        let now = Utc::now();
        for item in fresh {
            if recency::is_recent_announcement(&item, now, self.window) {
                report.events += 1;
                self.deps.bus.emit(UpdateEvent::Announcement {
                    course: course.clone(),
                    item,
                });
            } else {
                tracing::debug!(
                    course_id = %course.id,
                    announcement_id = %item.id,
                    "announcement outside the admission window; suppressed"
                );
            }
        }
    }
}

#[async_trait]
impl Watcher for AnnouncementWatcher {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Announcements
    }

    async fn tick(&self) -> WatchResult<TickReport> {
        let mut report = TickReport::default();
        let courses = self.deps.directory.active_courses().await?;

        for course in courses {
            report.targets += 1;

            let users = self.deps.directory.active_users(&course.id).await?;
            if users.is_empty() {
                report.skipped += 1;
                continue;
            }

            let Some(fetched) = self.fetch_with_any_user(&course, &users, &mut report).await
            else {
                continue;
            };

            let key = ResourceKey::announcements(&course.id);
            match apply_fetch(self.store.as_ref(), &key, fetched).await {
                SnapshotOutcome::FirstSeen => {
                    tracing::info!(course_id = %course.id, "first announcement snapshot stored");
                }
                SnapshotOutcome::Unchanged => {}
                SnapshotOutcome::Changed { fresh } => {
                    self.emit_fresh(&course, fresh, &mut report);
                }
            }
        }

        Ok(report)
    }
}
