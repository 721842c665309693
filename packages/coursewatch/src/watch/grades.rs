//! Grade watcher.
//!
//! Grades are personal: every (course, user) pair is its own target with
//! its own snapshot, fetched with that user's cookie only. There is no
//! credential fallback here; another user's session cannot read someone
//! else's grades.

use std::sync::Arc;

use async_trait::async_trait;

use super::{
    apply_fetch, report_unauthorized, usable_credential, SnapshotOutcome, TickReport, WatchDeps,
    Watcher,
};
use crate::error::{FetchError, WatchResult};
use crate::events::UpdateEvent;
use crate::items::Grade;
use crate::recency;
use crate::store::SnapshotStore;
use crate::traits::GradeFetcher;
use crate::types::{CourseInfo, Credential, ResourceKey, ResourceKind, UserId};

pub struct GradeWatcher {
    deps: WatchDeps,
    fetcher: Arc<dyn GradeFetcher>,
    store: Arc<SnapshotStore<Grade>>,
}

impl GradeWatcher {
    pub fn new(
        deps: WatchDeps,
        fetcher: Arc<dyn GradeFetcher>,
        store: Arc<SnapshotStore<Grade>>,
    ) -> Self {
        Self {
            deps,
            fetcher,
            store,
        }
    }

    async fn process_target(
        &self,
        course: &CourseInfo,
        user: &UserId,
        credential: &Credential,
        report: &mut TickReport,
    ) {
        let grades = match self.fetcher.fetch(credential, &course.id, user).await {
            Ok(grades) => {
                report.fetched += 1;
                grades
            }
            Err(FetchError::Unauthorized { user }) => {
                report.unauthorized += 1;
                report_unauthorized(self.deps.credential_sink.as_ref(), &user, self.kind()).await;
                return;
            }
            Err(error) => {
                report.transient_failures += 1;
                tracing::warn!(
                    course_id = %course.id,
                    user = %user,
                    %error,
                    "grade fetch failed; target untouched until next tick"
                );
                return;
            }
        };

        // Drafts and hidden entries never enter the snapshot; a grade
        // flipping to published later must still look like an addition.
        let published: Vec<Grade> = grades.into_iter().filter(Grade::is_published).collect();

        let key = ResourceKey::grades(&course.id, user);
        match apply_fetch(self.store.as_ref(), &key, published).await {
            SnapshotOutcome::FirstSeen => {
                tracing::info!(course_id = %course.id, user = %user, "first grade snapshot stored");
            }
            SnapshotOutcome::Unchanged => {}
            SnapshotOutcome::Changed { fresh } => {
                self.emit_fresh(course, user, credential, fresh, report).await;
            }
        }
    }

    /// Enrich each notifiable grade with its full feedback, then emit.
    /// An enrichment failure drops that one grade's event and nothing
    /// else; the snapshot has already advanced.
    async fn emit_fresh(
        &self,
        course: &CourseInfo,
        user: &UserId,
        credential: &Credential,
        fresh: Vec<Grade>,
        report: &mut TickReport,
    ) {
        for grade in fresh {
            if !recency::is_unseen_grade(&grade) {
                tracing::debug!(
                    course_id = %course.id,
                    user = %user,
                    grade_id = %grade.id,
                    "grade already opened on the platform; suppressed"
                );
                continue;
            }

            match self
                .fetcher
                .fetch_feedback(credential, &course.id, &grade.id)
                .await
            {
                Ok(feedback) => {
                    let item = Grade {
                        feedback: Some(feedback),
                        ..grade
                    };
                    report.events += 1;
                    self.deps.bus.emit(UpdateEvent::Grade {
                        course: course.clone(),
                        user_id: user.clone(),
                        item,
                    });
                }
                Err(error) => {
                    report.transient_failures += 1;
                    tracing::warn!(
                        course_id = %course.id,
                        user = %user,
                        grade_id = %grade.id,
                        %error,
                        "feedback enrichment failed; dropping this grade's event"
                    );
                }
            }
        }
    }
}

#[async_trait]
impl Watcher for GradeWatcher {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Grades
    }

    async fn tick(&self) -> WatchResult<TickReport> {
        let mut report = TickReport::default();
        let courses = self.deps.directory.active_courses().await?;

        for course in courses {
            let users = self.deps.directory.active_users(&course.id).await?;

            for user in users {
                report.targets += 1;

                let Some(credential) =
                    usable_credential(self.deps.credentials.as_ref(), &user).await
                else {
                    report.skipped += 1;
                    continue;
                };

                self.process_target(&course, &user, &credential, &mut report)
                    .await;
            }
        }

        Ok(report)
    }
}
