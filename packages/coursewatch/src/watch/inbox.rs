//! Inbox message watcher.
//!
//! Inbox state is per user: one forum-overview fetch enumerates the
//! user's forums, then each forum is its own target with its own post
//! snapshot. The overview's unread counters gate the expensive post
//! fetches, so an idle forum costs one overview row, not a full list.

use std::sync::Arc;

use async_trait::async_trait;

use super::{
    apply_fetch, report_unauthorized, usable_credential, SnapshotOutcome, TickReport, WatchDeps,
    Watcher,
};
use crate::error::{FetchError, WatchResult};
use crate::events::UpdateEvent;
use crate::items::{InboxForum, InboxPost};
use crate::recency;
use crate::store::SnapshotStore;
use crate::traits::InboxFetcher;
use crate::types::{Credential, ResourceKey, ResourceKind, UserId};

pub struct InboxWatcher {
    deps: WatchDeps,
    fetcher: Arc<dyn InboxFetcher>,
    store: Arc<SnapshotStore<InboxPost>>,
}

impl InboxWatcher {
    pub fn new(
        deps: WatchDeps,
        fetcher: Arc<dyn InboxFetcher>,
        store: Arc<SnapshotStore<InboxPost>>,
    ) -> Self {
        Self {
            deps,
            fetcher,
            store,
        }
    }

    /// A forum's posts are fetched only when something could have
    /// changed: no snapshot yet, or an unread counter that disagrees
    /// with the cached posts. A counter of zero with a snapshot present
    /// means every cached unread post was read, which the diff could
    /// never emit for anyway.
    fn needs_post_fetch(&self, key: &ResourceKey, forum: &InboxForum) -> bool {
        let Some(cached) = self.store.get(key) else {
            return true;
        };
        if forum.unread_count == 0 {
            return false;
        }
        let cached_unread = cached.iter().filter(|post| !post.read).count();
        forum.unread_count as usize != cached_unread
    }

    /// Process every forum of one user. Returns early when the cookie is
    /// rejected; the remaining forums would only repeat the rejection.
    async fn process_user(
        &self,
        user: &UserId,
        credential: &Credential,
        forums: Vec<InboxForum>,
        report: &mut TickReport,
    ) {
        for forum in forums {
            report.targets += 1;

            let key = ResourceKey::inbox(user, &forum.id);
            if !self.needs_post_fetch(&key, &forum) {
                report.skipped += 1;
                tracing::debug!(
                    user = %user,
                    forum_id = %forum.id,
                    unread = forum.unread_count,
                    "unread counter unchanged; skipping post fetch"
                );
                continue;
            }

            let posts = match self.fetcher.posts(credential, user, &forum.id).await {
                Ok(posts) => {
                    report.fetched += 1;
                    posts
                }
                Err(FetchError::Unauthorized { user }) => {
                    report.unauthorized += 1;
                    report_unauthorized(self.deps.credential_sink.as_ref(), &user, self.kind())
                        .await;
                    return;
                }
                Err(error) => {
                    report.transient_failures += 1;
                    tracing::warn!(
                        user = %user,
                        forum_id = %forum.id,
                        %error,
                        "post fetch failed; forum untouched until next tick"
                    );
                    continue;
                }
            };

            match apply_fetch(self.store.as_ref(), &key, posts).await {
                SnapshotOutcome::FirstSeen => {
                    tracing::info!(user = %user, forum_id = %forum.id, "first inbox snapshot stored");
                }
                SnapshotOutcome::Unchanged => {}
                SnapshotOutcome::Changed { fresh } => {
                    for item in fresh {
                        if !recency::is_unread_post(&item) {
                            tracing::debug!(
                                user = %user,
                                forum_id = %forum.id,
                                post_id = %item.id,
                                "post already read on the platform; suppressed"
                            );
                            continue;
                        }
                        report.events += 1;
                        self.deps.bus.emit(UpdateEvent::InboxMessage {
                            user_id: user.clone(),
                            forum_id: forum.id.clone(),
                            forum_name: forum.name.clone(),
                            item,
                        });
                    }
                }
            }
        }
    }
}

#[async_trait]
impl Watcher for InboxWatcher {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Inbox
    }

    async fn tick(&self) -> WatchResult<TickReport> {
        let mut report = TickReport::default();
        let users = self.deps.directory.all_active_users().await?;

        for user in users {
            let Some(credential) = usable_credential(self.deps.credentials.as_ref(), &user).await
            else {
                report.targets += 1;
                report.skipped += 1;
                continue;
            };

            let forums = match self.fetcher.forums(&credential, &user).await {
                Ok(forums) => forums,
                Err(FetchError::Unauthorized { user }) => {
                    report.targets += 1;
                    report.unauthorized += 1;
                    report_unauthorized(self.deps.credential_sink.as_ref(), &user, self.kind())
                        .await;
                    continue;
                }
                Err(error) => {
                    report.targets += 1;
                    report.transient_failures += 1;
                    tracing::warn!(user = %user, %error, "forum overview fetch failed");
                    continue;
                }
            };

            self.process_user(&user, &credential, forums, &mut report)
                .await;
        }

        Ok(report)
    }
}
