//! Collaborator contracts the engine calls out through.
//!
//! Everything remote or host-owned sits behind these traits: target
//! enumeration, credential storage, and the platform fetches themselves.
//! The engine keeps only scheduling, snapshots, diffing, and emission.
//! Production implementations live in the host; scripted ones live in
//! [`testing`](crate::testing).

use async_trait::async_trait;

use crate::error::{DirectoryResult, FetchResult};
use crate::items::{Announcement, Grade, GradeFeedback, InboxForum, InboxPost};
use crate::types::{CourseId, CourseInfo, Credential, ForumId, UserId};

// ============================================================================
// DIRECTORY: which courses and users are being watched
// ============================================================================

/// Enumerates watch targets at the start of every tick.
///
/// Enumeration order is the processing order within a tick, and for
/// announcements also the credential fallback order.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Courses with at least one registered user.
    async fn active_courses(&self) -> DirectoryResult<Vec<CourseInfo>>;

    /// Registered users of one course, preferred credential owner first.
    async fn active_users(&self, course: &CourseId) -> DirectoryResult<Vec<UserId>>;

    /// Every registered user across all courses.
    async fn all_active_users(&self) -> DirectoryResult<Vec<UserId>>;
}

// ============================================================================
// CREDENTIALS: resolved session cookies
// ============================================================================

/// Hands out resolved session cookies.
///
/// `None` means no session is on file for that user; the caller skips
/// the target silently. Resolution and refresh are entirely the host's
/// concern.
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    async fn cookie_for(&self, user: &UserId) -> Option<Credential>;
}

/// Receives invalidation reports when the remote system rejects a cookie.
///
/// The engine only reports; whatever re-authentication flow follows is
/// outside it.
#[async_trait]
pub trait CredentialSink: Send + Sync {
    async fn report_invalid(&self, user: &UserId, reason: &str);
}

// ============================================================================
// FETCHERS: one opaque remote call per resource type
// ============================================================================

#[async_trait]
pub trait AnnouncementFetcher: Send + Sync {
    /// All current announcements of a course, platform order preserved.
    async fn fetch(
        &self,
        credential: &Credential,
        course: &CourseId,
    ) -> FetchResult<Vec<Announcement>>;
}

#[async_trait]
pub trait GradeFetcher: Send + Sync {
    /// All grade entries of one user in one course, drafts included.
    async fn fetch(
        &self,
        credential: &Credential,
        course: &CourseId,
        user: &UserId,
    ) -> FetchResult<Vec<Grade>>;

    /// Full feedback for one grade, fetched right before emission.
    async fn fetch_feedback(
        &self,
        credential: &Credential,
        course: &CourseId,
        grade_id: &str,
    ) -> FetchResult<GradeFeedback>;
}

#[async_trait]
pub trait InboxFetcher: Send + Sync {
    /// The user's forum overview with unread counters.
    async fn forums(
        &self,
        credential: &Credential,
        user: &UserId,
    ) -> FetchResult<Vec<InboxForum>>;

    /// Every post of one forum.
    async fn posts(
        &self,
        credential: &Credential,
        user: &UserId,
        forum: &ForumId,
    ) -> FetchResult<Vec<InboxPost>>;
}
