//! Fetched item types and their identity and visibility fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::ForumId;

/// Stable identity of a fetched item across polls.
///
/// Diffing is identity-based only: two fetches of the same item may
/// differ field by field (edits, score changes) without being "new".
pub trait Identified {
    fn id(&self) -> &str;
}

// ============================================================================
// ANNOUNCEMENTS
// ============================================================================

/// A course bulletin-board announcement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub author: Option<String>,
    /// When the announcement was published, if the platform exposes it
    pub publish_date: Option<DateTime<Utc>>,
    /// Display start of the announcement; platforms schedule these ahead
    pub start_date: Option<DateTime<Utc>>,
}

impl Identified for Announcement {
    fn id(&self) -> &str {
        &self.id
    }
}

// ============================================================================
// GRADES
// ============================================================================

/// Publication state of a grade entry on the platform side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeStatus {
    Published,
    Draft,
    Hidden,
}

/// One graded assignment entry for one user in one course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grade {
    pub id: String,
    /// Assignment or task title the grade belongs to
    pub title: String,
    pub score: Option<String>,
    pub status: GradeStatus,
    /// When the student last opened this grade inside the platform.
    /// `Some` means they already saw it there.
    pub user_last_seen: Option<DateTime<Utc>>,
    /// Filled by the enrichment fetch right before emission; cached
    /// snapshots carry `None`
    pub feedback: Option<GradeFeedback>,
}

impl Grade {
    /// Only published grades enter snapshots and events.
    pub fn is_published(&self) -> bool {
        self.status == GradeStatus::Published
    }
}

impl Identified for Grade {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Teacher feedback attached to a grade.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GradeFeedback {
    pub comment: Option<String>,
    pub points: Option<String>,
}

// ============================================================================
// INBOX
// ============================================================================

/// One row of a user's forum overview. Enumeration input only; these are
/// never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxForum {
    pub id: ForumId,
    pub name: String,
    pub unread_count: u32,
}

/// A message inside one inbox forum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboxPost {
    pub id: String,
    pub author: Option<String>,
    #[serde(default)]
    pub body: String,
    pub sent_at: Option<DateTime<Utc>>,
    /// Read state on the platform side at fetch time
    pub read: bool,
}

impl Identified for InboxPost {
    fn id(&self) -> &str {
        &self.id
    }
}
