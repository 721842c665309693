//! Per-item admission predicates applied after diffing, before emission.
//!
//! These only suppress events. They run per item, never see the whole
//! collection, and have no effect on what gets cached: size-change
//! detection already happened against the unfiltered fetch.

use chrono::{DateTime, Duration, Utc};

use crate::items::{Announcement, Grade, InboxPost};

/// Default admission window for announcement dates.
pub const DEFAULT_ANNOUNCEMENT_WINDOW_HOURS: i64 = 48;

pub fn default_announcement_window() -> Duration {
    Duration::hours(DEFAULT_ANNOUNCEMENT_WINDOW_HOURS)
}

/// An announcement passes when its publish date or display start date is
/// newer than `now - window`. Future dates pass. With neither date
/// present the item is suppressed, so rebuilding a snapshot after data
/// loss never replays an undated backlog.
pub fn is_recent_announcement(item: &Announcement, now: DateTime<Utc>, window: Duration) -> bool {
    let cutoff = now - window;
    let newer = |date: Option<DateTime<Utc>>| date.is_some_and(|d| d > cutoff);
    newer(item.publish_date) || newer(item.start_date)
}

/// A grade is notifiable only while the student has never opened it on
/// the platform itself.
pub fn is_unseen_grade(item: &Grade) -> bool {
    item.user_last_seen.is_none()
}

/// An inbox post is notifiable only while unread.
pub fn is_unread_post(item: &InboxPost) -> bool {
    !item.read
}
