//! Domain events emitted when previously-unseen content is detected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::items::{Announcement, Grade, InboxPost};
use crate::types::{CourseInfo, ForumId, ResourceKind, UserId};

/// A newly-detected item plus the routing context delivery needs.
///
/// Announcement events are course-wide; grade and inbox events belong to
/// exactly one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UpdateEvent {
    Announcement {
        course: CourseInfo,
        item: Announcement,
    },

    Grade {
        course: CourseInfo,
        user_id: UserId,
        item: Grade,
    },

    InboxMessage {
        user_id: UserId,
        forum_id: ForumId,
        forum_name: String,
        item: InboxPost,
    },
}

impl UpdateEvent {
    /// Resource kind that produced this event.
    pub fn kind(&self) -> ResourceKind {
        match self {
            UpdateEvent::Announcement { .. } => ResourceKind::Announcements,
            UpdateEvent::Grade { .. } => ResourceKind::Grades,
            UpdateEvent::InboxMessage { .. } => ResourceKind::Inbox,
        }
    }

    /// Id of the detected item inside its source collection.
    pub fn item_id(&self) -> &str {
        match self {
            UpdateEvent::Announcement { item, .. } => &item.id,
            UpdateEvent::Grade { item, .. } => &item.id,
            UpdateEvent::InboxMessage { item, .. } => &item.id,
        }
    }
}

/// Broadcast wrapper identifying one emission for downstream logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: Uuid,
    pub emitted_at: DateTime<Utc>,
    pub event: UpdateEvent,
}

impl EventEnvelope {
    pub fn new(event: UpdateEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            emitted_at: Utc::now(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::GradeStatus;
    use crate::types::CourseId;

    fn sample_event() -> UpdateEvent {
        UpdateEvent::Grade {
            course: CourseInfo {
                id: CourseId::new("42"),
                code: "MATH101".to_string(),
                name: "Mathematics 101".to_string(),
            },
            user_id: UserId::new("u1"),
            item: Grade {
                id: "g1".to_string(),
                title: "Problem set 3".to_string(),
                score: Some("17/20".to_string()),
                status: GradeStatus::Published,
                user_last_seen: None,
                feedback: None,
            },
        }
    }

    #[test]
    fn envelopes_get_unique_ids() {
        let a = EventEnvelope::new(sample_event());
        let b = EventEnvelope::new(sample_event());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn event_kind_matches_variant() {
        assert_eq!(sample_event().kind(), ResourceKind::Grades);
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(sample_event()).unwrap();
        assert_eq!(json["type"], "grade");
        assert_eq!(json["item"]["id"], "g1");
        assert_eq!(json["item"]["status"], "published");
    }
}
