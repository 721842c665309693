//! Identifier newtypes and scoping types shared across the engine.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// IDENTIFIERS (opaque platform ids)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseId(String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ForumId(String);

macro_rules! impl_id {
    ($name:ident) => {
        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

impl_id!(CourseId);
impl_id!(UserId);
impl_id!(ForumId);

// ============================================================================
// CORE TYPES
// ============================================================================

/// A watched course as the directory enumerates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseInfo {
    pub id: CourseId,
    /// Short course code shown to users (e.g. "MATH101")
    pub code: String,
    pub name: String,
}

/// A resolved session cookie for one user.
///
/// The engine never refreshes or stores cookies; it consumes whatever the
/// resolver hands out and checks the shape before use.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub user_id: UserId,
    pub cookie: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn new(user_id: UserId, cookie: impl Into<String>) -> Self {
        Self {
            user_id,
            cookie: cookie.into(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Usable at `now`: non-empty cookie and not past its expiry.
    /// No expiry on record means the cookie never expires locally.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.cookie.trim().is_empty() && self.expires_at.map_or(true, |at| at > now)
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }
}

// Cookie values never reach logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("user_id", &self.user_id)
            .field("cookie", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

// ============================================================================
// RESOURCE KEYS (snapshot addressing)
// ============================================================================

/// The three pollable resource types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Announcements,
    Grades,
    Inbox,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::Announcements,
        ResourceKind::Grades,
        ResourceKind::Inbox,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Announcements => "announcements",
            ResourceKind::Grades => "grades",
            ResourceKind::Inbox => "inbox",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "announcements" => Ok(ResourceKind::Announcements),
            "grades" => Ok(ResourceKind::Grades),
            "inbox" => Ok(ResourceKind::Inbox),
            other => Err(format!(
                "unknown resource kind {other:?} (expected announcements, grades, or inbox)"
            )),
        }
    }
}

/// Addresses one cached collection: the resource kind plus the id
/// components of its target, joined into a scope string.
///
/// Announcements are scoped per course, grades per course and user,
/// inbox per user and forum.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    kind: ResourceKind,
    scope: String,
}

impl ResourceKey {
    pub fn announcements(course: &CourseId) -> Self {
        Self {
            kind: ResourceKind::Announcements,
            scope: course.as_str().to_string(),
        }
    }

    pub fn grades(course: &CourseId, user: &UserId) -> Self {
        Self {
            kind: ResourceKind::Grades,
            scope: format!("{course}_{user}"),
        }
    }

    pub fn inbox(user: &UserId, forum: &ForumId) -> Self {
        Self {
            kind: ResourceKind::Inbox,
            scope: format!("{user}_{forum}"),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Storage key of the durable mirror: the scope with anything outside
    /// `[A-Za-z0-9._-]` replaced so it is safe as a file stem.
    pub fn storage_key(&self) -> String {
        self.scope
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '-'
                }
            })
            .collect()
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn credential_without_expiry_is_valid() {
        let credential = Credential::new(UserId::new("u1"), "session-abc");
        assert!(credential.is_valid());
    }

    #[test]
    fn empty_cookie_is_invalid() {
        let credential = Credential::new(UserId::new("u1"), "   ");
        assert!(!credential.is_valid());
    }

    #[test]
    fn expired_cookie_is_invalid() {
        let now = Utc::now();
        let credential =
            Credential::new(UserId::new("u1"), "session-abc").with_expiry(now - Duration::hours(1));
        assert!(!credential.is_valid_at(now));
    }

    #[test]
    fn future_expiry_is_valid() {
        let now = Utc::now();
        let credential =
            Credential::new(UserId::new("u1"), "session-abc").with_expiry(now + Duration::hours(1));
        assert!(credential.is_valid_at(now));
    }

    #[test]
    fn credential_debug_redacts_cookie() {
        let credential = Credential::new(UserId::new("u1"), "top-secret");
        let rendered = format!("{credential:?}");
        assert!(!rendered.contains("top-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn keys_scope_by_target_components() {
        let course = CourseId::new("42");
        let user = UserId::new("u7");
        let forum = ForumId::new("f3");

        assert_eq!(ResourceKey::announcements(&course).scope(), "42");
        assert_eq!(ResourceKey::grades(&course, &user).scope(), "42_u7");
        assert_eq!(ResourceKey::inbox(&user, &forum).scope(), "u7_f3");
    }

    #[test]
    fn storage_key_replaces_unsafe_characters() {
        let key = ResourceKey::announcements(&CourseId::new("course/42:a"));
        assert_eq!(key.storage_key(), "course-42-a");
    }

    #[test]
    fn resource_kind_round_trips_through_str() {
        for kind in ResourceKind::ALL {
            assert_eq!(kind.as_str().parse::<ResourceKind>(), Ok(kind));
        }
        assert!("mail".parse::<ResourceKind>().is_err());
    }
}
