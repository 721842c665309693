//! Testing utilities including mock collaborators.
//!
//! These exercise watchers against scripted platform behavior without a
//! live remote system. Fetcher mocks queue one response per call and
//! keep repeating the last scripted response, so multi-tick scenarios
//! read as a timeline: first entry for the first tick, and so on. Every
//! mock records its calls for assertions.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use chrono::{Duration, Utc};

use crate::error::{DirectoryError, DirectoryResult, FetchError, FetchResult, StoreError};
use crate::items::{
    Announcement, Grade, GradeFeedback, GradeStatus, InboxForum, InboxPost,
};
use crate::store::SnapshotBackend;
use crate::traits::{
    AnnouncementFetcher, CredentialResolver, CredentialSink, Directory, GradeFetcher, InboxFetcher,
};
use crate::types::{CourseId, CourseInfo, Credential, ForumId, UserId};

// ============================================================================
// SCRIPTED RESPONSES
// ============================================================================

/// One scripted fetch outcome. `Unauthorized` materializes against
/// whichever credential made the call.
#[derive(Debug, Clone)]
enum Scripted<T> {
    Ok(Vec<T>),
    Unauthorized,
    Transient(String),
}

impl<T: Clone> Scripted<T> {
    fn materialize(self, credential: &Credential) -> FetchResult<Vec<T>> {
        match self {
            Scripted::Ok(items) => Ok(items),
            Scripted::Unauthorized => Err(FetchError::Unauthorized {
                user: credential.user_id.clone(),
            }),
            Scripted::Transient(message) => Err(FetchError::transient(message)),
        }
    }
}

/// Pop the next scripted response for `key`, repeating the last one.
fn next_scripted<K, T>(
    scripts: &Mutex<HashMap<K, VecDeque<Scripted<T>>>>,
    key: &K,
) -> Option<Scripted<T>>
where
    K: std::hash::Hash + Eq + Clone,
    T: Clone,
{
    let mut scripts = scripts.lock().unwrap();
    let queue = scripts.get_mut(key)?;
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

fn push_scripted<K, T>(
    scripts: &Mutex<HashMap<K, VecDeque<Scripted<T>>>>,
    key: K,
    entry: Scripted<T>,
) where
    K: std::hash::Hash + Eq,
{
    scripts.lock().unwrap().entry(key).or_default().push_back(entry);
}

// ============================================================================
// DIRECTORY
// ============================================================================

/// Scripted watch-target enumeration.
#[derive(Default)]
pub struct MockDirectory {
    courses: Vec<CourseInfo>,
    users_by_course: HashMap<CourseId, Vec<UserId>>,
    all_users: Vec<UserId>,
    fail: bool,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a course and its users, in fallback order.
    pub fn with_course(mut self, course: CourseInfo, users: Vec<UserId>) -> Self {
        for user in &users {
            if !self.all_users.contains(user) {
                self.all_users.push(user.clone());
            }
        }
        self.users_by_course.insert(course.id.clone(), users);
        self.courses.push(course);
        self
    }

    /// Register a user with no course, for inbox-only scenarios.
    pub fn with_user(mut self, user: UserId) -> Self {
        if !self.all_users.contains(&user) {
            self.all_users.push(user);
        }
        self
    }

    /// Every enumeration fails from now on.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    fn check(&self) -> DirectoryResult<()> {
        if self.fail {
            Err(DirectoryError::new("directory unavailable"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Directory for MockDirectory {
    async fn active_courses(&self) -> DirectoryResult<Vec<CourseInfo>> {
        self.check()?;
        Ok(self.courses.clone())
    }

    async fn active_users(&self, course: &CourseId) -> DirectoryResult<Vec<UserId>> {
        self.check()?;
        Ok(self.users_by_course.get(course).cloned().unwrap_or_default())
    }

    async fn all_active_users(&self) -> DirectoryResult<Vec<UserId>> {
        self.check()?;
        Ok(self.all_users.clone())
    }
}

// ============================================================================
// CREDENTIALS
// ============================================================================

/// Hands out static cookies. Users without an entry resolve to `None`.
#[derive(Default)]
pub struct MockCredentials {
    cookies: RwLock<HashMap<UserId, Credential>>,
}

impl MockCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// A valid cookie for `user_id`.
    pub fn with_cookie(self, user_id: &str) -> Self {
        let user = UserId::new(user_id);
        let credential = Credential::new(user.clone(), format!("session-{user_id}"));
        self.cookies.write().unwrap().insert(user, credential);
        self
    }

    /// A cookie that fails local validation (already expired).
    pub fn with_expired_cookie(self, user_id: &str) -> Self {
        let user = UserId::new(user_id);
        let credential = Credential::new(user.clone(), format!("session-{user_id}"))
            .with_expiry(Utc::now() - Duration::hours(1));
        self.cookies.write().unwrap().insert(user, credential);
        self
    }

    /// Drop a user's cookie mid-scenario.
    pub fn revoke(&self, user: &UserId) {
        self.cookies.write().unwrap().remove(user);
    }
}

#[async_trait]
impl CredentialResolver for MockCredentials {
    async fn cookie_for(&self, user: &UserId) -> Option<Credential> {
        self.cookies.read().unwrap().get(user).cloned()
    }
}

/// Records invalidation reports for assertions.
#[derive(Default)]
pub struct RecordingCredentialSink {
    reports: Mutex<Vec<(UserId, String)>>,
}

impl RecordingCredentialSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<(UserId, String)> {
        self.reports.lock().unwrap().clone()
    }

    pub fn reported_users(&self) -> Vec<UserId> {
        self.reports
            .lock()
            .unwrap()
            .iter()
            .map(|(user, _)| user.clone())
            .collect()
    }
}

#[async_trait]
impl CredentialSink for RecordingCredentialSink {
    async fn report_invalid(&self, user: &UserId, reason: &str) {
        self.reports
            .lock()
            .unwrap()
            .push((user.clone(), reason.to_string()));
    }
}

// ============================================================================
// FETCHERS
// ============================================================================

/// Scripted announcement boards, keyed by course.
#[derive(Default)]
pub struct MockAnnouncements {
    scripts: Mutex<HashMap<CourseId, VecDeque<Scripted<Announcement>>>>,
    calls: Mutex<Vec<(CourseId, UserId)>>,
}

impl MockAnnouncements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(self, course: &CourseId, items: Vec<Announcement>) -> Self {
        push_scripted(&self.scripts, course.clone(), Scripted::Ok(items));
        self
    }

    pub fn with_unauthorized(self, course: &CourseId) -> Self {
        push_scripted(&self.scripts, course.clone(), Scripted::Unauthorized);
        self
    }

    pub fn with_transient(self, course: &CourseId, message: &str) -> Self {
        push_scripted(
            &self.scripts,
            course.clone(),
            Scripted::Transient(message.to_string()),
        );
        self
    }

    /// Every fetch call as (course, credential owner), in order.
    pub fn calls(&self) -> Vec<(CourseId, UserId)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl AnnouncementFetcher for MockAnnouncements {
    async fn fetch(
        &self,
        credential: &Credential,
        course: &CourseId,
    ) -> FetchResult<Vec<Announcement>> {
        self.calls
            .lock()
            .unwrap()
            .push((course.clone(), credential.user_id.clone()));

        match next_scripted(&self.scripts, course) {
            Some(scripted) => scripted.materialize(credential),
            None => Err(FetchError::transient(format!(
                "no scripted announcements for course {course}"
            ))),
        }
    }
}

/// Scripted grade lists keyed by (course, user), plus feedback scripts
/// keyed by grade id. Unscripted feedback resolves to an empty default.
#[derive(Default)]
pub struct MockGrades {
    scripts: Mutex<HashMap<(CourseId, UserId), VecDeque<Scripted<Grade>>>>,
    feedback: Mutex<HashMap<String, GradeFeedback>>,
    feedback_failures: Mutex<Vec<String>>,
    calls: Mutex<Vec<(CourseId, UserId)>>,
    feedback_calls: Mutex<Vec<String>>,
}

impl MockGrades {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(self, course: &CourseId, user: &UserId, items: Vec<Grade>) -> Self {
        push_scripted(
            &self.scripts,
            (course.clone(), user.clone()),
            Scripted::Ok(items),
        );
        self
    }

    pub fn with_unauthorized(self, course: &CourseId, user: &UserId) -> Self {
        push_scripted(
            &self.scripts,
            (course.clone(), user.clone()),
            Scripted::Unauthorized,
        );
        self
    }

    pub fn with_transient(self, course: &CourseId, user: &UserId, message: &str) -> Self {
        push_scripted(
            &self.scripts,
            (course.clone(), user.clone()),
            Scripted::Transient(message.to_string()),
        );
        self
    }

    pub fn with_feedback(self, grade_id: &str, feedback: GradeFeedback) -> Self {
        self.feedback
            .lock()
            .unwrap()
            .insert(grade_id.to_string(), feedback);
        self
    }

    /// Feedback fetches for this grade id fail.
    pub fn with_feedback_failure(self, grade_id: &str) -> Self {
        self.feedback_failures
            .lock()
            .unwrap()
            .push(grade_id.to_string());
        self
    }

    pub fn calls(&self) -> Vec<(CourseId, UserId)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn feedback_calls(&self) -> Vec<String> {
        self.feedback_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GradeFetcher for MockGrades {
    async fn fetch(
        &self,
        credential: &Credential,
        course: &CourseId,
        user: &UserId,
    ) -> FetchResult<Vec<Grade>> {
        self.calls
            .lock()
            .unwrap()
            .push((course.clone(), user.clone()));

        let key = (course.clone(), user.clone());
        match next_scripted(&self.scripts, &key) {
            Some(scripted) => scripted.materialize(credential),
            None => Err(FetchError::transient(format!(
                "no scripted grades for course {course} user {user}"
            ))),
        }
    }

    async fn fetch_feedback(
        &self,
        _credential: &Credential,
        _course: &CourseId,
        grade_id: &str,
    ) -> FetchResult<GradeFeedback> {
        self.feedback_calls.lock().unwrap().push(grade_id.to_string());

        if self
            .feedback_failures
            .lock()
            .unwrap()
            .iter()
            .any(|id| id == grade_id)
        {
            return Err(FetchError::transient(format!(
                "feedback unavailable for grade {grade_id}"
            )));
        }

        Ok(self
            .feedback
            .lock()
            .unwrap()
            .get(grade_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Scripted forum overviews keyed by user and post lists keyed by
/// (user, forum).
#[derive(Default)]
pub struct MockInbox {
    forum_scripts: Mutex<HashMap<UserId, VecDeque<Scripted<InboxForum>>>>,
    post_scripts: Mutex<HashMap<(UserId, ForumId), VecDeque<Scripted<InboxPost>>>>,
    forum_calls: Mutex<Vec<UserId>>,
    post_calls: Mutex<Vec<(UserId, ForumId)>>,
}

impl MockInbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_forums(self, user: &UserId, forums: Vec<InboxForum>) -> Self {
        push_scripted(&self.forum_scripts, user.clone(), Scripted::Ok(forums));
        self
    }

    pub fn with_forums_unauthorized(self, user: &UserId) -> Self {
        push_scripted(&self.forum_scripts, user.clone(), Scripted::Unauthorized);
        self
    }

    pub fn with_posts(self, user: &UserId, forum: &ForumId, posts: Vec<InboxPost>) -> Self {
        push_scripted(
            &self.post_scripts,
            (user.clone(), forum.clone()),
            Scripted::Ok(posts),
        );
        self
    }

    pub fn with_posts_unauthorized(self, user: &UserId, forum: &ForumId) -> Self {
        push_scripted(
            &self.post_scripts,
            (user.clone(), forum.clone()),
            Scripted::Unauthorized,
        );
        self
    }

    pub fn with_posts_transient(self, user: &UserId, forum: &ForumId, message: &str) -> Self {
        push_scripted(
            &self.post_scripts,
            (user.clone(), forum.clone()),
            Scripted::Transient(message.to_string()),
        );
        self
    }

    pub fn forum_calls(&self) -> Vec<UserId> {
        self.forum_calls.lock().unwrap().clone()
    }

    /// Every post fetch as (user, forum), in order. The unread gate
    /// shows up here as an absent call.
    pub fn post_calls(&self) -> Vec<(UserId, ForumId)> {
        self.post_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl InboxFetcher for MockInbox {
    async fn forums(&self, credential: &Credential, user: &UserId) -> FetchResult<Vec<InboxForum>> {
        self.forum_calls.lock().unwrap().push(user.clone());

        match next_scripted(&self.forum_scripts, user) {
            Some(scripted) => scripted.materialize(credential),
            None => Err(FetchError::transient(format!(
                "no scripted forums for user {user}"
            ))),
        }
    }

    async fn posts(
        &self,
        credential: &Credential,
        user: &UserId,
        forum: &ForumId,
    ) -> FetchResult<Vec<InboxPost>> {
        self.post_calls
            .lock()
            .unwrap()
            .push((user.clone(), forum.clone()));

        let key = (user.clone(), forum.clone());
        match next_scripted(&self.post_scripts, &key) {
            Some(scripted) => scripted.materialize(credential),
            None => Err(FetchError::transient(format!(
                "no scripted posts for user {user} forum {forum}"
            ))),
        }
    }
}

// ============================================================================
// SNAPSHOT BACKENDS
// ============================================================================

/// In-memory snapshot backend with a write log.
#[derive(Default)]
pub struct MemoryBackend {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
    writes: Mutex<Vec<String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw blob, bypassing the write log. For corruption and
    /// preloading scenarios.
    pub fn seed_raw(&self, key: &str, bytes: &[u8]) {
        self.blobs
            .write()
            .unwrap()
            .insert(key.to_string(), bytes.to_vec());
    }

    /// Keys written through the backend, in order, duplicates included.
    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }

    /// Decode a stored blob as a JSON collection.
    pub fn read_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<Vec<T>> {
        let blobs = self.blobs.read().unwrap();
        let bytes = blobs.get(key)?;
        serde_json::from_slice(bytes).ok()
    }
}

#[async_trait]
impl SnapshotBackend for MemoryBackend {
    async fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        self.blobs
            .write()
            .unwrap()
            .insert(key.to_string(), bytes.to_vec());
        self.writes.lock().unwrap().push(key.to_string());
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        Ok(self
            .blobs
            .read()
            .unwrap()
            .iter()
            .map(|(key, bytes)| (key.clone(), bytes.clone()))
            .collect())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.blobs.write().unwrap().remove(key);
        Ok(())
    }
}

/// Snapshot backend whose every operation fails.
pub struct FailingBackend;

#[async_trait]
impl SnapshotBackend for FailingBackend {
    async fn write(&self, _key: &str, _bytes: &[u8]) -> Result<(), StoreError> {
        Err(StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "backend down",
        )))
    }

    async fn read_all(&self) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        Err(StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "backend down",
        )))
    }

    async fn remove(&self, _key: &str) -> Result<(), StoreError> {
        Err(StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "backend down",
        )))
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub fn course(id: &str, code: &str) -> CourseInfo {
    CourseInfo {
        id: CourseId::new(id),
        code: code.to_string(),
        name: format!("Course {code}"),
    }
}

pub fn user(id: &str) -> UserId {
    UserId::new(id)
}

pub fn cookie(user_id: &str) -> Credential {
    Credential::new(UserId::new(user_id), format!("session-{user_id}"))
}

/// An announcement published an hour ago, inside any realistic window.
pub fn announcement(id: &str) -> Announcement {
    announcement_aged(id, 1)
}

pub fn announcement_aged(id: &str, hours_old: i64) -> Announcement {
    Announcement {
        id: id.to_string(),
        title: format!("Announcement {id}"),
        body: format!("Body of announcement {id}"),
        author: Some("Course staff".to_string()),
        publish_date: Some(Utc::now() - Duration::hours(hours_old)),
        start_date: None,
    }
}

pub fn undated_announcement(id: &str) -> Announcement {
    Announcement {
        publish_date: None,
        ..announcement(id)
    }
}

/// A published grade the student has not opened yet.
pub fn grade(id: &str) -> Grade {
    Grade {
        id: id.to_string(),
        title: format!("Assignment {id}"),
        score: Some("17/20".to_string()),
        status: GradeStatus::Published,
        user_last_seen: None,
        feedback: None,
    }
}

pub fn seen_grade(id: &str) -> Grade {
    Grade {
        user_last_seen: Some(Utc::now() - Duration::hours(1)),
        ..grade(id)
    }
}

pub fn draft_grade(id: &str) -> Grade {
    Grade {
        status: GradeStatus::Draft,
        ..grade(id)
    }
}

pub fn feedback(comment: &str) -> GradeFeedback {
    GradeFeedback {
        comment: Some(comment.to_string()),
        points: None,
    }
}

pub fn forum(id: &str, name: &str, unread_count: u32) -> InboxForum {
    InboxForum {
        id: ForumId::new(id),
        name: name.to_string(),
        unread_count,
    }
}

pub fn post(id: &str, read: bool) -> InboxPost {
    InboxPost {
        id: id.to_string(),
        author: Some("Instructor".to_string()),
        body: format!("Message {id}"),
        sent_at: Some(Utc::now()),
        read,
    }
}
