//! Broadcast fan-out of detected updates to delivery subscribers.
//!
//! # Guarantees
//!
//! - **At-most-once delivery**: slow receivers may miss events
//! - **In-memory only**: nothing is persisted, nothing is replayed
//! - **Non-blocking emit**: a watcher tick never waits on delivery
//!
//! Durability lives in the snapshot store. An update a subscriber misses
//! here is gone; the snapshot has already advanced past it.

use tokio::sync::broadcast;

use crate::events::{EventEnvelope, UpdateEvent};

/// Default channel capacity for the event bus.
const DEFAULT_CAPACITY: usize = 1024;

/// Broadcast channel carrying [`EventEnvelope`]s to every subscriber.
///
/// Cloning is cheap and every clone shares the same channel, so watchers
/// and the host hold their own handles.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    /// Create a bus with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a bus with a specific capacity.
    ///
    /// The capacity bounds how many undelivered envelopes a slow receiver
    /// can fall behind before it starts lagging.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Wrap an update in an envelope and broadcast it (fire-and-forget).
    ///
    /// Returns the number of receivers the envelope reached. Zero means
    /// nobody is listening; the event is dropped, not queued.
    pub fn emit(&self, event: UpdateEvent) -> usize {
        let envelope = EventEnvelope::new(event);
        tracing::debug!(
            event_id = %envelope.id,
            kind = %envelope.event.kind(),
            item_id = %envelope.event.item_id(),
            "emitting update event"
        );
        self.sender.send(envelope).unwrap_or(0)
    }

    /// Subscribe to envelopes emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::Announcement;
    use crate::types::{CourseId, CourseInfo};

    fn announcement_event(id: &str) -> UpdateEvent {
        UpdateEvent::Announcement {
            course: CourseInfo {
                id: CourseId::new("42"),
                code: "MATH101".to_string(),
                name: "Mathematics 101".to_string(),
            },
            item: Announcement {
                id: id.to_string(),
                title: format!("Announcement {id}"),
                body: String::new(),
                author: None,
                publish_date: None,
                start_date: None,
            },
        }
    }

    #[tokio::test]
    async fn emit_and_receive() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();

        bus.emit(announcement_event("a1"));

        let envelope = receiver.recv().await.unwrap();
        assert_eq!(envelope.event.item_id(), "a1");
    }

    #[tokio::test]
    async fn every_subscriber_sees_every_event() {
        let bus = EventBus::new();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        bus.emit(announcement_event("a1"));

        assert_eq!(first.recv().await.unwrap().event.item_id(), "a1");
        assert_eq!(second.recv().await.unwrap().event.item_id(), "a1");
    }

    #[tokio::test]
    async fn emit_returns_receiver_count() {
        let bus = EventBus::new();
        assert_eq!(bus.emit(announcement_event("a1")), 0);

        let _first = bus.subscribe();
        assert_eq!(bus.emit(announcement_event("a2")), 1);

        let _second = bus.subscribe();
        assert_eq!(bus.emit(announcement_event("a3")), 2);
    }

    #[tokio::test]
    async fn late_subscriber_misses_earlier_events() {
        let bus = EventBus::new();
        bus.emit(announcement_event("a1"));

        let mut receiver = bus.subscribe();
        bus.emit(announcement_event("a2"));

        let envelope = receiver.recv().await.unwrap();
        assert_eq!(envelope.event.item_id(), "a2");
    }

    #[tokio::test]
    async fn clone_shares_channel() {
        let bus = EventBus::new();
        let cloned = bus.clone();
        let mut receiver = bus.subscribe();

        cloned.emit(announcement_event("a1"));

        assert_eq!(receiver.recv().await.unwrap().event.item_id(), "a1");
    }

    #[test]
    fn debug_reports_subscriber_count() {
        let bus = EventBus::new();
        let _receiver = bus.subscribe();
        let rendered = format!("{bus:?}");
        assert!(rendered.contains("EventBus"));
        assert!(rendered.contains("subscriber_count"));
    }
}
