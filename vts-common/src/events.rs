//! Change-notification events
//!
//! Every successful write to a tracked table emits one event on the bus.
//! Events carry no payload beyond "this table changed for this owner";
//! subscribers always react by refetching, never by applying a delta.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Table-change notification.
///
/// Violation changes are scoped to the owning user; catalog changes
/// (sections, offenses, fines) are visible to every session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum VtsEvent {
    ViolationsChanged {
        user_id: Uuid,
        timestamp: DateTime<Utc>,
    },
    SectionsChanged {
        timestamp: DateTime<Utc>,
    },
    OffensesChanged {
        timestamp: DateTime<Utc>,
    },
    FinesChanged {
        timestamp: DateTime<Utc>,
    },
}

impl VtsEvent {
    pub fn violations_changed(user_id: Uuid) -> Self {
        VtsEvent::ViolationsChanged {
            user_id,
            timestamp: Utc::now(),
        }
    }

    pub fn sections_changed() -> Self {
        VtsEvent::SectionsChanged {
            timestamp: Utc::now(),
        }
    }

    pub fn offenses_changed() -> Self {
        VtsEvent::OffensesChanged {
            timestamp: Utc::now(),
        }
    }

    pub fn fines_changed() -> Self {
        VtsEvent::FinesChanged {
            timestamp: Utc::now(),
        }
    }

    /// Name of the table this event is about.
    pub fn table(&self) -> &'static str {
        match self {
            VtsEvent::ViolationsChanged { .. } => "violations",
            VtsEvent::SectionsChanged { .. } => "sections",
            VtsEvent::OffensesChanged { .. } => "offenses",
            VtsEvent::FinesChanged { .. } => "fines",
        }
    }

    /// Whether a session owned by `user_id` should see this event.
    pub fn visible_to(&self, user_id: Uuid) -> bool {
        match self {
            VtsEvent::ViolationsChanged { user_id: owner, .. } => *owner == user_id,
            _ => true,
        }
    }
}

/// Broadcast bus for change notifications.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<VtsEvent>,
}

impl EventBus {
    /// Creates a new EventBus with the given channel capacity.
    ///
    /// Old events are dropped once the buffer fills; subscribers that lag
    /// observe `RecvError::Lagged` and should refetch.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<VtsEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers.
    ///
    /// Returns the number of subscribers that received it. Zero subscribers
    /// is normal (no dashboard connected) and not an error.
    pub fn emit(&self, event: VtsEvent) -> usize {
        match self.tx.send(event) {
            Ok(count) => count,
            Err(_) => {
                tracing::debug!("event emitted with no subscribers");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emitted_events_reach_subscribers() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        let user = Uuid::new_v4();
        assert_eq!(bus.emit(VtsEvent::violations_changed(user)), 1);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.table(), "violations");
        assert!(event.visible_to(user));
        assert!(!event.visible_to(Uuid::new_v4()));
    }

    #[test]
    fn emit_without_subscribers_is_not_an_error() {
        let bus = EventBus::new(4);
        assert_eq!(bus.emit(VtsEvent::sections_changed()), 0);
    }

    #[test]
    fn catalog_events_are_visible_to_everyone() {
        let user = Uuid::new_v4();
        assert!(VtsEvent::sections_changed().visible_to(user));
        assert!(VtsEvent::offenses_changed().visible_to(user));
        assert!(VtsEvent::fines_changed().visible_to(user));
    }
}
