//! Domain events: what happened to a session, for whoever is listening.
//!
//! The engine publishes an event after each synthesis or instruction settles.
//! Presentation layers can subscribe to refresh views without polling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A source was added to a session's registry
    SourceAdded {
        session_id: String,
        source_id: String,
        kind: String,
        timestamp: DateTime<Utc>,
    },

    /// A fresh document was synthesized from the sources
    DocumentGenerated {
        session_id: String,
        source_count: usize,
        section_count: usize,
        stale_citations: usize,
        timestamp: DateTime<Utc>,
    },

    /// A synthesis attempt failed; no document was produced
    GenerationFailed {
        session_id: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// An edit instruction produced a new document version
    DocumentRevised {
        session_id: String,
        from_version: u64,
        to_version: u64,
        timestamp: DateTime<Utc>,
    },

    /// An edit instruction failed; the live document is unchanged
    RevisionFailed {
        session_id: String,
        version: u64,
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// A query instruction was answered (or failed softly)
    QueryAnswered {
        session_id: String,
        version: u64,
        success: bool,
        timestamp: DateTime<Utc>,
    },

    /// An instruction arrived before any document existed
    InstructionDeclined {
        session_id: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn event_bus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(DomainEvent::DocumentRevised {
            session_id: "s1".into(),
            from_version: 1,
            to_version: 2,
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            DomainEvent::DocumentRevised { from_version, to_version, .. } => {
                assert_eq!(*from_version, 1);
                assert_eq!(*to_version, 2);
            }
            _ => panic!("Expected DocumentRevised event"),
        }
    }

    #[test]
    fn event_bus_no_subscribers_doesnt_panic() {
        let bus = EventBus::new(16);
        bus.publish(DomainEvent::InstructionDeclined {
            session_id: "s1".into(),
            timestamp: Utc::now(),
        });
    }
}
