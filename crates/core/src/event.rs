//! Domain event system — decoupled observation of orchestration steps.
//!
//! Events are published when something interesting happens during a turn.
//! Subscribers (log sinks, UIs, tests) react without the orchestrator
//! knowing about them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A user turn entered a session
    TurnReceived {
        session_id: String,
        sequence: u64,
        content_preview: String,
        timestamp: DateTime<Utc>,
    },

    /// The router picked a strategy for a turn
    ActionChosen {
        session_id: String,
        action: String,
        timestamp: DateTime<Utc>,
    },

    /// A tool was executed
    ToolExecuted {
        tool_name: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A fact was upserted into the knowledge store
    KnowledgeUpdated {
        key: String,
        timestamp: DateTime<Utc>,
    },

    /// A graph run reached a terminal node
    GraphCompleted {
        terminal: String,
        steps: usize,
        timestamp: DateTime<Utc>,
    },

    /// An error occurred (recovered or not)
    ErrorOccurred {
        context: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

impl DomainEvent {
    /// Stable snake_case name, for logs and filters.
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::TurnReceived { .. } => "turn_received",
            DomainEvent::ActionChosen { .. } => "action_chosen",
            DomainEvent::ToolExecuted { .. } => "tool_executed",
            DomainEvent::KnowledgeUpdated { .. } => "knowledge_updated",
            DomainEvent::GraphCompleted { .. } => "graph_completed",
            DomainEvent::ErrorOccurred { .. } => "error_occurred",
        }
    }
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

        bus.publish(DomainEvent::ToolExecuted {
            tool_name: "calculator".into(),
            success: true,
            duration_ms: 3,
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            DomainEvent::ToolExecuted { tool_name, success, .. } => {
                assert_eq!(tool_name, "calculator");
                assert!(success);
            }
            _ => panic!("Expected ToolExecuted event"),
        }
    }

    #[tokio::test]
    async fn every_subscriber_sees_events_in_order() {
        let bus = EventBus::default();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        bus.publish(DomainEvent::TurnReceived {
            session_id: "s1".into(),
            sequence: 0,
            content_preview: "2 + 2".into(),
            timestamp: Utc::now(),
        });
        bus.publish(DomainEvent::ActionChosen {
            session_id: "s1".into(),
            action: "invoke_tool:calculator".into(),
            timestamp: Utc::now(),
        });

        for rx in [&mut first, &mut second] {
            assert_eq!(rx.recv().await.unwrap().name(), "turn_received");
            assert_eq!(rx.recv().await.unwrap().name(), "action_chosen");
        }
    }

    #[test]
    fn event_bus_no_subscribers_doesnt_panic() {
        let bus = EventBus::new(16);
        bus.publish(DomainEvent::ErrorOccurred {
            context: "test".into(),
            error_message: "no subscribers".into(),
            timestamp: Utc::now(),
        });
    }
}
