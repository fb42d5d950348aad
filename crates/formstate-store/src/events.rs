//! Notifications for the host UI.
//!
//! Events fan out over a tokio broadcast channel. Publishing with no
//! subscribers is not an error; the snapshot stays the source of truth.

use formstate_model::Feedback;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

/// Something the host UI may want to react to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "lowercase")]
pub enum FormEvent {
    /// A manual submit succeeded.
    Saved(Value),
    /// An autosave succeeded.
    Autosaved(Value),
    /// A manual submit was rejected by the server.
    ValidationFail(Vec<Feedback>),
}

impl FormEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Saved(_) => "saved",
            Self::Autosaved(_) => "autosaved",
            Self::ValidationFail(_) => "validationfail",
        }
    }
}

/// In-process event fan-out.
#[derive(Debug)]
pub struct EventBus {
    tx: broadcast::Sender<FormEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn publish(&self, event: FormEvent) {
        tracing::debug!(event = event.name(), "dispatching form event");
        // no receivers is fine
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FormEvent> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_bus_delivers_event() {
        let bus = EventBus::new(4);
        let mut rx = bus.subscribe();
        bus.publish(FormEvent::Saved(json!({ "id": 1 })));
        assert_eq!(rx.recv().await.unwrap(), FormEvent::Saved(json!({ "id": 1 })));
    }

    #[test]
    fn test_publish_without_subscribers_is_ok() {
        let bus = EventBus::new(0);
        bus.publish(FormEvent::ValidationFail(vec![]));
    }

    #[test]
    fn test_event_wire_shape() {
        let value = serde_json::to_value(FormEvent::ValidationFail(vec![])).unwrap();
        assert_eq!(value, json!({ "event": "validationfail", "payload": [] }));
    }
}
