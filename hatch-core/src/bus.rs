//! Process-wide event publication.
//!
//! The bus is constructor-injected into every component that publishes or
//! consumes runtime events; its lifecycle is tied to the coordinator
//! instance so tests stay hermetic. Dispatch is fan-out over a tokio
//! broadcast channel: slow consumers lag and miss, they never block
//! producers.

use crate::events::RuntimeEvent;
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<RuntimeEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Publishing with no subscribers is not an error; the event is simply
    /// dropped.
    pub fn publish(&self, event: RuntimeEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RuntimeEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
