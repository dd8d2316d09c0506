//! Broadcast event bus for distributing `BudgetEvent` to observers.
//!
//! Built on `tokio::sync::broadcast`. Publishing never blocks the caller and
//! is a no-op when nobody is listening, so the synchronous core can publish
//! from inside a state transition.

use citebase_types::event::BudgetEvent;
use tokio::sync::broadcast;

/// Capacity used by [`EventBus::default`].
pub const DEFAULT_CAPACITY: usize = 256;

/// Multi-consumer bus for budget events.
///
/// Cloning the bus clones the sender, allowing multiple producers.
pub struct EventBus {
    sender: broadcast::Sender<BudgetEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Create a new subscriber that will receive all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<BudgetEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no subscribers, the event is silently dropped.
    pub fn publish(&self, event: BudgetEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("receiver_count", &self.sender.receiver_count())
            .finish()
    }
}
