//! In-process live event hub
//!
//! Named events fan out to every current listener over a per-name
//! broadcast channel. A listener that falls behind loses the oldest events
//! rather than blocking the publisher, so delivery is best effort.
//!
//! Listener registrations are tracked so that the number of live listeners
//! per event is observable; a [`Subscription`] deregisters itself exactly
//! once, on `release()` or on drop.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};
use types::operation::OperationRecord;

use crate::error::FeedError;
use crate::source::LiveSource;

/// Payload delivered to listeners.
pub type LiveEvent = Arc<OperationRecord>;

/// Unique listener identifier.
pub type SubscriptionId = u64;

/// Events buffered per listener before the oldest are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

struct EmitterState {
    channels: BTreeMap<String, broadcast::Sender<LiveEvent>>,
    listeners: BTreeMap<SubscriptionId, String>,
    next_id: SubscriptionId,
}

/// Publish/subscribe hub keyed by event name. Clones share listeners.
#[derive(Clone)]
pub struct EventEmitter {
    state: Arc<Mutex<EmitterState>>,
    capacity: usize,
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(EmitterState {
                channels: BTreeMap::new(),
                listeners: BTreeMap::new(),
                next_id: 1,
            })),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, EmitterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deliver `record` to every listener of `event_name`.
    ///
    /// Returns the number of listeners reached.
    pub fn emit(&self, event_name: &str, record: LiveEvent) -> usize {
        let state = self.lock();
        match state.channels.get(event_name) {
            Some(sender) => sender.send(record).unwrap_or(0),
            None => 0,
        }
    }

    /// Register a listener for `event_name`.
    pub fn listen(&self, event_name: &str) -> Subscription {
        let mut state = self.lock();
        let capacity = self.capacity;
        let receiver = state
            .channels
            .entry(event_name.to_string())
            .or_insert_with(|| broadcast::channel(capacity).0)
            .subscribe();

        let id = state.next_id;
        state.next_id += 1;
        state.listeners.insert(id, event_name.to_string());
        debug!(subscription_id = id, event = event_name, "Listener registered");

        Subscription {
            id,
            event_name: event_name.to_string(),
            receiver,
            registry: Arc::downgrade(&self.state),
            released: false,
        }
    }

    /// Drop the channel for `event_name`; its listeners observe end of stream.
    pub fn close(&self, event_name: &str) {
        if self.lock().channels.remove(event_name).is_some() {
            debug!(event = event_name, "Event channel closed");
        }
    }

    /// Number of registered listeners for `event_name`.
    pub fn listener_count(&self, event_name: &str) -> usize {
        self.lock()
            .listeners
            .values()
            .filter(|name| name.as_str() == event_name)
            .count()
    }
}

impl LiveSource for EventEmitter {
    fn subscribe(&self, event_name: &str) -> Result<Subscription, FeedError> {
        if event_name.is_empty() {
            return Err(FeedError::Subscription("event name is empty".to_string()));
        }
        Ok(self.listen(event_name))
    }
}

/// A listener registration. Deregisters on `release()` or drop.
pub struct Subscription {
    id: SubscriptionId,
    event_name: String,
    receiver: broadcast::Receiver<LiveEvent>,
    registry: Weak<Mutex<EmitterState>>,
    released: bool,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// Next event, or `None` once the channel has closed.
    ///
    /// Events missed because this listener lagged are skipped with a warning.
    pub async fn next(&mut self) -> Option<LiveEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(
                        subscription_id = self.id,
                        event = %self.event_name,
                        skipped,
                        "Live listener lagged, events dropped"
                    );
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Deregister now instead of on drop.
    pub fn release(mut self) {
        self.deregister();
    }

    fn deregister(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Some(registry) = self.registry.upgrade() {
            let mut state = registry.lock().unwrap_or_else(PoisonError::into_inner);
            state.listeners.remove(&self.id);
        }
        debug!(subscription_id = self.id, event = %self.event_name, "Listener released");
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.deregister();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("event_name", &self.event_name)
            .field("released", &self.released)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{manage_data, payment, OTHER, WATCHED};

    #[tokio::test]
    async fn test_emit_reaches_every_listener() {
        let emitter = EventEmitter::new();
        let mut first = emitter.listen("newOperation");
        let mut second = emitter.listen("newOperation");

        let reached = emitter.emit("newOperation", Arc::new(payment("1", OTHER, WATCHED)));

        assert_eq!(reached, 2);
        assert_eq!(first.next().await.unwrap().id.as_str(), "1");
        assert_eq!(second.next().await.unwrap().id.as_str(), "1");
    }

    #[tokio::test]
    async fn test_events_are_scoped_by_name() {
        let emitter = EventEmitter::new();
        let mut listener = emitter.listen("a");

        assert_eq!(emitter.emit("b", Arc::new(manage_data("1", "k"))), 0);
        emitter.emit("a", Arc::new(manage_data("2", "k")));

        assert_eq!(listener.next().await.unwrap().id.as_str(), "2");
    }

    #[test]
    fn test_emit_without_listeners() {
        let emitter = EventEmitter::new();
        assert_eq!(emitter.emit("newOperation", Arc::new(manage_data("1", "k"))), 0);
    }

    #[test]
    fn test_release_deregisters_once() {
        let emitter = EventEmitter::new();
        let sub = emitter.listen("newOperation");
        let other = emitter.listen("newOperation");
        assert_eq!(emitter.listener_count("newOperation"), 2);

        sub.release();
        assert_eq!(emitter.listener_count("newOperation"), 1);

        drop(other);
        assert_eq!(emitter.listener_count("newOperation"), 0);
    }

    #[tokio::test]
    async fn test_closed_channel_ends_stream() {
        let emitter = EventEmitter::new();
        let mut sub = emitter.listen("newOperation");

        emitter.close("newOperation");

        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn test_lagging_listener_skips_oldest() {
        let emitter = EventEmitter::with_capacity(2);
        let mut sub = emitter.listen("newOperation");

        for i in 0..4 {
            emitter.emit("newOperation", Arc::new(manage_data(&i.to_string(), "k")));
        }

        assert_eq!(sub.next().await.unwrap().id.as_str(), "2");
        assert_eq!(sub.next().await.unwrap().id.as_str(), "3");
    }

    #[test]
    fn test_live_source_rejects_empty_name() {
        let emitter = EventEmitter::new();
        assert!(matches!(
            LiveSource::subscribe(&emitter, ""),
            Err(FeedError::Subscription(_))
        ));
    }
}
