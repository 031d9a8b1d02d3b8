//! Typed publish/subscribe registry for [`TurnEvent`] topics.
//!
//! The bus decouples the turn-taking controller from its observers (the
//! presentation layer, and the controller itself for auto-resume).
//!
//! # Dispatch rules
//!
//! - Handlers for one topic run in subscription order.
//! - `publish` iterates over a snapshot of the subscriber list taken when it
//!   is called, so a handler may subscribe or unsubscribe (itself or others)
//!   without disturbing the dispatch in progress.
//! - A handler that returns an error or panics is reported through
//!   `tracing` and does not stop the remaining handlers.
//! - No ordering is promised across different topics.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::events::TurnEvent;

/// A bus subscriber. Errors are reported, never propagated to the publisher.
pub type EventHandler = Arc<dyn Fn(TurnEvent) -> anyhow::Result<()> + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    topics: HashMap<TurnEvent, Vec<(u64, EventHandler)>>,
}

/// Cloneable handle to a shared subscriber registry.
///
/// Clones share the same registry, so a clone handed to the presentation
/// layer observes everything the controller publishes.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
}

/// Returned by [`EventBus::subscribe`]; removes exactly that handler.
///
/// Dropping a `Subscription` does **not** unsubscribe. Call
/// [`unsubscribe`](Self::unsubscribe), which is idempotent and safe to call
/// from inside a handler.
#[derive(Debug, Clone)]
#[must_use = "keep the subscription to be able to unsubscribe"]
pub struct Subscription {
    registry: Weak<Mutex<Registry>>,
    topic: TurnEvent,
    id: u64,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `topic`.
    pub fn subscribe<F>(&self, topic: TurnEvent, handler: F) -> Subscription
    where
        F: Fn(TurnEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let mut registry = lock(&self.registry);
        registry.next_id += 1;
        let id = registry.next_id;
        let handlers = registry.topics.entry(topic).or_default();
        handlers.push((id, Arc::new(handler)));

        tracing::debug!(topic = %topic, handlers = handlers.len(), "Subscribed");

        Subscription {
            registry: Arc::downgrade(&self.registry),
            topic,
            id,
        }
    }

    /// Deliver `event` to every handler subscribed to it at call time.
    ///
    /// Returns the number of handlers that were invoked.
    pub fn publish(&self, event: TurnEvent) -> usize {
        let snapshot: Vec<EventHandler> = {
            let registry = lock(&self.registry);
            registry
                .topics
                .get(&event)
                .map(|handlers| handlers.iter().map(|(_, h)| Arc::clone(h)).collect())
                .unwrap_or_default()
        };

        if snapshot.is_empty() {
            tracing::trace!(topic = %event, "Event published with no handlers");
            return 0;
        }

        tracing::debug!(topic = %event, handlers = snapshot.len(), "Publishing event");

        for handler in &snapshot {
            match catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    tracing::error!(topic = %event, %error, "Event handler failed");
                }
                Err(panic) => {
                    tracing::error!(
                        topic = %event,
                        panic = panic_message(panic.as_ref()),
                        "Event handler panicked"
                    );
                }
            }
        }

        snapshot.len()
    }

    /// Whether `topic` has at least one subscriber.
    pub fn has_listeners(&self, topic: TurnEvent) -> bool {
        lock(&self.registry)
            .topics
            .get(&topic)
            .is_some_and(|handlers| !handlers.is_empty())
    }

    /// Number of subscribers currently registered for `topic`.
    pub fn listener_count(&self, topic: TurnEvent) -> usize {
        lock(&self.registry).topics.get(&topic).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = lock(&self.registry);
        let counts: HashMap<TurnEvent, usize> = registry
            .topics
            .iter()
            .map(|(topic, handlers)| (*topic, handlers.len()))
            .collect();
        f.debug_struct("EventBus").field("listeners", &counts).finish()
    }
}

impl Subscription {
    /// Topic this subscription listens to.
    pub const fn topic(&self) -> TurnEvent {
        self.topic
    }

    /// Remove the handler. Does nothing if it is already gone or the bus
    /// has been dropped.
    pub fn unsubscribe(&self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let mut registry = lock(&registry);
        if let Some(handlers) = registry.topics.get_mut(&self.topic) {
            let before = handlers.len();
            handlers.retain(|(id, _)| *id != self.id);
            if handlers.len() != before {
                tracing::debug!(
                    topic = %self.topic,
                    remaining = handlers.len(),
                    "Unsubscribed"
                );
            }
        }
    }
}

/// Handlers run outside the lock, so a poisoned registry only means a panic
/// while mutating the map itself; the map is still structurally valid.
fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
