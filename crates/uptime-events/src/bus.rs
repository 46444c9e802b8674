//! Event bus — fans backend events out to registered listeners.
//!
//! Listeners are kept per event kind in registration order. Publishing
//! takes a snapshot of the current listeners and awaits each one in turn,
//! so a listener that unsubscribes during delivery still sees the event
//! that was already in flight.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde_json::Value;
use tracing::debug;

use uptime_sync::{BoxFuture, EventHandler, EventKind, EventSource, Subscription, SyncError, SyncResult};

struct Listener {
    id: u64,
    handler: EventHandler,
}

type ListenerMap = HashMap<EventKind, Vec<Listener>>;

/// In-process event source. Clones share the same listeners.
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Arc<RwLock<ListenerMap>>,
    next_id: Arc<AtomicU64>,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener and return its guard.
    pub fn register(&self, kind: EventKind, handler: EventHandler) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut listeners = self.listeners.write().expect("listeners lock");
            listeners.entry(kind).or_default().push(Listener { id, handler });
        }
        debug!(%kind, id, "listener registered");

        let listeners = self.listeners.clone();
        Subscription::new(kind, move || {
            let mut listeners = listeners.write().expect("listeners lock");
            let slot = listeners.entry(kind).or_default();
            let before = slot.len();
            slot.retain(|l| l.id != id);
            if slot.len() == before {
                return Err(SyncError::Unsubscribe(format!(
                    "{kind} listener {id} is not registered"
                )));
            }
            debug!(%kind, id, "listener released");
            Ok(())
        })
    }

    /// Deliver a payload to every listener of `kind`.
    ///
    /// Returns the number of listeners reached.
    pub async fn publish(&self, kind: EventKind, payload: Value) -> usize {
        let handlers: Vec<EventHandler> = {
            let listeners = self.listeners.read().expect("listeners lock");
            listeners
                .get(&kind)
                .map(|slot| slot.iter().map(|l| l.handler.clone()).collect())
                .unwrap_or_default()
        };

        for handler in &handlers {
            handler(payload.clone()).await;
        }
        debug!(%kind, delivered = handlers.len(), "event published");
        handlers.len()
    }

    /// Number of listeners currently registered for `kind`.
    pub fn handler_count(&self, kind: EventKind) -> usize {
        let listeners = self.listeners.read().expect("listeners lock");
        listeners.get(&kind).map_or(0, Vec::len)
    }
}

impl EventSource for EventBus {
    fn subscribe(&self, kind: EventKind, handler: EventHandler) -> BoxFuture<'_, SyncResult<Subscription>> {
        let subscription = self.register(kind, handler);
        Box::pin(async move { Ok(subscription) })
    }
}
