//! Listener storage: handlers subscribed per event, in subscription order.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::handlers::{ActionHandler, FilterHandler, InitHandler};

/// The three kinds of event subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Payload-transforming, before the event completes.
    Filter,
    /// Side effect, after the event completes.
    Action,
    /// Process lifecycle.
    Init,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filter => write!(f, "filter"),
            Self::Action => write!(f, "action"),
            Self::Init => write!(f, "init"),
        }
    }
}

/// Subscription interface of the host event bus.
///
/// Handlers are identified by event name plus pointer identity: `off_*`
/// removes exactly one subscription of that very `Arc`.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Subscribes a filter handler.
    async fn on_filter(&self, event: &str, handler: Arc<dyn FilterHandler>);
    /// Subscribes an action handler.
    async fn on_action(&self, event: &str, handler: Arc<dyn ActionHandler>);
    /// Subscribes an init handler.
    async fn on_init(&self, event: &str, handler: Arc<dyn InitHandler>);
    /// Removes one subscription of `handler`. Returns whether one was found.
    async fn off_filter(&self, event: &str, handler: &Arc<dyn FilterHandler>) -> bool;
    /// Removes one subscription of `handler`. Returns whether one was found.
    async fn off_action(&self, event: &str, handler: &Arc<dyn ActionHandler>) -> bool;
    /// Removes one subscription of `handler`. Returns whether one was found.
    async fn off_init(&self, event: &str, handler: &Arc<dyn InitHandler>) -> bool;
}

#[derive(Default)]
pub(super) struct Listeners {
    pub(super) filters: HashMap<String, Vec<Arc<dyn FilterHandler>>>,
    pub(super) actions: HashMap<String, Vec<Arc<dyn ActionHandler>>>,
    pub(super) inits: HashMap<String, Vec<Arc<dyn InitHandler>>>,
}

/// In-memory event emitter.
#[derive(Default)]
pub struct Emitter {
    pub(super) listeners: RwLock<Listeners>,
}

impl fmt::Debug for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter").finish_non_exhaustive()
    }
}

fn same_handler<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

fn subscribe<T: ?Sized>(map: &mut HashMap<String, Vec<Arc<T>>>, event: &str, handler: Arc<T>) {
    map.entry(event.to_string()).or_default().push(handler);
}

fn unsubscribe<T: ?Sized>(map: &mut HashMap<String, Vec<Arc<T>>>, event: &str, handler: &Arc<T>) -> bool {
    let Some(entries) = map.get_mut(event) else {
        return false;
    };
    let Some(index) = entries.iter().rposition(|h| same_handler(h, handler)) else {
        return false;
    };
    entries.remove(index);
    if entries.is_empty() {
        map.remove(event);
    }
    true
}

impl Emitter {
    /// Creates an emitter with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of handlers subscribed to `event`.
    pub async fn listener_count(&self, kind: EventKind, event: &str) -> usize {
        let listeners = self.listeners.read().await;
        match kind {
            EventKind::Filter => listeners.filters.get(event).map_or(0, Vec::len),
            EventKind::Action => listeners.actions.get(event).map_or(0, Vec::len),
            EventKind::Init => listeners.inits.get(event).map_or(0, Vec::len),
        }
    }

    /// Returns the total number of subscriptions across all events.
    pub async fn total_listeners(&self) -> usize {
        let listeners = self.listeners.read().await;
        listeners.filters.values().map(Vec::len).sum::<usize>()
            + listeners.actions.values().map(Vec::len).sum::<usize>()
            + listeners.inits.values().map(Vec::len).sum::<usize>()
    }

    /// Returns the events that have at least one subscription of `kind`.
    pub async fn events(&self, kind: EventKind) -> Vec<String> {
        let listeners = self.listeners.read().await;
        let mut events: Vec<String> = match kind {
            EventKind::Filter => listeners.filters.keys().cloned().collect(),
            EventKind::Action => listeners.actions.keys().cloned().collect(),
            EventKind::Init => listeners.inits.keys().cloned().collect(),
        };
        events.sort();
        events
    }
}

#[async_trait]
impl EventBus for Emitter {
    async fn on_filter(&self, event: &str, handler: Arc<dyn FilterHandler>) {
        subscribe(&mut self.listeners.write().await.filters, event, handler);
        debug!(event = %event, kind = %EventKind::Filter, "Handler subscribed");
    }

    async fn on_action(&self, event: &str, handler: Arc<dyn ActionHandler>) {
        subscribe(&mut self.listeners.write().await.actions, event, handler);
        debug!(event = %event, kind = %EventKind::Action, "Handler subscribed");
    }

    async fn on_init(&self, event: &str, handler: Arc<dyn InitHandler>) {
        subscribe(&mut self.listeners.write().await.inits, event, handler);
        debug!(event = %event, kind = %EventKind::Init, "Handler subscribed");
    }

    async fn off_filter(&self, event: &str, handler: &Arc<dyn FilterHandler>) -> bool {
        unsubscribe(&mut self.listeners.write().await.filters, event, handler)
    }

    async fn off_action(&self, event: &str, handler: &Arc<dyn ActionHandler>) -> bool {
        unsubscribe(&mut self.listeners.write().await.actions, event, handler)
    }

    async fn off_init(&self, event: &str, handler: &Arc<dyn InitHandler>) -> bool {
        unsubscribe(&mut self.listeners.write().await.inits, event, handler)
    }
}
