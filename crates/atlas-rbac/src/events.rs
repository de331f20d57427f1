//! Change notifications from the permission store.
//!
//! Consumers either hold a broadcast receiver or register a callback; both
//! see every event emitted after they subscribed.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;

/// Store-level signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RbacEvent {
    /// Roles or permissions changed and the store reloaded.
    Changed,
    /// An override changed; consumers should re-evaluate.
    Updated,
}

type Callback = Arc<dyn Fn(RbacEvent) + Send + Sync>;
type Callbacks = Mutex<Vec<(u64, Callback)>>;

/// Fan-out point for [`RbacEvent`]s.
pub struct EventHub {
    sender: broadcast::Sender<RbacEvent>,
    callbacks: Arc<Callbacks>,
    next_id: AtomicU64,
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            callbacks: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RbacEvent> {
        self.sender.subscribe()
    }

    /// Register `callback`; it runs until the returned subscription is
    /// dropped or unsubscribed.
    pub fn on_event<F>(&self, callback: F) -> Subscription
    where
        F: Fn(RbacEvent) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.callbacks.lock().push((id, Arc::new(callback)));
        Subscription {
            id,
            callbacks: Arc::downgrade(&self.callbacks),
        }
    }

    pub fn emit(&self, event: RbacEvent) {
        // No receivers is not an error.
        let _ = self.sender.send(event);

        let callbacks: Vec<Callback> = self
            .callbacks
            .lock()
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for callback in callbacks {
            callback(event);
        }
        tracing::trace!(?event, "rbac event emitted");
    }

    pub fn callback_count(&self) -> usize {
        self.callbacks.lock().len()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(64)
    }
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub")
            .field("receivers", &self.sender.receiver_count())
            .field("callbacks", &self.callback_count())
            .finish()
    }
}

/// Handle for a registered callback.
#[must_use = "dropping a Subscription unregisters its callback"]
pub struct Subscription {
    id: u64,
    callbacks: Weak<Callbacks>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(callbacks) = self.callbacks.upgrade() {
            callbacks.lock().retain(|(id, _)| *id != self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
