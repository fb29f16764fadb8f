// src/core/signal.rs

//! The "environment changed" broadcast.
//!
//! Delivery is synchronous and fire-and-forget: [`EnvironmentSignal::fire`]
//! calls every listener subscribed at that moment, in subscription order.
//! Nothing is buffered, so a listener never sees emissions from before it
//! subscribed. Dropping the [`Subscription`] detaches the listener.

use crate::models::EnvironmentMapping;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// The payload of one emission: the new environment, or `None` when sourcing failed.
pub type EnvironmentSnapshot = Option<Arc<EnvironmentMapping>>;

type Listener = Arc<dyn Fn(&EnvironmentSnapshot) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: AtomicU64,
    entries: Mutex<Vec<(u64, Listener)>>,
}

#[derive(Clone, Default)]
pub struct EnvironmentSignal {
    listeners: Arc<Listeners>,
}

impl std::fmt::Debug for EnvironmentSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentSignal")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl EnvironmentSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` for every future emission.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&EnvironmentSnapshot) + Send + Sync + 'static,
    {
        let id = self.listeners.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        log::trace!("Environment listener {} subscribed.", id);
        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Delivers `snapshot` to the current listeners.
    pub fn fire(&self, snapshot: &EnvironmentSnapshot) {
        // Snapshot the list so listeners may subscribe or unsubscribe while being called.
        let listeners: Vec<Listener> = self
            .listeners
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        log::debug!(
            "Environment changed ({}); notifying {} listener(s).",
            if snapshot.is_some() { "sourced" } else { "unset" },
            listeners.len()
        );
        for listener in listeners {
            listener(snapshot);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Keeps a listener registered for as long as it lives.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    listeners: Weak<Listeners>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners
                .entries
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|(id, _)| *id != self.id);
            log::trace!("Environment listener {} unsubscribed.", self.id);
        }
    }
}
