//! # Event bus for lifecycle events.
//!
//! [`Bus`] wraps a [`tokio::sync::broadcast`] sender. The daemon, its stop
//! workers, and component [`Diagnostics`](crate::Diagnostics) handles publish;
//! the subscriber forwarder and any [`Daemon::events`](crate::Daemon::events)
//! receiver consume.
//!
//! ```text
//!   Daemon       ──┐
//!   stop workers ──┼──► Bus ──┬──► forwarder ──► SubscriberSet
//!   Diagnostics  ──┘          └──► Daemon::events() receivers
//! ```
//!
//! Publishing never blocks. With no receivers an event is simply dropped; a
//! receiver that falls more than `capacity` events behind sees `Lagged`.

use std::sync::Arc;

use tokio::sync::broadcast;

use super::event::{Event, EventKind};

/// Broadcast channel for lifecycle events. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus retaining at most `capacity` undelivered events (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publishes `ev` to every current receiver.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Publishes a bare event of `kind`.
    pub fn publish_kind(&self, kind: EventKind) {
        self.publish(Event::new(kind));
    }

    /// Publishes an event of `kind` tagged with a component name.
    pub fn publish_for(&self, kind: EventKind, component: impl Into<Arc<str>>) {
        self.publish(Event::new(kind).with_component(component));
    }

    /// Receiver for events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Number of live receivers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
