//! # Non-blocking event fan-out to multiple subscribers.
//!
//! [`SubscriberSet`] hands each event to every subscriber's own queue and
//! returns; a dedicated worker per subscriber drains that queue.
//!
//! ```text
//! emit(event)
//!     │
//!     ├──► [queue 1] ──► worker 1 ──► subscriber1.on_event()
//!     │    (bounded)         └──────► panic → SubscriberPanicked
//!     └──► [queue N] ──► worker N ──► subscriberN.on_event()
//!
//! close()  drops every queue sender, then joins the workers
//!          once they have handled what was already queued
//! ```
//!
//! ## Rules
//! - A full or closed queue drops the event for that subscriber only and
//!   publishes `SubscriberOverflow`.
//! - Per-subscriber FIFO, no ordering across subscribers.
//! - After `close()` further `emit` calls are no-ops.

use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::warn;

use crate::events::{Bus, Event};
use crate::subscribers::Subscribe;

type Queue = mpsc::Sender<Arc<Event>>;

#[derive(Default)]
struct Inner {
    queues: Vec<(&'static str, Queue)>,
    workers: Vec<JoinHandle<()>>,
}

/// Fan-out coordinator for diagnostic sinks.
pub struct SubscriberSet {
    inner: Mutex<Inner>,
    len: usize,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker task per subscriber.
    ///
    /// Must be called from within a tokio runtime unless `subs` is empty.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let len = subs.len();
        let mut inner = Inner::default();
        for sub in subs {
            let (tx, rx) = mpsc::channel(sub.queue_capacity().max(1));
            inner.queues.push((sub.name(), tx));
            inner.workers.push(spawn_worker(sub, rx, bus.clone()));
        }
        Self {
            inner: Mutex::new(inner),
            len,
            bus,
        }
    }

    /// Queues `event` for every subscriber without waiting for any of them.
    ///
    /// An overflow notice that itself overflows is only traced.
    pub fn emit(&self, event: &Event) {
        let event = Arc::new(event.clone());
        let mut dropped = Vec::new();
        for (name, queue) in &self.lock().queues {
            match queue.try_send(Arc::clone(&event)) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => dropped.push((*name, "full")),
                Err(mpsc::error::TrySendError::Closed(_)) => dropped.push((*name, "closed")),
            }
        }
        for (name, reason) in dropped {
            if event.is_subscriber_overflow() {
                warn!(subscriber = name, reason, "dropped overflow notice");
            } else {
                self.bus.publish(Event::subscriber_overflow(name, reason));
            }
        }
    }

    /// True if the set was built without subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Stops accepting events and waits until every worker has handled
    /// its backlog. Idempotent.
    pub async fn close(&self) {
        let workers = {
            let mut inner = self.lock();
            inner.queues.clear();
            std::mem::take(&mut inner.workers)
        };
        for worker in workers {
            let _ = worker.await;
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn spawn_worker(
    sub: Arc<dyn Subscribe>,
    mut rx: mpsc::Receiver<Arc<Event>>,
    bus: Bus,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(ev) = rx.recv().await {
            let handled = std::panic::AssertUnwindSafe(sub.on_event(&ev))
                .catch_unwind()
                .await;
            if let Err(payload) = handled {
                bus.publish(Event::subscriber_panicked(sub.name(), panic_message(&*payload)));
            }
        }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&'static str>()
        .map(|msg| (*msg).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
