//! # One-shot OS signal subscriptions.
//!
//! Each handled signal is armed once in a table keyed by [`DaemonSignal`].
//! Firing a signal removes its own entry first and only then runs the handler
//! body, so each kind is handled at most once per process instance.
//! Subscriptions are never re-armed; later deliveries of the same kind are
//! reported as ignored.
//!
//! ## Signals
//! - `SIGHUP`  → reload (stop everything, re-exec)
//! - `SIGINT`  → shutdown
//! - `SIGTERM` → shutdown

use std::collections::HashSet;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use tokio::signal::unix::{Signal, SignalKind, signal};
use tokio::task::AbortHandle;

use crate::error::DaemonError;

/// Signals the daemon reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DaemonSignal {
    /// `SIGHUP`: reload by re-executing the binary.
    Hangup,
    /// `SIGINT`: shut down.
    Interrupt,
    /// `SIGTERM`: shut down.
    Terminate,
}

impl DaemonSignal {
    /// Every handled signal, in registration order.
    pub const ALL: [DaemonSignal; 3] = [
        DaemonSignal::Hangup,
        DaemonSignal::Interrupt,
        DaemonSignal::Terminate,
    ];

    /// Conventional signal name.
    pub fn as_str(self) -> &'static str {
        match self {
            DaemonSignal::Hangup => "SIGHUP",
            DaemonSignal::Interrupt => "SIGINT",
            DaemonSignal::Terminate => "SIGTERM",
        }
    }

    /// True if this signal asks for a reload rather than a shutdown.
    pub fn is_reload(self) -> bool {
        matches!(self, DaemonSignal::Hangup)
    }

    fn kind(self) -> SignalKind {
        match self {
            DaemonSignal::Hangup => SignalKind::hangup(),
            DaemonSignal::Interrupt => SignalKind::interrupt(),
            DaemonSignal::Terminate => SignalKind::terminate(),
        }
    }

    /// Registers an OS listener for this signal.
    pub(crate) fn listen(self) -> Result<Signal, DaemonError> {
        signal(self.kind()).map_err(|source| DaemonError::SignalInstall {
            signal: self.as_str(),
            source,
        })
    }
}

impl fmt::Display for DaemonSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One-shot subscriptions plus the OS listener tasks feeding them.
///
/// A listener outlives its subscription: it keeps draining its signal stream
/// until `run()` ends, so a repeated OS signal is reported as ignored instead
/// of vanishing inside the runtime's handler.
#[derive(Debug, Default)]
pub(crate) struct Subscriptions {
    armed: Mutex<HashSet<DaemonSignal>>,
    listeners: Mutex<Vec<AbortHandle>>,
}

impl Subscriptions {
    /// Arms `signal`; its next firing runs the handler body.
    pub(crate) fn arm(&self, signal: DaemonSignal) {
        lock(&self.armed).insert(signal);
    }

    /// Keeps the OS listener task so `cancel_all` can stop it.
    pub(crate) fn add_listener(&self, listener: AbortHandle) {
        lock(&self.listeners).push(listener);
    }

    /// Unsubscribes `signal`. False if it already fired (or was never armed).
    pub(crate) fn disarm(&self, signal: DaemonSignal) -> bool {
        lock(&self.armed).remove(&signal)
    }

    #[cfg(test)]
    pub(crate) fn is_armed(&self, signal: DaemonSignal) -> bool {
        lock(&self.armed).contains(&signal)
    }

    /// Disarms every signal and stops every listener.
    pub(crate) fn cancel_all(&self) {
        lock(&self.armed).clear();
        let listeners = std::mem::take(&mut *lock(&self.listeners));
        for listener in listeners {
            listener.abort();
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
