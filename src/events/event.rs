//! # Runtime events emitted by the daemon and its components.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Component events**: attach, start, stop, and component-issued log lines
//! - **Signal events**: OS signals observed (or ignored after their one-shot fired)
//! - **Phase events**: reload / shutdown requests, fan-out outcome, restart, halt
//! - **Subscriber events**: overflow and panics inside diagnostic sinks
//!
//! The [`Event`] struct carries additional metadata such as timestamps,
//! component name, reason, and the bound that was exceeded.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use daemonvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::ComponentStopFailed)
//!     .with_component("db")
//!     .with_reason("connection reset")
//!     .with_timeout(Duration::from_secs(5));
//!
//! assert_eq!(ev.kind, EventKind::ComponentStopFailed);
//! assert_eq!(ev.component.as_deref(), Some("db"));
//! assert_eq!(ev.timeout_ms, Some(5_000));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use tracing::Level;

use crate::core::DaemonSignal;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets `component` (subscriber name) and `reason` (panic message).
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets `component` (subscriber name) and `reason`.
    SubscriberOverflow,

    // === Component events ===
    /// A component was added to the registry.
    ComponentAttached,

    /// A component's `start` is about to run.
    ComponentStarting,

    /// A component's `start` completed.
    ComponentStarted,

    /// A component's `start` failed. Sets `reason`.
    ComponentStartFailed,

    /// A component's `stop` was launched.
    ComponentStopping,

    /// A component's `stop` completed and it left the registry.
    ComponentStopped,

    /// A component's `stop` failed (it still leaves the registry). Sets `reason`.
    ComponentStopFailed,

    /// A line logged by a component through its [`Diagnostics`](crate::Diagnostics).
    ///
    /// Sets `component`, `reason` (the message) and `level`.
    ComponentLog,

    /// Every component attached so far has started; the daemon is running.
    AllStarted,

    // === Signal events ===
    /// An OS signal was received (or delivered programmatically). Sets `signal`.
    SignalReceived,

    /// A signal arrived after its one-shot subscription had already fired. Sets `signal`.
    SignalIgnored,

    // === Phase events ===
    /// Reload accepted; components are being stopped before the exec.
    ReloadRequested,

    /// Reload rejected because one is already in progress.
    ReloadIgnored,

    /// Shutdown sequence started.
    ShutdownRequested,

    /// Shutdown rejected because one is already in progress.
    ShutdownIgnored,

    /// Every component stopped within the bound.
    AllStoppedWithin,

    /// The stop fan-out exceeded its bound. Sets `timeout_ms` and `reason`.
    ShutdownTimedOut,

    /// Components are stopped; the process image is about to be replaced.
    Restarting,

    /// Replacing the process image failed. Sets `reason`.
    RestartFailed,

    /// The wait loop was halted; `run()` returns.
    LoopStopped,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Name of the component (or subscriber), if applicable.
    pub component: Option<Arc<str>>,
    /// Human-readable reason (errors, log message, overflow details).
    pub reason: Option<Arc<str>>,
    /// Bound in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Signal that caused the event.
    pub signal: Option<DaemonSignal>,
    /// Severity chosen by a component for [`EventKind::ComponentLog`].
    pub level: Option<Level>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            component: None,
            reason: None,
            timeout_ms: None,
            signal: None,
            level: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a component name.
    #[inline]
    pub fn with_component(mut self, component: impl Into<Arc<str>>) -> Self {
        self.component = Some(component.into());
        self
    }

    /// Attaches a bound (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }

    /// Attaches the signal that caused this event.
    #[inline]
    pub fn with_signal(mut self, signal: DaemonSignal) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Attaches a log level.
    #[inline]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = Some(level);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_component(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_component(subscriber)
            .with_reason(info)
    }

    /// Severity an operator should see this event at.
    pub fn severity(&self) -> Level {
        match self.kind {
            EventKind::ComponentLog => self.level.unwrap_or(Level::INFO),
            EventKind::SubscriberPanicked
            | EventKind::ComponentStartFailed
            | EventKind::ComponentStopFailed
            | EventKind::ReloadIgnored
            | EventKind::ShutdownIgnored
            | EventKind::ShutdownTimedOut
            | EventKind::RestartFailed => Level::ERROR,
            EventKind::SubscriberOverflow | EventKind::SignalIgnored => Level::WARN,
            EventKind::SignalReceived
            | EventKind::ReloadRequested
            | EventKind::ShutdownRequested
            | EventKind::AllStarted
            | EventKind::AllStoppedWithin
            | EventKind::Restarting
            | EventKind::LoopStopped => Level::INFO,
            EventKind::ComponentAttached
            | EventKind::ComponentStarting
            | EventKind::ComponentStarted
            | EventKind::ComponentStopping
            | EventKind::ComponentStopped => Level::DEBUG,
        }
    }

    /// True for overflow notices, which are never re-published when they overflow.
    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_monotonic() {
        let a = Event::new(EventKind::ComponentAttached);
        let b = Event::new(EventKind::ComponentAttached);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_timeout_saturates() {
        let ev = Event::new(EventKind::ShutdownTimedOut).with_timeout(Duration::MAX);
        assert_eq!(ev.timeout_ms, Some(u32::MAX));
    }

    #[test]
    fn test_severity() {
        assert_eq!(Event::new(EventKind::ShutdownTimedOut).severity(), Level::ERROR);
        assert_eq!(Event::new(EventKind::ReloadIgnored).severity(), Level::ERROR);
        assert_eq!(Event::new(EventKind::SignalReceived).severity(), Level::INFO);
        assert_eq!(
            Event::new(EventKind::ComponentLog)
                .with_level(Level::WARN)
                .severity(),
            Level::WARN
        );
    }
}
