//! # LogWriter: renders events through `tracing`
//!
//! A subscriber that turns every [`Event`] into one `tracing` record at the
//! event's [`severity`](Event::severity). Install any `tracing` subscriber in
//! the host program to see them.
//!
//! ## Example output (with `tracing_subscriber::fmt`)
//! ```text
//! INFO  daemonvisor: got signal, shutting down signal=SIGTERM
//! INFO  daemonvisor: shutting down
//! ERROR daemonvisor: shutdown timed out, stopping anyway timeout_ms=5000 reason=...
//! INFO  daemonvisor: event loop stopped
//! ```

use async_trait::async_trait;
use tracing::{Level, debug, error, info, warn};

use crate::core::DaemonSignal;
use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

const LOG_TARGET: &str = env!("CARGO_PKG_NAME");

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn describe(e: &Event) -> &'static str {
    match e.kind {
        EventKind::SubscriberPanicked => "subscriber panicked",
        EventKind::SubscriberOverflow => "subscriber dropped event",
        EventKind::ComponentAttached => "component attached",
        EventKind::ComponentStarting => "starting component",
        EventKind::ComponentStarted => "component started",
        EventKind::ComponentStartFailed => "component failed to start",
        EventKind::ComponentStopping => "stopping component",
        EventKind::ComponentStopped => "component stopped",
        EventKind::ComponentStopFailed => "component failed to stop",
        EventKind::ComponentLog => "component",
        EventKind::AllStarted => "all components started",
        EventKind::SignalReceived => match e.signal {
            Some(DaemonSignal::Hangup) => "got signal, reloading",
            _ => "got signal, shutting down",
        },
        EventKind::SignalIgnored => "signal ignored, handler already fired",
        EventKind::ReloadRequested => "stopping components, going down for reload now",
        EventKind::ReloadIgnored => "ignoring reload request, reload is already in progress",
        EventKind::ShutdownRequested => "shutting down",
        EventKind::ShutdownIgnored => "got shutdown request during shutdown, ignoring",
        EventKind::AllStoppedWithin => "all components stopped",
        EventKind::ShutdownTimedOut => "shutdown timed out, stopping anyway",
        EventKind::Restarting => "everything stopped, restarting",
        EventKind::RestartFailed => "restart failed",
        EventKind::LoopStopped => "event loop stopped",
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let msg = describe(e);
        let component = e.component.as_deref().unwrap_or("-");
        let signal = e.signal.map(DaemonSignal::as_str).unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");

        match e.severity() {
            Level::ERROR => error!(
                target: LOG_TARGET,
                seq = e.seq,
                component,
                signal,
                timeout_ms = e.timeout_ms,
                reason,
                "{msg}"
            ),
            Level::WARN => warn!(
                target: LOG_TARGET,
                seq = e.seq,
                component,
                signal,
                reason,
                "{msg}"
            ),
            Level::INFO => info!(
                target: LOG_TARGET,
                seq = e.seq,
                component,
                signal,
                reason,
                "{msg}"
            ),
            _ => debug!(target: LOG_TARGET, seq = e.seq, component, reason, "{msg}"),
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_wording_follows_action() {
        let hup = Event::new(EventKind::SignalReceived).with_signal(DaemonSignal::Hangup);
        let term = Event::new(EventKind::SignalReceived).with_signal(DaemonSignal::Terminate);
        assert_eq!(describe(&hup), "got signal, reloading");
        assert_eq!(describe(&term), "got signal, shutting down");
    }

    #[tokio::test]
    async fn test_on_event_without_tracing_subscriber() {
        let writer = LogWriter::new();
        writer
            .on_event(&Event::new(EventKind::ShutdownTimedOut).with_reason("db"))
            .await;
    }
}
