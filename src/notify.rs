//! # Readiness notification for a supervising service manager.
//!
//! The daemon reports three things to its supervisor: it is ready, it is
//! reloading, and a free-form status line. [`Notify`] abstracts the channel;
//! [`NoopNotifier`] is used when there is none. With the `systemd` feature,
//! [`SystemdNotifier`] sends the states through the `sd-notify` crate.
//!
//! Notifications are fire-and-forget: failures are logged at debug level and
//! never reach the caller.

/// Environment variable systemd uses to pass the notification socket.
pub const NOTIFY_SOCKET_ENV: &str = "NOTIFY_SOCKET";

/// Lifecycle notifications towards a supervisor.
pub trait Notify: Send + Sync + 'static {
    /// Startup finished.
    fn ready(&self);

    /// The process is about to reload.
    fn reloading(&self, message: &str);

    /// Free-form status line.
    fn status(&self, message: &str);
}

/// Discards every notification.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNotifier;

impl Notify for NoopNotifier {
    fn ready(&self) {}

    fn reloading(&self, _message: &str) {}

    fn status(&self, _message: &str) {}
}

#[cfg(feature = "systemd")]
pub use systemd::SystemdNotifier;

#[cfg(feature = "systemd")]
mod systemd {
    use sd_notify::NotifyState;
    use tracing::debug;

    use super::{NOTIFY_SOCKET_ENV, Notify};

    /// `sd_notify` client. The socket address is read from `$NOTIFY_SOCKET`
    /// on every send, path or `@abstract` name alike.
    #[derive(Clone, Copy, Debug)]
    pub struct SystemdNotifier {
        _private: (),
    }

    impl SystemdNotifier {
        /// `Some` when the daemon runs under systemd, i.e. `$NOTIFY_SOCKET`
        /// is set and non-empty.
        pub fn from_env() -> Option<Self> {
            crate::process::get_env(NOTIFY_SOCKET_ENV)
                .filter(|addr| !addr.is_empty())
                .map(|_| Self { _private: () })
        }

        fn send(&self, states: &[NotifyState<'_>]) {
            if let Err(err) = sd_notify::notify(false, states) {
                debug!(error = %err, "failed to notify service manager");
            }
        }
    }

    impl Notify for SystemdNotifier {
        fn ready(&self) {
            self.send(&[NotifyState::Ready]);
        }

        fn reloading(&self, message: &str) {
            match monotonic_usec() {
                Some(usec) => {
                    let stamp = format!("MONOTONIC_USEC={usec}");
                    self.send(&[
                        NotifyState::Reloading,
                        NotifyState::Status(message),
                        NotifyState::Custom(&stamp),
                    ]);
                }
                None => self.send(&[NotifyState::Reloading, NotifyState::Status(message)]),
            }
        }

        fn status(&self, message: &str) {
            self.send(&[NotifyState::Status(message)]);
        }
    }

    /// Current `CLOCK_MONOTONIC` in microseconds, as `RELOADING=1` expects.
    fn monotonic_usec() -> Option<u64> {
        use nix::time::{ClockId, clock_gettime};

        let now = clock_gettime(ClockId::CLOCK_MONOTONIC).ok()?;
        let secs = u64::try_from(now.tv_sec()).ok()?;
        let nanos = u64::try_from(now.tv_nsec()).ok()?;
        Some(secs * 1_000_000 + nanos / 1_000)
    }

}
