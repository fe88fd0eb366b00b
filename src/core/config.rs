//! # Global runtime configuration.
//!
//! Provides [`DaemonConfig`] centralized settings for the daemon runtime.
//!
//! The defaults reproduce the classic behaviour:
//! - 5 s aggregate bound on stopping all components;
//! - 50 ms between `SIGHUP` and the reload, and between the end of the
//!   reload's shutdown and the exec;
//! - 100 ms between the end of a shutdown and halting the wait loop.
//!
//! The short delays let in-flight log output and notifications flush before
//! the process image changes or the loop halts.

use std::borrow::Cow;
use std::time::Duration;

/// Environment variable set by most shells to the path used to invoke the command.
pub const DEFAULT_INVOCATION_ENV: &str = "_";

/// Global configuration for the daemon runtime.
///
/// ## Field semantics
/// - `stop_timeout`: bound on the *whole* stop fan-out (not per component)
/// - `reload_delay`: `SIGHUP` handler delay before `reload()` runs
/// - `restart_delay`: delay between shutdown completion and the exec
/// - `exit_delay`: delay between shutdown completion and halting `run()`
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
/// - `title`: process title applied by `run()` (`None` leaves it untouched)
/// - `invocation_env`: environment variable holding the invocation path hint
#[derive(Clone, Debug)]
pub struct DaemonConfig {
    /// Maximum time to wait for all components to stop.
    ///
    /// When exceeded the daemon logs an error and proceeds as if shutdown had
    /// completed. Components still stopping are no longer awaited.
    pub stop_timeout: Duration,

    /// Delay between receiving `SIGHUP` and starting the reload.
    pub reload_delay: Duration,

    /// Delay between the end of the reload's shutdown and re-executing.
    pub restart_delay: Duration,

    /// Delay between the end of a shutdown and halting the wait loop.
    pub exit_delay: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,

    /// Process title to set when the daemon starts running.
    pub title: Option<String>,

    /// Name of the environment variable carrying the invocation path.
    pub invocation_env: Cow<'static, str>,
}

impl DaemonConfig {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Sets the process title applied by `run()`.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            stop_timeout: Duration::from_secs(5),
            reload_delay: Duration::from_millis(50),
            restart_delay: Duration::from_millis(50),
            exit_delay: Duration::from_millis(100),
            bus_capacity: 1024,
            title: None,
            invocation_env: Cow::Borrowed(DEFAULT_INVOCATION_ENV),
        }
    }
}
