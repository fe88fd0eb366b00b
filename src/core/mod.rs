//! Runtime core: orchestration and lifecycle.
//!
//! The only public entry points are [`Daemon`], its [`DaemonBuilder`] and
//! [`DaemonConfig`], plus the [`DaemonSignal`] enum.
//!
//! Internal modules:
//! - [`daemon`]: ordered start, signal dispatch, bounded stop fan-out, re-exec;
//! - [`registry`]: ordered component list with per-entry identity;
//! - [`signals`]: one-shot OS signal subscriptions;
//! - [`builder`]: wires the bus, subscribers, notifier and exec strategy.

mod builder;
mod config;
mod daemon;
mod registry;
mod signals;

pub use builder::DaemonBuilder;
pub use config::{DEFAULT_INVOCATION_ENV, DaemonConfig};
pub use daemon::Daemon;
pub use signals::DaemonSignal;
