//! # daemonvisor
//!
//! **Daemonvisor** is a process-lifecycle orchestrator for long-running Unix
//! services.
//!
//! It starts a set of components in order, reacts to `SIGHUP` by stopping
//! everything and re-executing its own binary, and to `SIGINT` / `SIGTERM` by
//! stopping everything and returning from [`Daemon::run`]. Stops run in
//! parallel under one aggregate time bound.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  Component   │   │  Component   │   │  Component   │
//!     │   (db pool)  │   │ (http server)│   │  (scheduler) │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼ attach           ▼ attach           ▼ attach
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Daemon (lifecycle orchestrator)                                  │
//! │  - Registry (ordered components, start order = attach order)      │
//! │  - Subscriptions (one-shot SIGHUP / SIGINT / SIGTERM)             │
//! │  - Notify (READY / RELOADING / STATUS towards the supervisor)     │
//! │  - Exec (replaces the process image on reload)                    │
//! └──────┬───────────────────────────────────────────────────┬────────┘
//!        │ Publishes Events:                                 │
//!        │ - ComponentStarting / ComponentStarted            │
//!        │ - SignalReceived / ShutdownRequested              │
//!        │ - ComponentStopped / ShutdownTimedOut / ...       │
//!        ▼                                                   ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │               (capacity: DaemonConfig::bus_capacity)              │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │  subscriber_listener   │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                             SubscriberSet
//!                            (per-sub queues)
//!                          ┌────────┼────────┐
//!                          ▼        ▼        ▼
//!                      LogWriter  sub2     subN
//! ```
//!
//! ### Lifecycle
//! ```text
//! run()
//!   ├─► capture initial cwd, set process title
//!   ├─► arm SIGHUP / SIGINT / SIGTERM (each fires at most once)
//!   ├─► notify READY
//!   ├─► start components one at a time, in attach order
//!   │       └─ first failure ─► run() returns ComponentStart
//!   └─► wait for halt
//!
//! SIGHUP ─► 50ms ─► reload():  stop all (≤5s) ─► 50ms ─► execve(self)
//! SIGTERM / SIGINT ─► shutdown(): stop all (≤5s) ─► 100ms ─► run() returns
//! ```
//!
//! ## Features
//! | Area              | Description                                                 | Key types / traits                       |
//! |-------------------|-------------------------------------------------------------|------------------------------------------|
//! | **Components**    | Units the daemon starts and stops.                          | [`Component`], [`ComponentFn`]           |
//! | **Orchestration** | Ordered start, signal handling, bounded stop, re-exec.     | [`Daemon`], [`DaemonBuilder`]            |
//! | **Subscriber API**| Hook into lifecycle events (logging, alerting).             | [`Subscribe`], [`Diagnostics`]           |
//! | **Process**       | Titles, env, initial cwd, binary path, restart.             | [`process`]                              |
//! | **Errors**        | Typed errors for the runtime and for components.            | [`DaemonError`], [`ComponentError`]      |
//! | **Configuration** | Delays, stop bound, title, invocation variable.             | [`DaemonConfig`]                         |
//!
//! ## Optional features
//! - `logging` (default): exports [`LogWriter`], which renders events through `tracing`.
//! - `systemd` (default): exports `SystemdNotifier`, picked by the builder when
//!   `$NOTIFY_SOCKET` is set.
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use daemonvisor::{ComponentError, ComponentFn, Daemon, DaemonConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn daemonvisor::Subscribe>> = vec![Arc::new(daemonvisor::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn daemonvisor::Subscribe>> = Vec::new();
//!
//!     let daemon = Daemon::builder(DaemonConfig::default().with_title("my-daemon"))
//!         .with_subscribers(subs)
//!         .build();
//!
//!     daemon
//!         .attach(ComponentFn::arc(
//!             "hello",
//!             || async {
//!                 println!("hello");
//!                 Ok::<_, ComponentError>(())
//!             },
//!             || async {
//!                 println!("bye");
//!                 Ok::<_, ComponentError>(())
//!             },
//!         ))
//!         .await?;
//!
//!     daemon.run().await?;
//!     Ok(())
//! }
//! ```
mod components;
mod core;
mod error;
mod events;
mod notify;
pub mod process;
mod subscribers;

// ---- Public re-exports ----

pub use components::{AcceptDiagnostics, Component, ComponentFn, ComponentRef, Diagnostics};
pub use core::{DEFAULT_INVOCATION_ENV, Daemon, DaemonBuilder, DaemonConfig, DaemonSignal};
pub use error::{ComponentError, DaemonError};
pub use events::{Bus, Event, EventKind};
pub use notify::{NOTIFY_SOCKET_ENV, NoopNotifier, Notify};
#[cfg(feature = "systemd")]
pub use notify::SystemdNotifier;
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose the built-in tracing subscriber.
// Enable with: `--features logging` (on by default)
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
