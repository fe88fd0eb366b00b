//! # Diagnostic sinks for the daemonvisor runtime.
//!
//! This module provides the [`Subscribe`] trait and built-in implementations
//! for handling runtime events broadcast through the [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Daemon / stop workers / Diagnostics ── publish(Event) ──► Bus
//!                                                            │
//!                                      subscriber_listener ◄─┘
//!                                                │
//!                                          SubscriberSet::emit
//!                                         ┌──────┴──────┐
//!                                         ▼             ▼
//!                                     LogWriter      Custom ...
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscriber;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
