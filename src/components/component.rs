//! # Component abstraction.
//!
//! A [`Component`] is a unit of daemon functionality with an async
//! [`start`](Component::start) and [`stop`](Component::stop). The daemon never
//! looks inside a component: it starts them in attachment order and stops
//! them all concurrently.
//!
//! Components that want to log through the daemon's diagnostic sinks also
//! implement [`AcceptDiagnostics`] and return themselves from
//! [`Component::diagnostics_slot`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::components::Diagnostics;
use crate::error::ComponentError;

/// Shared handle to a component.
pub type ComponentRef = Arc<dyn Component>;

/// # Startable, stoppable unit of daemon functionality.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use daemonvisor::{Component, ComponentError};
///
/// struct Listener;
///
/// #[async_trait]
/// impl Component for Listener {
///     fn name(&self) -> &str { "listener" }
///
///     async fn start(&self) -> Result<(), ComponentError> {
///         // bind sockets, spawn accept loop...
///         Ok(())
///     }
///
///     async fn stop(&self) -> Result<(), ComponentError> {
///         // close sockets, join accept loop...
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Component: Send + Sync + 'static {
    /// Returns a stable, human-readable component name used in diagnostics.
    fn name(&self) -> &str;

    /// Leaves the component ready to do its work.
    ///
    /// An error aborts the daemon's start sequence.
    async fn start(&self) -> Result<(), ComponentError>;

    /// Releases every resource held by the component.
    ///
    /// An error is logged; other components keep stopping.
    async fn stop(&self) -> Result<(), ComponentError>;

    /// Returns the diagnostics capability, if the component has one.
    fn diagnostics_slot(&self) -> Option<&dyn AcceptDiagnostics> {
        None
    }
}

/// Optional capability: the component accepts a diagnostics handle.
///
/// The daemon calls [`set_diagnostics`](AcceptDiagnostics::set_diagnostics)
/// once, before the component is added to the registry.
pub trait AcceptDiagnostics: Send + Sync {
    /// Stores the handle for later use.
    fn set_diagnostics(&self, diagnostics: Diagnostics);
}
