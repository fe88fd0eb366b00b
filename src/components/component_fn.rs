//! # Function-backed component (`ComponentFn`)
//!
//! [`ComponentFn`] wraps two closures, one producing the `start` future and
//! one producing the `stop` future. Each call creates a fresh future; shared
//! state between the two lives in an `Arc<...>` captured by both closures.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use daemonvisor::{ComponentError, ComponentFn, ComponentRef};
//!
//! let up = Arc::new(AtomicBool::new(false));
//! let (on, off) = (up.clone(), up.clone());
//!
//! let c: ComponentRef = ComponentFn::arc(
//!     "flag",
//!     move || {
//!         let on = on.clone();
//!         async move { on.store(true, Ordering::SeqCst); Ok::<_, ComponentError>(()) }
//!     },
//!     move || {
//!         let off = off.clone();
//!         async move { off.store(false, Ordering::SeqCst); Ok::<_, ComponentError>(()) }
//!     },
//! );
//!
//! assert_eq!(c.name(), "flag");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::components::Component;
use crate::error::ComponentError;

/// Function-backed component implementation.
#[derive(Debug)]
pub struct ComponentFn<S, T> {
    name: Cow<'static, str>,
    start: S,
    stop: T,
}

impl<S, T> ComponentFn<S, T> {
    /// Creates a new function-backed component.
    ///
    /// Prefer [`ComponentFn::arc`] when you immediately need a [`ComponentRef`](crate::ComponentRef).
    pub fn new(name: impl Into<Cow<'static, str>>, start: S, stop: T) -> Self {
        Self {
            name: name.into(),
            start,
            stop,
        }
    }

    /// Creates the component and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, start: S, stop: T) -> Arc<Self> {
        Arc::new(Self::new(name, start, stop))
    }
}

#[async_trait]
impl<S, SFut, T, TFut> Component for ComponentFn<S, T>
where
    S: Fn() -> SFut + Send + Sync + 'static,
    SFut: Future<Output = Result<(), ComponentError>> + Send + 'static,
    T: Fn() -> TFut + Send + Sync + 'static,
    TFut: Future<Output = Result<(), ComponentError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self) -> Result<(), ComponentError> {
        (self.start)().await
    }

    async fn stop(&self) -> Result<(), ComponentError> {
        (self.stop)().await
    }
}
