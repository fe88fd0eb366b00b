//! # Component abstractions.
//!
//! This module provides the component-related types:
//! - [`Component`] - trait for units the daemon starts and stops
//! - [`ComponentFn`] - closure-backed component implementation
//! - [`ComponentRef`] - shared reference to a component (`Arc<dyn Component>`)
//! - [`AcceptDiagnostics`], [`Diagnostics`] - optional logging capability

mod component;
mod component_fn;
mod diagnostics;

pub use component::{AcceptDiagnostics, Component, ComponentRef};
pub use component_fn::ComponentFn;
pub use diagnostics::Diagnostics;
