//! # Diagnostics handle injected into components.
//!
//! [`Diagnostics`] lets a component log through the daemon's sinks. Each line
//! becomes an [`EventKind::ComponentLog`] event tagged with the component name.
//! A [`Diagnostics::noop`] handle discards everything; components can log
//! unconditionally without checking whether anyone listens.

use std::sync::Arc;

use tracing::Level;

use crate::events::{Bus, Event, EventKind};

/// Cloneable logging handle for one component.
#[derive(Clone, Debug)]
pub struct Diagnostics {
    bus: Option<Bus>,
    component: Arc<str>,
}

impl Diagnostics {
    /// A handle that discards every line.
    pub fn noop() -> Self {
        Self {
            bus: None,
            component: Arc::from(""),
        }
    }

    pub(crate) fn on_bus(bus: Bus, component: &str) -> Self {
        Self {
            bus: Some(bus),
            component: Arc::from(component),
        }
    }

    /// True if lines are discarded.
    pub fn is_noop(&self) -> bool {
        self.bus.is_none()
    }

    /// Logs at info level.
    pub fn info(&self, message: impl Into<Arc<str>>) {
        self.log(Level::INFO, message);
    }

    /// Logs at warn level.
    pub fn warn(&self, message: impl Into<Arc<str>>) {
        self.log(Level::WARN, message);
    }

    /// Logs at error level.
    pub fn error(&self, message: impl Into<Arc<str>>) {
        self.log(Level::ERROR, message);
    }

    /// Logs at the given level.
    pub fn log(&self, level: Level, message: impl Into<Arc<str>>) {
        if let Some(bus) = &self.bus {
            bus.publish(
                Event::new(EventKind::ComponentLog)
                    .with_component(Arc::clone(&self.component))
                    .with_reason(message)
                    .with_level(level),
            );
        }
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::noop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lines_are_tagged_with_component() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let diag = Diagnostics::on_bus(bus, "cache");

        diag.warn("evicting everything");

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::ComponentLog);
        assert_eq!(ev.component.as_deref(), Some("cache"));
        assert_eq!(ev.reason.as_deref(), Some("evicting everything"));
        assert_eq!(ev.level, Some(Level::WARN));
    }

    #[test]
    fn test_noop_discards() {
        let diag = Diagnostics::default();
        assert!(diag.is_noop());
        diag.error("nobody hears this");
    }
}
