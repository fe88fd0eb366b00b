use std::sync::Arc;

use super::{config::DaemonConfig, daemon::Daemon};
use crate::{
    events::Bus,
    notify::{NoopNotifier, Notify},
    process::{Exec, Execve},
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a [`Daemon`] with optional collaborators.
pub struct DaemonBuilder {
    cfg: DaemonConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    notifier: Option<Arc<dyn Notify>>,
    exec: Option<Arc<dyn Exec>>,
}

impl DaemonBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: DaemonConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            notifier: None,
            exec: None,
        }
    }

    /// Sets event subscribers.
    ///
    /// Subscribers receive lifecycle events (starts, stops, signals, restarts)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Overrides the service-manager notifier.
    ///
    /// Defaults to `SystemdNotifier` when the `systemd` feature is enabled and
    /// `$NOTIFY_SOCKET` is set, otherwise [`NoopNotifier`].
    pub fn with_notifier(mut self, notifier: Arc<dyn Notify>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Overrides how a reload replaces the process image. Defaults to [`Execve`].
    pub fn with_exec(mut self, exec: Arc<dyn Exec>) -> Self {
        self.exec = Some(exec);
        self
    }

    /// Builds the daemon.
    ///
    /// Must be called from within a tokio runtime when subscribers are set.
    pub fn build(self) -> Arc<Daemon> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));

        let notifier: Arc<dyn Notify> = match self.notifier {
            Some(notifier) => notifier,
            None => default_notifier(),
        };
        let exec: Arc<dyn Exec> = match self.exec {
            Some(exec) => exec,
            None => Arc::new(Execve),
        };

        let daemon = Arc::new(Daemon::new_internal(self.cfg, bus, subs, notifier, exec));
        daemon.subscriber_listener();
        daemon
    }
}

#[cfg(feature = "systemd")]
fn default_notifier() -> Arc<dyn Notify> {
    match crate::notify::SystemdNotifier::from_env() {
        Some(systemd) => Arc::new(systemd),
        None => Arc::new(NoopNotifier),
    }
}

#[cfg(not(feature = "systemd"))]
fn default_notifier() -> Arc<dyn Notify> {
    Arc::new(NoopNotifier)
}
