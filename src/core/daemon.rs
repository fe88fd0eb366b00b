//! # Daemon: ordered start, signal handling, bounded parallel stop, re-exec.
//!
//! The [`Daemon`] owns the component registry, the one-shot signal
//! subscriptions, and the three phase flags (`started` lives in the registry,
//! `reloading` and `shutting_down` here).
//!
//! ## Phases
//! ```text
//! Idle ──run()──► Starting ──(all started)──► Running
//!                                               │
//!                   SIGHUP (once) ──────────────┼──► Reloading ──► exec (never returns)
//!                   SIGINT / SIGTERM (once) ────┴──► ShuttingDown ──► halt, run() returns
//! ```
//!
//! ## Shutdown path
//! ```text
//! run_shutdown()
//!   ├─ shutting_down already set → ShutdownIgnored, return
//!   ├─ notifier.status("Shutting down")
//!   ├─ spawn stop() for every registered component (same tick)
//!   │     └─ each worker removes its own entry when its stop completes
//!   └─ timeout(stop_timeout, drain all)
//!         ├─ Ok      → AllStoppedWithin
//!         └─ Elapsed → ShutdownTimedOut (stragglers keep running, no longer awaited)
//! ```
//!
//! ## Example
//! ```rust,no_run
//! use daemonvisor::{ComponentError, ComponentFn, Daemon, DaemonConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let daemon = Daemon::builder(DaemonConfig::default().with_title("my-daemon")).build();
//!
//!     daemon
//!         .attach(ComponentFn::arc(
//!             "worker",
//!             || async { Ok::<_, ComponentError>(()) },
//!             || async { Ok::<_, ComponentError>(()) },
//!         ))
//!         .await?;
//!
//!     // Returns after SIGINT/SIGTERM; SIGHUP re-executes the binary.
//!     daemon.run().await?;
//!     Ok(())
//! }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::builder::DaemonBuilder;
use super::config::DaemonConfig;
use super::registry::Registry;
use super::signals::{DaemonSignal, Subscriptions};
use crate::components::{ComponentRef, Diagnostics};
use crate::error::DaemonError;
use crate::events::{Bus, Event, EventKind};
use crate::notify::Notify;
use crate::process::{self, Exec, RestartPlan};
use crate::subscribers::SubscriberSet;

/// Process-lifecycle orchestrator.
pub struct Daemon {
    cfg: DaemonConfig,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    /// Task forwarding bus events into `subs`; joined when `run()` ends.
    forwarder: Mutex<Option<JoinHandle<()>>>,
    registry: Arc<Registry>,
    subscriptions: Subscriptions,
    notifier: Arc<dyn Notify>,
    exec: Arc<dyn Exec>,
    /// Cancelled to stop the wait loop in `run()`.
    halt: CancellationToken,
    running: AtomicBool,
    reloading: AtomicBool,
    shutting_down: AtomicBool,
    fatal: Mutex<Option<DaemonError>>,
}

impl Daemon {
    /// Returns a builder for a daemon with the given configuration.
    pub fn builder(cfg: DaemonConfig) -> DaemonBuilder {
        DaemonBuilder::new(cfg)
    }

    pub(super) fn new_internal(
        cfg: DaemonConfig,
        bus: Bus,
        subs: Arc<SubscriberSet>,
        notifier: Arc<dyn Notify>,
        exec: Arc<dyn Exec>,
    ) -> Self {
        Self {
            cfg,
            bus,
            subs,
            forwarder: Mutex::new(None),
            registry: Registry::new(),
            subscriptions: Subscriptions::default(),
            notifier,
            exec,
            halt: CancellationToken::new(),
            running: AtomicBool::new(false),
            reloading: AtomicBool::new(false),
            shutting_down: AtomicBool::new(false),
            fatal: Mutex::new(None),
        }
    }

    /// Installs signal handlers, starts every attached component in order,
    /// then waits until a shutdown (or a failed reload) halts the loop.
    ///
    /// Returns the first component start failure, a signal installation
    /// failure, or the exec failure of a reload. May be called once.
    pub async fn run(self: &Arc<Self>) -> Result<(), DaemonError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(DaemonError::AlreadyRunning);
        }
        if let Err(err) = process::initial_cwd() {
            warn!(error = %err, "initial working directory unknown");
        }
        if let Some(title) = &self.cfg.title {
            process::set_title(title);
        }
        if let Err(err) = self.install_signal_handlers() {
            self.subscriptions.cancel_all();
            return Err(err);
        }
        self.notifier.ready();

        let me = Arc::clone(self);
        let starting = tokio::spawn(async move { me.start_components().await });
        let result = self.wait(starting).await;

        self.subscriptions.cancel_all();
        self.bus.publish_kind(EventKind::LoopStopped);
        self.flush_subscribers().await;
        match self.take_fatal() {
            Some(err) => Err(err),
            None => result,
        }
    }

    /// Adds a component.
    ///
    /// Components implementing [`AcceptDiagnostics`](crate::AcceptDiagnostics)
    /// receive their [`Diagnostics`] handle first. If the start sequence has
    /// already completed, the component is started before this returns.
    pub async fn attach(&self, component: ComponentRef) -> Result<(), DaemonError> {
        if let Some(slot) = component.diagnostics_slot() {
            slot.set_diagnostics(Diagnostics::on_bus(self.bus.clone(), component.name()));
        }
        let start_now = self.registry.attach(Arc::clone(&component));
        self.bus
            .publish_for(EventKind::ComponentAttached, component.name());

        if start_now && !self.shutting_down.load(Ordering::SeqCst) {
            self.start_one(&component).await?;
        }
        Ok(())
    }

    /// Fires the subscription for `signal` as if the OS had delivered it.
    ///
    /// Ignored (and logged) once that signal's one-shot subscription is gone,
    /// including before `run()` installed it.
    pub async fn deliver(&self, signal: DaemonSignal) {
        self.fire(signal).await;
    }

    /// Stops every component, then replaces the process image.
    ///
    /// A second call while a reload is in progress is logged and ignored.
    /// Returns only if the exec failed; `run()` then returns that error.
    pub async fn reload(&self) {
        if self.reloading.swap(true, Ordering::SeqCst) {
            self.bus.publish(
                Event::new(EventKind::ReloadIgnored)
                    .with_reason(DaemonError::DuplicateReload.to_string()),
            );
            return;
        }
        self.bus.publish_kind(EventKind::ReloadRequested);
        self.notifier.reloading("Reloading the main process");
        self.run_shutdown().await;

        self.bus.publish_kind(EventKind::Restarting);
        time::sleep(self.cfg.restart_delay).await;

        let err = match RestartPlan::current(&self.cfg.invocation_env)
            .and_then(|plan| process::restart_with(self.exec.as_ref(), &plan))
        {
            Ok(never) => match never {},
            Err(err) => err,
        };
        self.bus
            .publish(Event::new(EventKind::RestartFailed).with_reason(err.to_string()));
        self.set_fatal(err);
        self.halt.cancel();
    }

    /// Stops every component, then halts the wait loop so `run()` returns.
    pub async fn shutdown(&self) {
        self.run_shutdown().await;
        time::sleep(self.cfg.exit_delay).await;
        self.halt.cancel();
    }

    /// Receiver for every event published from now on.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Names of the registered components, in attachment order.
    pub fn components(&self) -> Vec<String> {
        self.registry.names()
    }

    /// True once the start sequence completed, until the stop fan-out concludes.
    pub fn is_started(&self) -> bool {
        self.registry.is_started()
    }

    /// True once a reload was accepted.
    pub fn is_reloading(&self) -> bool {
        self.reloading.load(Ordering::SeqCst)
    }

    /// True once a shutdown sequence began.
    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    /// Active configuration.
    pub fn config(&self) -> &DaemonConfig {
        &self.cfg
    }

    /// Number of registered components.
    pub fn component_count(&self) -> usize {
        self.registry.len()
    }

    /// Subscribes to the bus and forwards events to the subscriber set.
    ///
    /// Forwarding ends with `LoopStopped`; the set is then closed so queued
    /// lines reach their sinks before `run()` returns.
    pub(super) fn subscriber_listener(&self) {
        if self.subs.is_empty() {
            return;
        }
        let mut rx = self.bus.subscribe();
        let set = Arc::clone(&self.subs);
        let forwarder = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => {
                        set.emit(&ev);
                        if ev.kind == EventKind::LoopStopped {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            set.close().await;
        });
        *lock(&self.forwarder) = Some(forwarder);
    }

    /// Waits, at most `exit_delay`, for subscribers to handle their backlog.
    async fn flush_subscribers(&self) {
        let Some(forwarder) = lock(&self.forwarder).take() else {
            return;
        };
        if time::timeout(self.cfg.exit_delay, forwarder).await.is_err() {
            warn!("subscribers still busy when the loop stopped");
        }
    }

    /// Registers one OS listener per handled signal.
    ///
    /// A listener keeps receiving until `run()` ends; every delivery goes
    /// through [`fire`](Self::fire), which runs the body only the first time.
    fn install_signal_handlers(self: &Arc<Self>) -> Result<(), DaemonError> {
        for signal in DaemonSignal::ALL {
            let mut stream = signal.listen()?;
            self.subscriptions.arm(signal);

            let me = Arc::clone(self);
            let listener = tokio::spawn(async move {
                while stream.recv().await.is_some() {
                    let me = Arc::clone(&me);
                    tokio::spawn(async move { me.fire(signal).await });
                }
            });
            self.subscriptions.add_listener(listener.abort_handle());
        }
        Ok(())
    }

    /// Unsubscribes `signal`, then runs its handler body.
    async fn fire(&self, signal: DaemonSignal) {
        if !self.subscriptions.disarm(signal) {
            self.bus
                .publish(Event::new(EventKind::SignalIgnored).with_signal(signal));
            return;
        }
        self.bus
            .publish(Event::new(EventKind::SignalReceived).with_signal(signal));

        if signal.is_reload() {
            time::sleep(self.cfg.reload_delay).await;
            self.reload().await;
        } else {
            self.shutdown().await;
        }
    }

    /// Waits for the halt token; a failed start sequence ends the wait early.
    async fn wait(
        &self,
        mut starting: JoinHandle<Result<(), DaemonError>>,
    ) -> Result<(), DaemonError> {
        tokio::select! {
            _ = self.halt.cancelled() => return Ok(()),
            joined = &mut starting => match joined {
                Ok(Ok(())) => {}
                Ok(Err(err)) => return Err(err),
                Err(join) if join.is_panic() => std::panic::resume_unwind(join.into_panic()),
                Err(_) => {}
            },
        }
        self.halt.cancelled().await;
        Ok(())
    }

    /// Starts registered components in attachment order, one after another.
    async fn start_components(&self) -> Result<(), DaemonError> {
        let mut idx = 0;
        loop {
            if self.shutting_down.load(Ordering::SeqCst) {
                return Ok(());
            }
            let Some(component) = self.registry.next_to_start(idx) else {
                break;
            };
            self.start_one(&component).await?;
            idx += 1;
        }
        self.bus.publish_kind(EventKind::AllStarted);
        Ok(())
    }

    async fn start_one(&self, component: &ComponentRef) -> Result<(), DaemonError> {
        let name = component.name();
        self.bus.publish_for(EventKind::ComponentStarting, name);

        match component.start().await {
            Ok(()) => {
                self.bus.publish_for(EventKind::ComponentStarted, name);
                Ok(())
            }
            Err(source) => {
                self.bus.publish(
                    Event::new(EventKind::ComponentStartFailed)
                        .with_component(name)
                        .with_reason(source.to_string()),
                );
                Err(DaemonError::ComponentStart {
                    component: name.to_string(),
                    source,
                })
            }
        }
    }

    /// Shared by reload and shutdown; runs at most once per process.
    async fn run_shutdown(&self) {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            self.bus.publish(
                Event::new(EventKind::ShutdownIgnored)
                    .with_reason(DaemonError::DuplicateShutdown.to_string()),
            );
            return;
        }
        self.bus.publish_kind(EventKind::ShutdownRequested);
        self.notifier.status("Shutting down");
        self.stop_components().await;
    }

    /// Stops all components concurrently under the aggregate bound.
    async fn stop_components(&self) {
        let mut stopping: FuturesUnordered<_> = self
            .registry
            .stopping()
            .into_iter()
            .map(|(id, component)| {
                let name: Arc<str> = Arc::from(component.name());
                let registry = Arc::clone(&self.registry);
                let bus = self.bus.clone();
                let worker_name = Arc::clone(&name);

                bus.publish_for(EventKind::ComponentStopping, Arc::clone(&name));
                let worker = tokio::spawn(async move {
                    let outcome = component.stop().await;
                    registry.remove(id);
                    match outcome {
                        Ok(()) => bus.publish_for(EventKind::ComponentStopped, worker_name),
                        Err(err) => bus.publish(
                            Event::new(EventKind::ComponentStopFailed)
                                .with_component(worker_name)
                                .with_reason(err.to_string()),
                        ),
                    }
                });
                worker.map(move |joined| (id, name, joined))
            })
            .collect();

        let drain = async {
            while let Some((id, name, joined)) = stopping.next().await {
                if let Err(join) = joined {
                    self.registry.remove(id);
                    self.bus.publish(
                        Event::new(EventKind::ComponentStopFailed)
                            .with_component(name)
                            .with_reason(format!("stop panicked: {join}")),
                    );
                }
            }
        };

        let timeout = self.cfg.stop_timeout;
        match time::timeout(timeout, drain).await {
            Ok(()) => self.bus.publish_kind(EventKind::AllStoppedWithin),
            Err(_elapsed) => {
                let err = DaemonError::ShutdownTimeout {
                    timeout,
                    stuck: self.registry.names(),
                };
                self.bus.publish(
                    Event::new(EventKind::ShutdownTimedOut)
                        .with_timeout(timeout)
                        .with_reason(err.to_string()),
                );
            }
        }
        self.registry.mark_stopped();
    }

    fn set_fatal(&self, err: DaemonError) {
        lock(&self.fatal).get_or_insert(err);
    }

    fn take_fatal(&self) -> Option<DaemonError> {
        lock(&self.fatal).take()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::io;

    use super::*;
    use crate::components::ComponentFn;
    use crate::error::ComponentError;
    use crate::notify::NoopNotifier;

    struct NoExec;

    impl Exec for NoExec {
        fn exec(&self, _plan: &RestartPlan) -> io::Result<Infallible> {
            Err(io::Error::other("exec disabled"))
        }
    }

    fn daemon() -> Arc<Daemon> {
        Daemon::builder(DaemonConfig::default())
            .with_notifier(Arc::new(NoopNotifier))
            .with_exec(Arc::new(NoExec))
            .build()
    }

    fn ok_component(name: &'static str) -> ComponentRef {
        ComponentFn::arc(
            name,
            || async { Ok::<_, ComponentError>(()) },
            || async { Ok::<_, ComponentError>(()) },
        )
    }

    #[tokio::test]
    async fn test_attach_before_run_only_registers() {
        let d = daemon();
        d.attach(ok_component("a")).await.unwrap();
        assert_eq!(d.components(), vec!["a"]);
        assert!(!d.is_started());
    }

    #[tokio::test]
    async fn test_signal_before_run_is_ignored() {
        let d = daemon();
        let mut rx = d.events();
        d.deliver(DaemonSignal::Terminate).await;

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::SignalIgnored);
        assert_eq!(ev.signal, Some(DaemonSignal::Terminate));
        assert!(!d.is_shutting_down());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_without_components() {
        let d = daemon();
        let mut rx = d.events();
        d.shutdown().await;

        assert_eq!(rx.recv().await.unwrap().kind, EventKind::ShutdownRequested);
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::AllStoppedWithin);
        assert!(d.halt.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_run_is_rejected() {
        let d = daemon();
        let mut rx = d.events();
        let first = tokio::spawn({
            let d = Arc::clone(&d);
            async move { d.run().await }
        });
        while rx.recv().await.unwrap().kind != EventKind::AllStarted {}

        assert!(matches!(d.run().await, Err(DaemonError::AlreadyRunning)));

        d.shutdown().await;
        first.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_restart_is_returned_from_run() {
        let d = daemon();
        let mut rx = d.events();
        let running = tokio::spawn({
            let d = Arc::clone(&d);
            async move { d.run().await }
        });
        while rx.recv().await.unwrap().kind != EventKind::AllStarted {}

        d.reload().await;

        let err = running.await.unwrap().unwrap_err();
        assert!(matches!(err, DaemonError::Restart { .. }));
        assert!(d.is_reloading());
        assert!(d.is_shutting_down());
    }
}
