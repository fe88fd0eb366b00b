//! End-to-end lifecycle scenarios on a paused clock.

use std::convert::Infallible;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use daemonvisor::process::{Exec, RestartPlan};
use daemonvisor::{
    AcceptDiagnostics, Component, ComponentError, ComponentRef, Daemon, DaemonConfig,
    DaemonError, DaemonSignal, Diagnostics, Event, EventKind, Notify, Subscribe,
};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

type Journal = Arc<Mutex<Vec<(String, &'static str, Instant)>>>;

struct Scripted {
    name: &'static str,
    journal: Journal,
    start_for: Duration,
    stop_for: Duration,
    fail_start: bool,
}

impl Scripted {
    fn new(name: &'static str, journal: &Journal) -> Self {
        Self {
            name,
            journal: Arc::clone(journal),
            start_for: Duration::ZERO,
            stop_for: Duration::ZERO,
            fail_start: false,
        }
    }

    fn start_for(mut self, d: Duration) -> Self {
        self.start_for = d;
        self
    }

    fn stop_for(mut self, d: Duration) -> Self {
        self.stop_for = d;
        self
    }

    fn failing(mut self) -> Self {
        self.fail_start = true;
        self
    }

    fn arc(self) -> ComponentRef {
        Arc::new(self)
    }

    fn note(&self, what: &'static str) {
        self.journal
            .lock()
            .unwrap()
            .push((self.name.to_string(), what, Instant::now()));
    }
}

#[async_trait]
impl Component for Scripted {
    fn name(&self) -> &str {
        self.name
    }

    async fn start(&self) -> Result<(), ComponentError> {
        self.note("start");
        time::sleep(self.start_for).await;
        if self.fail_start {
            return Err(ComponentError::fail("port already in use"));
        }
        Ok(())
    }

    async fn stop(&self) -> Result<(), ComponentError> {
        self.note("stop");
        time::sleep(self.stop_for).await;
        Ok(())
    }
}

#[derive(Default)]
struct RecordingExec {
    calls: Mutex<Vec<(RestartPlan, Instant)>>,
}

impl Exec for RecordingExec {
    fn exec(&self, plan: &RestartPlan) -> io::Result<Infallible> {
        self.calls.lock().unwrap().push((plan.clone(), Instant::now()));
        Err(io::Error::other("exec refused in tests"))
    }
}

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
}

impl Notify for RecordingNotifier {
    fn ready(&self) {
        self.sent.lock().unwrap().push("READY".into());
    }

    fn reloading(&self, message: &str) {
        self.sent.lock().unwrap().push(format!("RELOADING {message}"));
    }

    fn status(&self, message: &str) {
        self.sent.lock().unwrap().push(format!("STATUS {message}"));
    }
}

struct Harness {
    daemon: Arc<Daemon>,
    exec: Arc<RecordingExec>,
    notifier: Arc<RecordingNotifier>,
    journal: Journal,
    events: broadcast::Receiver<Event>,
}

fn harness() -> Harness {
    let exec = Arc::new(RecordingExec::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let daemon = Daemon::builder(DaemonConfig::default())
        .with_exec(exec.clone())
        .with_notifier(notifier.clone())
        .build();
    let events = daemon.events();
    Harness {
        daemon,
        exec,
        notifier,
        journal: Journal::default(),
        events,
    }
}

fn spawn_run(daemon: &Arc<Daemon>) -> JoinHandle<(Result<(), DaemonError>, Instant)> {
    let daemon = Arc::clone(daemon);
    tokio::spawn(async move {
        let res = daemon.run().await;
        (res, Instant::now())
    })
}

async fn wait_for(rx: &mut broadcast::Receiver<Event>, kind: EventKind) -> Event {
    loop {
        match rx.recv().await {
            Ok(ev) if ev.kind == kind => return ev,
            Ok(_) | Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => panic!("bus closed while waiting for {kind:?}"),
        }
    }
}

fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<EventKind> {
    let mut kinds = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(ev) => kinds.push(ev.kind),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => return kinds,
        }
    }
}

fn entries(journal: &Journal, what: &str) -> Vec<(String, Instant)> {
    journal
        .lock()
        .unwrap()
        .iter()
        .filter(|(_, w, _)| *w == what)
        .map(|(name, _, at)| (name.clone(), *at))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_components_start_in_attach_order_one_at_a_time() {
    let mut h = harness();
    for name in ["a", "b", "c"] {
        h.daemon
            .attach(Scripted::new(name, &h.journal).start_for(Duration::from_millis(100)).arc())
            .await
            .unwrap();
    }
    let run = spawn_run(&h.daemon);
    wait_for(&mut h.events, EventKind::AllStarted).await;

    let starts = entries(&h.journal, "start");
    let names: Vec<&str> = starts.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, ["a", "b", "c"]);
    assert!(starts[1].1 - starts[0].1 >= Duration::from_millis(100));
    assert!(starts[2].1 - starts[1].1 >= Duration::from_millis(100));
    assert!(h.daemon.is_started());
    assert_eq!(h.notifier.sent.lock().unwrap()[0], "READY");

    h.daemon.deliver(DaemonSignal::Terminate).await;
    let (res, _) = run.await.unwrap();
    res.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_attach_after_start_starts_immediately() {
    let mut h = harness();
    h.daemon.attach(Scripted::new("early", &h.journal).arc()).await.unwrap();
    let run = spawn_run(&h.daemon);
    wait_for(&mut h.events, EventKind::AllStarted).await;

    h.daemon.attach(Scripted::new("late", &h.journal).arc()).await.unwrap();

    let names: Vec<String> = entries(&h.journal, "start").into_iter().map(|(n, _)| n).collect();
    assert_eq!(names, ["early", "late"]);
    assert_eq!(h.daemon.components(), ["early", "late"]);

    h.daemon.deliver(DaemonSignal::Interrupt).await;
    run.await.unwrap().0.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_stops_run_concurrently_then_halt_after_exit_delay() {
    let mut h = harness();
    for name in ["a", "b", "c"] {
        h.daemon
            .attach(Scripted::new(name, &h.journal).stop_for(Duration::from_secs(1)).arc())
            .await
            .unwrap();
    }
    let run = spawn_run(&h.daemon);
    wait_for(&mut h.events, EventKind::AllStarted).await;

    let t0 = Instant::now();
    h.daemon.deliver(DaemonSignal::Terminate).await;
    let (res, returned_at) = run.await.unwrap();
    res.unwrap();

    let stops = entries(&h.journal, "stop");
    assert_eq!(stops.len(), 3);
    assert!(stops.iter().all(|(_, at)| *at == stops[0].1));

    let elapsed = returned_at - t0;
    assert!(elapsed >= Duration::from_millis(1100), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(1200), "{elapsed:?}");

    let kinds = drain(&mut h.events);
    assert!(kinds.contains(&EventKind::AllStoppedWithin));
    assert!(!kinds.contains(&EventKind::ShutdownTimedOut));
    assert_eq!(h.daemon.component_count(), 0);
    assert!(!h.daemon.is_started());
    assert!(h
        .notifier
        .sent
        .lock()
        .unwrap()
        .contains(&"STATUS Shutting down".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_slow_stop_is_bounded_by_timeout() {
    let mut h = harness();
    h.daemon
        .attach(Scripted::new("slow", &h.journal).stop_for(Duration::from_secs(60)).arc())
        .await
        .unwrap();
    h.daemon
        .attach(Scripted::new("fast", &h.journal).stop_for(Duration::from_millis(10)).arc())
        .await
        .unwrap();
    let run = spawn_run(&h.daemon);
    wait_for(&mut h.events, EventKind::AllStarted).await;

    let t0 = Instant::now();
    h.daemon.deliver(DaemonSignal::Terminate).await;
    let (res, returned_at) = run.await.unwrap();
    res.unwrap();

    let elapsed = returned_at - t0;
    assert!(elapsed >= Duration::from_millis(5100), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(5200), "{elapsed:?}");

    let kinds = drain(&mut h.events);
    let timeouts = kinds.iter().filter(|k| **k == EventKind::ShutdownTimedOut).count();
    assert_eq!(timeouts, 1);
    assert!(!kinds.contains(&EventKind::AllStoppedWithin));
    // The straggler is no longer awaited but keeps its registry entry.
    assert_eq!(h.daemon.components(), ["slow"]);
}

#[tokio::test(start_paused = true)]
async fn test_signal_fires_once_per_kind() {
    let mut h = harness();
    h.daemon
        .attach(Scripted::new("a", &h.journal).stop_for(Duration::from_secs(1)).arc())
        .await
        .unwrap();
    let run = spawn_run(&h.daemon);
    wait_for(&mut h.events, EventKind::AllStarted).await;

    let first = tokio::spawn({
        let d = Arc::clone(&h.daemon);
        async move { d.deliver(DaemonSignal::Terminate).await }
    });
    time::sleep(Duration::from_millis(10)).await;

    h.daemon.deliver(DaemonSignal::Terminate).await;
    let ignored = wait_for(&mut h.events, EventKind::SignalIgnored).await;
    assert_eq!(ignored.signal, Some(DaemonSignal::Terminate));

    // A different kind is still armed, but the fan-out only runs once.
    h.daemon.deliver(DaemonSignal::Interrupt).await;
    first.await.unwrap();
    run.await.unwrap().0.unwrap();

    assert_eq!(entries(&h.journal, "stop").len(), 1);
    let kinds = drain(&mut h.events);
    assert!(kinds.contains(&EventKind::ShutdownIgnored));
}

#[tokio::test(start_paused = true)]
async fn test_hangup_stops_then_reexecs() {
    let mut h = harness();
    h.daemon
        .attach(Scripted::new("a", &h.journal).stop_for(Duration::from_millis(200)).arc())
        .await
        .unwrap();
    let run = spawn_run(&h.daemon);
    wait_for(&mut h.events, EventKind::AllStarted).await;

    let t0 = Instant::now();
    h.daemon.deliver(DaemonSignal::Hangup).await;

    let err = run.await.unwrap().0.unwrap_err();
    assert!(matches!(err, DaemonError::Restart { .. }), "{err}");

    let calls = h.exec.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let (plan, at) = &calls[0];
    // reload delay + stop + restart delay
    let waited = *at - t0;
    assert!(waited >= Duration::from_millis(300), "{waited:?}");
    assert!(waited < Duration::from_millis(310), "{waited:?}");
    assert_eq!(plan.args, std::env::args_os().skip(1).collect::<Vec<_>>());
    assert_eq!(entries(&h.journal, "stop").len(), 1);

    let sent = h.notifier.sent.lock().unwrap();
    assert!(sent.contains(&"RELOADING Reloading the main process".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_reload_is_ignored() {
    let mut h = harness();
    h.daemon
        .attach(Scripted::new("a", &h.journal).stop_for(Duration::from_secs(1)).arc())
        .await
        .unwrap();
    let run = spawn_run(&h.daemon);
    wait_for(&mut h.events, EventKind::AllStarted).await;

    let first = tokio::spawn({
        let d = Arc::clone(&h.daemon);
        async move { d.reload().await }
    });
    time::sleep(Duration::from_millis(10)).await;
    h.daemon.reload().await;
    wait_for(&mut h.events, EventKind::ReloadIgnored).await;

    first.await.unwrap();
    let err = run.await.unwrap().0.unwrap_err();
    assert!(matches!(err, DaemonError::Restart { .. }));
    assert_eq!(h.exec.calls.lock().unwrap().len(), 1);
    assert_eq!(entries(&h.journal, "stop").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_start_failure_aborts_remaining_starts() {
    let h = harness();
    h.daemon.attach(Scripted::new("a", &h.journal).arc()).await.unwrap();
    h.daemon.attach(Scripted::new("b", &h.journal).failing().arc()).await.unwrap();
    h.daemon.attach(Scripted::new("c", &h.journal).arc()).await.unwrap();

    let err = spawn_run(&h.daemon).await.unwrap().0.unwrap_err();
    match err {
        DaemonError::ComponentStart { component, .. } => assert_eq!(component, "b"),
        other => panic!("unexpected error: {other}"),
    }

    let names: Vec<String> = entries(&h.journal, "start").into_iter().map(|(n, _)| n).collect();
    assert_eq!(names, ["a", "b"]);
    assert!(!h.daemon.is_started());
    assert_eq!(h.daemon.components(), ["a", "b", "c"]);
}

struct Chatty {
    diagnostics: Mutex<Diagnostics>,
}

impl AcceptDiagnostics for Chatty {
    fn set_diagnostics(&self, diagnostics: Diagnostics) {
        *self.diagnostics.lock().unwrap() = diagnostics;
    }
}

#[async_trait]
impl Component for Chatty {
    fn name(&self) -> &str {
        "chatty"
    }

    async fn start(&self) -> Result<(), ComponentError> {
        self.diagnostics.lock().unwrap().warn("cache cold");
        Ok(())
    }

    async fn stop(&self) -> Result<(), ComponentError> {
        Ok(())
    }

    fn diagnostics_slot(&self) -> Option<&dyn AcceptDiagnostics> {
        Some(self)
    }
}

#[tokio::test(start_paused = true)]
async fn test_diagnostics_handle_is_injected_on_attach() {
    let mut h = harness();
    let chatty = Arc::new(Chatty {
        diagnostics: Mutex::new(Diagnostics::noop()),
    });
    h.daemon.attach(chatty.clone()).await.unwrap();
    assert!(!chatty.diagnostics.lock().unwrap().is_noop());

    let run = spawn_run(&h.daemon);
    let line = wait_for(&mut h.events, EventKind::ComponentLog).await;
    assert_eq!(line.component.as_deref(), Some("chatty"));
    assert_eq!(line.reason.as_deref(), Some("cache cold"));
    assert_eq!(line.level, Some(tracing::Level::WARN));

    h.daemon.deliver(DaemonSignal::Terminate).await;
    run.await.unwrap().0.unwrap();
}

#[derive(Default)]
struct Collect {
    seen: Mutex<Vec<EventKind>>,
}

#[async_trait]
impl Subscribe for Collect {
    async fn on_event(&self, event: &Event) {
        time::sleep(Duration::from_millis(2)).await;
        self.seen.lock().unwrap().push(event.kind);
    }

    fn name(&self) -> &'static str {
        "collect"
    }
}

#[tokio::test(start_paused = true)]
async fn test_subscribers_have_seen_loop_stopped_when_run_returns() {
    let collect = Arc::new(Collect::default());
    let daemon = Daemon::builder(DaemonConfig::default())
        .with_exec(Arc::new(RecordingExec::default()))
        .with_notifier(Arc::new(RecordingNotifier::default()))
        .with_subscribers(vec![collect.clone() as Arc<dyn Subscribe>])
        .build();
    let mut events = daemon.events();
    let journal = Journal::default();
    daemon.attach(Scripted::new("a", &journal).arc()).await.unwrap();

    let run = spawn_run(&daemon);
    wait_for(&mut events, EventKind::AllStarted).await;
    daemon.deliver(DaemonSignal::Terminate).await;
    run.await.unwrap().0.unwrap();

    // No extra wait: run() joins the subscriber backlog before returning.
    let seen = collect.seen.lock().unwrap();
    assert_eq!(seen.last(), Some(&EventKind::LoopStopped));
    for kind in [
        EventKind::ComponentAttached,
        EventKind::SignalReceived,
        EventKind::ShutdownRequested,
        EventKind::ComponentStopped,
        EventKind::AllStoppedWithin,
        EventKind::LoopStopped,
    ] {
        assert!(seen.contains(&kind), "missing {kind:?} in {seen:?}");
    }
}
