//! # Example: heartbeat
//!
//! A daemon with two components: a heartbeat ticker and a slow-stopping
//! "flusher". Run it, then from another shell:
//!
//! - `kill -HUP <pid>`: both components stop, the binary re-executes itself
//!   with the same arguments and environment, components start again.
//! - `kill -TERM <pid>` (or Ctrl-C): both components stop and the process exits.
//!
//! ```text
//! RUST_LOG=debug cargo run --example heartbeat
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use daemonvisor::{
    AcceptDiagnostics, Component, ComponentError, ComponentFn, Daemon, DaemonConfig, Diagnostics,
    LogWriter, Subscribe,
};
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

/// Logs a line every second through its diagnostics handle.
#[derive(Default)]
struct Heartbeat {
    diagnostics: Mutex<Diagnostics>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl AcceptDiagnostics for Heartbeat {
    fn set_diagnostics(&self, diagnostics: Diagnostics) {
        *self.diagnostics.lock().unwrap() = diagnostics;
    }
}

#[async_trait]
impl Component for Heartbeat {
    fn name(&self) -> &str {
        "heartbeat"
    }

    async fn start(&self) -> Result<(), ComponentError> {
        let diagnostics = self.diagnostics.lock().unwrap().clone();
        let ticker = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            let mut beats = 0u64;
            loop {
                interval.tick().await;
                beats += 1;
                diagnostics.info(format!("beat #{beats}"));
            }
        });
        *self.ticker.lock().unwrap() = Some(ticker);
        Ok(())
    }

    async fn stop(&self) -> Result<(), ComponentError> {
        if let Some(ticker) = self.ticker.lock().unwrap().take() {
            ticker.abort();
        }
        Ok(())
    }

    fn diagnostics_slot(&self) -> Option<&dyn AcceptDiagnostics> {
        Some(self)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let daemon = Daemon::builder(DaemonConfig::default().with_title("heartbeat"))
        .with_subscribers(subs)
        .build();

    daemon.attach(Arc::new(Heartbeat::default())).await?;
    daemon
        .attach(ComponentFn::arc(
            "flusher",
            || async { Ok::<_, ComponentError>(()) },
            || async {
                // Pretend to flush buffers; well under the stop bound.
                tokio::time::sleep(Duration::from_millis(1500)).await;
                Ok::<_, ComponentError>(())
            },
        ))
        .await?;

    println!("pid {}: send SIGHUP to reload, SIGTERM to stop", std::process::id());
    daemon.run().await?;
    Ok(())
}
