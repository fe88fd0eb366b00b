//! Error types used by the daemonvisor runtime and its components.
//!
//! This module defines two main error enums:
//!
//! - [`DaemonError`]: errors raised by the orchestration runtime itself.
//! - [`ComponentError`]: errors raised by a component's `start` / `stop`.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging.
//! Some [`DaemonError`] variants are never returned to a caller: they only
//! label diagnostic events (`ShutdownTimeout`, `DuplicateReload`, `DuplicateShutdown`).

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// # Errors produced by the daemonvisor runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum DaemonError {
    /// The working directory could not be read from the OS.
    #[error("failed to determine current working directory: {source}")]
    CwdUnavailable {
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// A component refused to start; the remaining start sequence was aborted.
    #[error("component {component:?} failed to start: {source}")]
    ComponentStart {
        /// Name of the failing component.
        component: String,
        /// Error reported by the component.
        #[source]
        source: ComponentError,
    },

    /// The stop fan-out did not finish within its bound.
    #[error("shutdown timed out after {timeout:?}, stopping anyway; still stopping: {stuck:?}")]
    ShutdownTimeout {
        /// The configured bound.
        timeout: Duration,
        /// Components whose `stop` had not completed yet.
        stuck: Vec<String>,
    },

    /// Replacing the process image failed. Unrecoverable: all components are already stopped.
    #[error("failed to re-execute {binary:?}: {source}")]
    Restart {
        /// Binary the restart tried to execute.
        binary: PathBuf,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// A reload was requested while one is already in progress.
    #[error("ignoring reload request, reload is already in progress")]
    DuplicateReload,

    /// A shutdown was requested while one is already in progress.
    #[error("got shutdown request during shutdown, ignoring")]
    DuplicateShutdown,

    /// Registering an OS signal listener failed.
    #[error("failed to install signal handler for {signal}: {source}")]
    SignalInstall {
        /// Signal name (e.g. `SIGHUP`).
        signal: &'static str,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// `Daemon::run` was called a second time.
    #[error("daemon is already running")]
    AlreadyRunning,
}

impl DaemonError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use daemonvisor::DaemonError;
    ///
    /// assert_eq!(DaemonError::DuplicateReload.as_label(), "daemon_duplicate_reload");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            DaemonError::CwdUnavailable { .. } => "daemon_cwd_unavailable",
            DaemonError::ComponentStart { .. } => "daemon_component_start",
            DaemonError::ShutdownTimeout { .. } => "daemon_shutdown_timeout",
            DaemonError::Restart { .. } => "daemon_restart",
            DaemonError::DuplicateReload => "daemon_duplicate_reload",
            DaemonError::DuplicateShutdown => "daemon_duplicate_shutdown",
            DaemonError::SignalInstall { .. } => "daemon_signal_install",
            DaemonError::AlreadyRunning => "daemon_already_running",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            DaemonError::CwdUnavailable { source } => format!("cwd unavailable: {source}"),
            DaemonError::ComponentStart { component, source } => {
                format!("start of {component} failed: {}", source.as_message())
            }
            DaemonError::ShutdownTimeout { timeout, stuck } => {
                format!("shutdown timed out after {timeout:?}; still stopping={stuck:?}")
            }
            DaemonError::Restart { binary, source } => {
                format!("exec of {} failed: {source}", binary.display())
            }
            DaemonError::DuplicateReload => "reload already in progress".to_string(),
            DaemonError::DuplicateShutdown => "shutdown already in progress".to_string(),
            DaemonError::SignalInstall { signal, source } => {
                format!("cannot listen for {signal}: {source}")
            }
            DaemonError::AlreadyRunning => "run() called twice".to_string(),
        }
    }

    /// True for errors after which the process has nothing left to fall back to.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DaemonError::Restart { .. } | DaemonError::CwdUnavailable { .. }
        )
    }
}

/// # Errors produced by a component's `start` or `stop`.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ComponentError {
    /// The operation failed.
    #[error("operation failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The component is broken beyond repair.
    #[error("fatal error: {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },
}

impl ComponentError {
    /// Shorthand for [`ComponentError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        ComponentError::Fail {
            error: error.into(),
        }
    }

    /// Shorthand for [`ComponentError::Fatal`].
    pub fn fatal(error: impl Into<String>) -> Self {
        ComponentError::Fatal {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use daemonvisor::ComponentError;
    ///
    /// assert_eq!(ComponentError::fail("boom").as_label(), "component_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ComponentError::Fail { .. } => "component_failed",
            ComponentError::Fatal { .. } => "component_fatal",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ComponentError::Fail { error } => format!("error: {error}"),
            ComponentError::Fatal { error } => format!("fatal: {error}"),
        }
    }
}
