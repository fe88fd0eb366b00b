//! # OS-level process facilities.
//!
//! - [`set_title`]: best-effort process title
//! - [`get_env`]: environment lookup that keeps "absent" and "empty" apart
//! - [`initial_cwd`]: working directory captured once, on first use
//! - [`current_binary_path`]: the binary to re-execute
//! - [`restart`] / [`restart_with`]: replace the process image
//!
//! Call [`initial_cwd`] early (the daemon does so in `run()`): a component that
//! later changes directory must not break resolving a relative `argv[0]`.

mod exec;
mod paths;

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::error::DaemonError;

pub use exec::{Exec, Execve, RestartPlan, restart, restart_with};
pub use paths::{binary_path, normalize};

static INITIAL_CWD: OnceCell<PathBuf> = OnceCell::new();

/// Sets the title of this process. Failures are logged and swallowed.
///
/// The title is written to `/proc/self/comm`, which renames the main thread
/// whichever thread calls this; the kernel keeps the first 15 bytes. Without
/// procfs, `prctl(PR_SET_NAME)` renames only the calling thread.
#[cfg(target_os = "linux")]
pub fn set_title(title: &str) {
    let name = match std::ffi::CString::new(title) {
        Ok(name) => name,
        Err(err) => {
            debug!(title, error = %err, "process title contains NUL, not applied");
            return;
        }
    };
    let Err(err) = std::fs::write("/proc/self/comm", name.as_bytes()) else {
        return;
    };
    debug!(title, error = %err, "procfs comm not writable, renaming this thread");
    if let Err(errno) = nix::sys::prctl::set_name(&name) {
        debug!(title, error = %errno, "failed to set process title");
    }
}

/// Sets the title of this process. Not supported on this platform.
#[cfg(not(target_os = "linux"))]
pub fn set_title(title: &str) {
    debug!(title, "process titles are not supported on this platform");
}

/// Returns the value of `key`, or `None` if it is not set.
///
/// A variable set to the empty string is `Some("")`.
pub fn get_env(key: &str) -> Option<OsString> {
    env::var_os(key)
}

/// The working directory as seen the first time this function was called.
pub fn initial_cwd() -> Result<&'static Path, DaemonError> {
    INITIAL_CWD
        .get_or_try_init(|| {
            env::current_dir().map_err(|source| DaemonError::CwdUnavailable { source })
        })
        .map(PathBuf::as_path)
}

/// Absolute form of `path`, relative to `cwd` or to the current directory.
pub fn absolute(path: impl AsRef<Path>, cwd: Option<&Path>) -> Result<PathBuf, DaemonError> {
    match cwd {
        Some(cwd) => Ok(normalize(path, cwd)),
        None => {
            let cwd =
                env::current_dir().map_err(|source| DaemonError::CwdUnavailable { source })?;
            Ok(normalize(path, &cwd))
        }
    }
}

/// Path of the running binary.
///
/// Uses the `invocation_env` hint when present and non-empty, else `argv[0]`
/// resolved against [`initial_cwd`].
pub fn current_binary_path(invocation_env: &str) -> Result<PathBuf, DaemonError> {
    let hint = get_env(invocation_env);
    let argv0 = env::args_os().next().unwrap_or_default();
    binary_path(hint.as_deref(), &argv0, initial_cwd)
}
