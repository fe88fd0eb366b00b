//! # Process image replacement.
//!
//! [`RestartPlan`] captures what a restart needs (binary, arguments without the
//! program name, full environment). An [`Exec`] implementation carries it out.
//! [`Execve`] replaces the running image via `execve(2)`; tests inject a
//! recording implementation instead.
//!
//! Success never returns. Failure is fatal for the caller: by the time a
//! restart runs, every component has already been stopped.

use std::convert::Infallible;
use std::env;
use std::ffi::{CString, OsString};
use std::io;
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::PathBuf;

use nix::unistd::execve;

use crate::error::DaemonError;

/// Everything needed to start the same program again.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RestartPlan {
    /// Absolute path of the binary (or the invocation hint, verbatim).
    pub binary: PathBuf,
    /// Arguments in original order, program name stripped.
    pub args: Vec<OsString>,
    /// Complete environment, passed through unchanged.
    pub env: Vec<(OsString, OsString)>,
}

impl RestartPlan {
    /// Captures the plan for the current process.
    ///
    /// Fails with [`DaemonError::CwdUnavailable`] only if the binary must be
    /// resolved from `argv[0]` and the initial working directory is unknown.
    pub fn current(invocation_env: &str) -> Result<Self, DaemonError> {
        Ok(Self {
            binary: super::current_binary_path(invocation_env)?,
            args: env::args_os().skip(1).collect(),
            env: env::vars_os().collect(),
        })
    }

    /// `argv` as handed to the new image: binary first, then the arguments.
    fn argv(&self) -> io::Result<Vec<CString>> {
        std::iter::once(self.binary.as_os_str().to_owned())
            .chain(self.args.iter().cloned())
            .map(|arg| CString::new(arg.into_vec()).map_err(io::Error::from))
            .collect()
    }

    /// `envp` as `KEY=VALUE` strings.
    fn envp(&self) -> io::Result<Vec<CString>> {
        self.env
            .iter()
            .map(|(key, value)| {
                let mut pair = Vec::with_capacity(key.len() + value.len() + 1);
                pair.extend_from_slice(key.as_bytes());
                pair.push(b'=');
                pair.extend_from_slice(value.as_bytes());
                CString::new(pair).map_err(io::Error::from)
            })
            .collect()
    }
}

/// Replaces the running process image.
pub trait Exec: Send + Sync + 'static {
    /// Never returns on success.
    fn exec(&self, plan: &RestartPlan) -> io::Result<Infallible>;
}

/// [`Exec`] backed by `execve(2)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Execve;

impl Exec for Execve {
    fn exec(&self, plan: &RestartPlan) -> io::Result<Infallible> {
        let path = CString::new(plan.binary.as_os_str().as_bytes())?;
        let argv = plan.argv()?;
        let envp = plan.envp()?;
        Ok(execve(&path, &argv, &envp)?)
    }
}

/// Runs `plan` through `exec`, mapping failure to [`DaemonError::Restart`].
pub fn restart_with(exec: &dyn Exec, plan: &RestartPlan) -> Result<Infallible, DaemonError> {
    exec.exec(plan).map_err(|source| DaemonError::Restart {
        binary: plan.binary.clone(),
        source,
    })
}

/// Replaces this process with a fresh invocation of the same binary, arguments and environment.
pub fn restart(invocation_env: &str) -> Result<Infallible, DaemonError> {
    restart_with(&Execve, &RestartPlan::current(invocation_env)?)
}
