//! # Path resolution for self re-execution.
//!
//! Pure functions: nothing here touches the filesystem or reads process state.
//! Callers pass the working directory explicitly.
//!
//! ## Rules
//! - Relative paths are joined to the given working directory first.
//! - Repeated separators collapse, `.` segments drop, `..` removes the
//!   preceding segment. `..` at the root removes nothing.
//! - The result is always absolute.

use std::ffi::OsStr;
use std::path::{Component as Segment, MAIN_SEPARATOR_STR, Path, PathBuf};

/// Returns the absolute, lexically normalized form of `path`.
///
/// # Example
/// ```
/// use std::path::{Path, PathBuf};
/// use daemonvisor::process::normalize;
///
/// assert_eq!(normalize("/a/./b/../c", Path::new("/")), PathBuf::from("/a/c"));
/// assert_eq!(normalize("./x", Path::new("/home/u")), PathBuf::from("/home/u/x"));
/// ```
pub fn normalize(path: impl AsRef<Path>, cwd: &Path) -> PathBuf {
    let path = path.as_ref();
    let joined;
    let path = if path.has_root() {
        path
    } else {
        joined = cwd.join(path);
        &joined
    };

    let mut segments: Vec<&OsStr> = Vec::new();
    for segment in path.components() {
        match segment {
            Segment::Prefix(_) | Segment::RootDir | Segment::CurDir => {}
            Segment::ParentDir => {
                segments.pop();
            }
            Segment::Normal(name) => segments.push(name),
        }
    }

    let mut out = PathBuf::from(MAIN_SEPARATOR_STR);
    out.extend(segments);
    out
}

/// Resolves the binary to re-execute.
///
/// A non-empty invocation `hint` wins and is returned verbatim. Otherwise
/// `argv0` is normalized against the working directory obtained from `cwd`,
/// which is only consulted in that case.
pub fn binary_path<'a, E>(
    hint: Option<&OsStr>,
    argv0: &OsStr,
    cwd: impl FnOnce() -> Result<&'a Path, E>,
) -> Result<PathBuf, E> {
    match hint.filter(|h| !h.is_empty()) {
        Some(hint) => Ok(PathBuf::from(hint)),
        None => Ok(normalize(argv0, cwd()?)),
    }
}
