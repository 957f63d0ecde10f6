//! Executable lookup used before handing the process over.

use std::env;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

/// True for regular files with any execute bit set.
pub fn is_executable(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(meta) = fs::metadata(path) {
            return meta.permissions().mode() & 0o111 != 0;
        }
        false
    }
    #[cfg(not(unix))]
    {
        true
    }
}

/// Searched when the environment has no `PATH`, as `execvp` does.
#[cfg(unix)]
pub const DEFAULT_SEARCH_PATH: &str = "/usr/bin:/bin";

fn default_search_path<'a>() -> Option<&'a OsStr> {
    #[cfg(unix)]
    {
        Some(OsStr::new(DEFAULT_SEARCH_PATH))
    }
    #[cfg(not(unix))]
    {
        None
    }
}

/// Search `search_path` (a `PATH`-style list) for an executable named `name`.
/// An unset `search_path` falls back to [`DEFAULT_SEARCH_PATH`] on Unix.
pub fn find_on_path(name: &OsStr, search_path: Option<&OsStr>) -> Option<PathBuf> {
    let paths = search_path.or_else(default_search_path)?;
    env::split_paths(paths)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

/// Resolve the program of a command line the way `execvp` would: names with a
/// path separator are used as-is, bare names are searched on `search_path`.
pub fn resolve_program(program: &OsStr, search_path: Option<&OsStr>) -> Option<PathBuf> {
    let as_path = Path::new(program);
    if program.to_string_lossy().contains('/') {
        return is_executable(as_path).then(|| as_path.to_path_buf());
    }
    find_on_path(program, search_path)
}
