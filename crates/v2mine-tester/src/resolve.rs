//! Locating the tester executable on disk.

use crate::error::{Result, TesterError};
use std::path::{Path, PathBuf};

/// Find `name` in the first directory of `search_dirs` that holds a runnable
/// file of that name. The platform executable suffix is appended when
/// missing.
pub fn resolve_executable(name: &str, search_dirs: &[PathBuf]) -> Result<PathBuf> {
    let file_name = with_exe_suffix(name);

    for dir in search_dirs {
        let candidate = dir.join(&file_name);
        if is_runnable(&candidate) {
            tracing::debug!(path = %candidate.display(), "Found tester executable");
            return Ok(candidate);
        }
        tracing::trace!(path = %candidate.display(), "No tester executable here");
    }

    Err(TesterError::ExecutableNotFound {
        name: file_name,
        searched: search_dirs.to_vec(),
    })
}

fn with_exe_suffix(name: &str) -> String {
    let suffix = std::env::consts::EXE_SUFFIX;
    if suffix.is_empty() || name.ends_with(suffix) {
        name.to_string()
    } else {
        format!("{name}{suffix}")
    }
}

#[cfg(unix)]
fn is_runnable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_runnable(path: &Path) -> bool {
    path.is_file()
}
