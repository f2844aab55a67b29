use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use rustix::fs::{access, Access};

/// Find `bin` in a `PATH`-style list of directories.
#[must_use]
pub fn which_on_path(path: &OsStr, bin: &str) -> Option<PathBuf> {
    env::split_paths(path)
        .map(|dir| dir.join(bin))
        .find(|cand| cand.is_file() && is_executable(cand))
}

/// At least one execute bit is set on the resolved file.
#[must_use]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|md| md.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[must_use]
pub fn effective_uid_is_root() -> bool {
    rustix::process::geteuid().is_root()
}

/// Ensure the nearest existing ancestor of `path` is a writable directory.
///
/// # Errors
///
/// Returns a human message when no ancestor exists or it is not writable.
pub fn ensure_writable_dir(path: &Path) -> Result<(), String> {
    let mut cur = Some(path);
    while let Some(p) = cur {
        if p.exists() {
            if !p.is_dir() {
                return Err(format!("{} is not a directory", p.display()));
            }
            return access(p, Access::WRITE_OK | Access::EXEC_OK)
                .map_err(|e| format!("{} is not writable: {e}", p.display()));
        }
        cur = p.parent();
    }
    Err(format!("no existing ancestor for {}", path.display()))
}
