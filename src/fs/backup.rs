//! Backups taken before destructive in-place edits.
use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt as _;
use std::path::{Path, PathBuf};

/// Generate a backup path for a target file (includes a millisecond timestamp).
/// Public so callers and tests can compute expected names.
#[must_use]
pub fn backup_path_with_tag(target: &Path, tag: &str) -> PathBuf {
    use std::time::{SystemTime, UNIX_EPOCH};
    let name = target
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("backup");
    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    parent.join(format!(".{name}.{tag}.{ts}.bak"))
}

/// Like [`backup_path_with_tag`] but bumps the timestamp until the name is unused.
fn unique_backup_path(target: &Path, tag: &str) -> PathBuf {
    let mut backup = backup_path_with_tag(target, tag);
    while fs::symlink_metadata(&backup).is_ok() {
        let bumped = backup
            .file_name()
            .and_then(|s| s.to_str())
            .and_then(|s| s.strip_suffix(".bak"))
            .and_then(|prefix| prefix.rsplit_once('.'))
            .and_then(|(pre, ts)| ts.parse::<u128>().ok().map(|ts| (pre.to_string(), ts)));
        let Some((pre, ts)) = bumped else { break };
        backup = backup
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(format!("{pre}.{}.bak", ts.saturating_add(1)));
    }
    backup
}

/// Snapshot `target` next to itself before it is overwritten.
///
/// - Regular file: bytes are copied and the original mode preserved.
/// - Symlink: a symlink to the same destination is created.
/// - Absent or other kinds: nothing to back up, `Ok(None)`.
///
/// # Errors
///
/// Returns an IO error if the copy or link creation fails.
pub fn backup_file(target: &Path, tag: &str) -> io::Result<Option<PathBuf>> {
    let Ok(md) = fs::symlink_metadata(target) else {
        return Ok(None);
    };
    let ft = md.file_type();
    if ft.is_symlink() {
        let dest = fs::read_link(target)?;
        let backup = unique_backup_path(target, tag);
        std::os::unix::fs::symlink(dest, &backup)?;
        let _ = super::atomic::fsync_parent_dir(target);
        return Ok(Some(backup));
    }
    if !ft.is_file() {
        return Ok(None);
    }
    let backup = unique_backup_path(target, tag);
    fs::copy(target, &backup)?;
    fs::set_permissions(&backup, fs::Permissions::from_mode(md.permissions().mode()))?;
    fs::File::open(&backup)?.sync_all()?;
    let _ = super::atomic::fsync_parent_dir(target);
    Ok(Some(backup))
}

/// All backups of `target` with `tag`, oldest first.
#[must_use]
pub fn list_backups(target: &Path, tag: &str) -> Vec<PathBuf> {
    let Some(name) = target.file_name().and_then(|s| s.to_str()) else {
        return Vec::new();
    };
    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    let prefix = format!(".{name}.{tag}.");
    let mut out: Vec<(u128, PathBuf)> = fs::read_dir(parent)
        .into_iter()
        .flatten()
        .flatten()
        .filter_map(|e| {
            let fname = e.file_name().to_string_lossy().into_owned();
            let ts = fname.strip_prefix(&prefix)?.strip_suffix(".bak")?.parse().ok()?;
            Some((ts, e.path()))
        })
        .collect();
    out.sort();
    out.into_iter().map(|(_, p)| p).collect()
}
