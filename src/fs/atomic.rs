//! Atomic file and symlink replacement.
//!
//! Both primitives follow the same TOCTOU-safe sequence using a directory handle:
//! `open_dir_nofollow(parent) -> create tmp in parent -> renameat(tmp, final) -> fsync(dirfd)`.
//! A crash at any point leaves either the old or the new node under the final name, never a
//! half-written one; at worst a `.<name>.<pid>.<n>.groundwork.tmp` leftover, which
//! [`sweep_stale_temps`] removes on the next run.
use std::ffi::{CString, OsStr};
use std::fs;
use std::io::Write;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::constants::TMP_SUFFIX;
use rustix::fd::OwnedFd;
use rustix::fs::{openat, renameat, symlinkat, unlinkat, AtFlags, Mode, OFlags, CWD};
use rustix::io::Errno;

fn errno_to_io(e: Errno) -> std::io::Error {
    std::io::Error::from_raw_os_error(e.raw_os_error())
}

fn cstring(s: &OsStr) -> std::io::Result<CString> {
    CString::new(s.as_bytes())
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "invalid cstring"))
}

// Global counter to produce unique temporary names within a process.
static NEXT_TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

fn split_target(target: &Path) -> std::io::Result<(&Path, &OsStr)> {
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let fname = target.file_name().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "target has no file name")
    })?;
    Ok((parent, fname))
}

fn tmp_name_for(fname: &OsStr) -> String {
    let pid = std::process::id();
    let ctr = NEXT_TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!(".{}.{pid}.{ctr}{TMP_SUFFIX}", fname.to_string_lossy())
}

/// Open a directory with `O_DIRECTORY` | `O_NOFOLLOW` for atomic operations.
///
/// # Errors
///
/// Returns an IO error if the directory cannot be opened.
pub fn open_dir_nofollow(dir: &Path) -> std::io::Result<OwnedFd> {
    let c = cstring(dir.as_os_str())?;
    openat(
        CWD,
        c.as_c_str(),
        OFlags::RDONLY | OFlags::DIRECTORY | OFlags::CLOEXEC | OFlags::NOFOLLOW,
        Mode::empty(),
    )
    .map_err(errno_to_io)
}

/// Fsync the parent directory of `path` for durability.
///
/// # Errors
///
/// Returns an IO error if the parent directory cannot be opened or fsynced.
pub fn fsync_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        let dir = fs::File::open(parent)?;
        dir.sync_all()?;
    }
    Ok(())
}

fn fsync_dirfd(dirfd: &OwnedFd) -> std::io::Result<()> {
    rustix::fs::fsync(dirfd).map_err(errno_to_io)
}

/// Remove temporaries left next to `target` by an interrupted stage. Returns how many.
///
/// # Errors
///
/// Returns an IO error if the parent directory cannot be listed.
pub fn sweep_stale_temps(target: &Path) -> std::io::Result<usize> {
    let (parent, fname) = split_target(target)?;
    if !parent.is_dir() {
        return Ok(0);
    }
    let prefix = format!(".{}.", fname.to_string_lossy());
    let mut removed = 0usize;
    for entry in fs::read_dir(parent)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(&prefix) && name.ends_with(TMP_SUFFIX) {
            match fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
    }
    Ok(removed)
}

/// Content written to a temporary sibling of its destination, not yet visible under the
/// final name. Dropping without [`commit`](Self::commit) removes the temporary.
#[derive(Debug)]
pub struct StagedFile {
    dirfd: OwnedFd,
    tmp: CString,
    tmp_path: PathBuf,
    final_name: CString,
    committed: bool,
}

impl StagedFile {
    #[must_use]
    pub fn temp_path(&self) -> &Path {
        &self.tmp_path
    }

    /// Rename the temporary over the destination and fsync the directory.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the rename fails; the destination is then untouched.
    pub fn commit(mut self) -> std::io::Result<()> {
        renameat(
            &self.dirfd,
            self.tmp.as_c_str(),
            &self.dirfd,
            self.final_name.as_c_str(),
        )
        .map_err(errno_to_io)?;
        self.committed = true;
        let _ = fsync_dirfd(&self.dirfd);
        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = unlinkat(&self.dirfd, self.tmp.as_c_str(), AtFlags::empty());
        }
    }
}

/// Write `content` to a fresh temporary in the destination directory with `mode` and
/// optional `(uid, gid)` applied, fsynced, ready to be committed.
///
/// # Errors
///
/// Returns an IO error if the parent directory cannot be opened or the write fails.
pub fn stage_file(
    target: &Path,
    content: &[u8],
    mode: u32,
    owner: Option<(u32, u32)>,
) -> std::io::Result<StagedFile> {
    let _ = sweep_stale_temps(target);
    let (parent, fname) = split_target(target)?;
    let dirfd = open_dir_nofollow(parent)?;
    let tmp_name = tmp_name_for(fname);
    let tmp = cstring(OsStr::new(&tmp_name))?;
    let fd = openat(
        &dirfd,
        tmp.as_c_str(),
        OFlags::WRONLY | OFlags::CREATE | OFlags::EXCL | OFlags::CLOEXEC | OFlags::NOFOLLOW,
        Mode::from_bits_truncate(0o600),
    )
    .map_err(errno_to_io)?;
    let staged = StagedFile {
        dirfd,
        tmp,
        tmp_path: parent.join(&tmp_name),
        final_name: cstring(fname)?,
        committed: false,
    };
    let mut file = fs::File::from(fd);
    file.write_all(content)?;
    // set_permissions on an open File is fchmod; not subject to the umask.
    file.set_permissions(fs::Permissions::from_mode(mode & 0o7777))?;
    if let Some((uid, gid)) = owner {
        std::os::unix::fs::fchown(&file, Some(uid), Some(gid))?;
    }
    file.sync_all()?;
    Ok(staged)
}

/// Atomically replace `target` with `content`.
///
/// # Errors
///
/// Returns an IO error if staging or the final rename fails.
pub fn write_atomic(
    target: &Path,
    content: &[u8],
    mode: u32,
    owner: Option<(u32, u32)>,
) -> std::io::Result<()> {
    stage_file(target, content, mode, owner)?.commit()
}

/// Atomically point `target` at `source` using a temporary link and renameat.
/// Returns the elapsed rename+fsync time in milliseconds.
///
/// # Errors
///
/// Returns an IO error if the atomic swap operation fails.
pub fn atomic_symlink_swap(source: &Path, target: &Path) -> std::io::Result<u64> {
    let (parent, fname) = split_target(target)?;
    let _ = sweep_stale_temps(target);
    let dirfd = open_dir_nofollow(parent)?;
    let tmp_c = cstring(OsStr::new(&tmp_name_for(fname)))?;

    match unlinkat(&dirfd, tmp_c.as_c_str(), AtFlags::empty()) {
        Ok(()) => {}
        Err(e) if e == Errno::NOENT => {}
        Err(e) => return Err(errno_to_io(e)),
    }

    let src_c = cstring(source.as_os_str())?;
    symlinkat(src_c.as_c_str(), &dirfd, tmp_c.as_c_str()).map_err(errno_to_io)?;

    let new_c = cstring(fname)?;
    let t0 = Instant::now();
    if let Err(e) = renameat(&dirfd, tmp_c.as_c_str(), &dirfd, new_c.as_c_str()) {
        let _ = unlinkat(&dirfd, tmp_c.as_c_str(), AtFlags::empty());
        return Err(errno_to_io(e));
    }
    let _ = fsync_dirfd(&dirfd);
    Ok(u64::try_from(t0.elapsed().as_millis()).unwrap_or(u64::MAX))
}
