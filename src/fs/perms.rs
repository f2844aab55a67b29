//! Ownership and permission helpers.
use std::fs;
use std::io;
use std::os::unix::fs::{lchown, MetadataExt, PermissionsExt};
use std::path::Path;

/// # Errors
///
/// Returns an IO error if chmod fails.
pub fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777))
}

/// Change owner of the node itself (symlinks are not followed).
///
/// # Errors
///
/// Returns an IO error if lchown fails.
pub fn set_owner(path: &Path, uid: u32, gid: u32) -> io::Result<()> {
    lchown(path, Some(uid), Some(gid))
}

fn walk(path: &Path, f: &mut dyn FnMut(&Path, &fs::Metadata) -> io::Result<()>) -> io::Result<()> {
    let md = fs::symlink_metadata(path)?;
    f(path, &md)?;
    if md.file_type().is_dir() {
        for entry in fs::read_dir(path)? {
            walk(&entry?.path(), f)?;
        }
    }
    Ok(())
}

/// Number of nodes under `root` (inclusive) not owned by `uid:gid`. Symlinks are not followed.
///
/// # Errors
///
/// Returns an IO error if the tree cannot be read.
pub fn count_foreign_owned(root: &Path, uid: u32, gid: u32) -> io::Result<usize> {
    let mut n = 0usize;
    walk(root, &mut |_, md| {
        if md.uid() != uid || md.gid() != gid {
            n += 1;
        }
        Ok(())
    })?;
    Ok(n)
}

/// Recursively hand `root` to `uid:gid`. Returns how many nodes changed.
///
/// # Errors
///
/// Returns an IO error on the first node that cannot be changed.
pub fn chown_tree(root: &Path, uid: u32, gid: u32) -> io::Result<usize> {
    let mut changed = 0usize;
    walk(root, &mut |p, md| {
        if md.uid() != uid || md.gid() != gid {
            lchown(p, Some(uid), Some(gid))?;
            changed += 1;
        }
        Ok(())
    })?;
    Ok(changed)
}
