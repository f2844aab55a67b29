//! Non-mutating filesystem probes used by steps and facts.
use sha2::{Digest, Sha256};
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Dir,
    Symlink,
    Missing,
    Other,
}

impl NodeKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            NodeKind::File => "file",
            NodeKind::Dir => "dir",
            NodeKind::Symlink => "symlink",
            NodeKind::Missing => "missing",
            NodeKind::Other => "other",
        }
    }
}

/// Classify the node at `path` without following a final symlink.
#[must_use]
pub fn kind_of(path: &Path) -> NodeKind {
    match std::fs::symlink_metadata(path) {
        Ok(md) => {
            let ft = md.file_type();
            if ft.is_symlink() {
                NodeKind::Symlink
            } else if ft.is_file() {
                NodeKind::File
            } else if ft.is_dir() {
                NodeKind::Dir
            } else {
                NodeKind::Other
            }
        }
        Err(_) => NodeKind::Missing,
    }
}

/// Compute SHA-256 of a file at `path`, returning a lowercase hex string.
#[must_use]
pub fn sha256_hex_of(path: &Path) -> Option<String> {
    let mut f = std::fs::File::open(path).ok()?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut f, &mut hasher).ok()?;
    Some(hex::encode(hasher.finalize()))
}

#[must_use]
pub fn sha256_hex_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// If `target` is a symlink, resolve its target to an absolute path.
/// Relative links are resolved relative to the parent directory of `target`.
#[must_use]
pub fn resolve_symlink_target(target: &Path) -> Option<PathBuf> {
    let md = std::fs::symlink_metadata(target).ok()?;
    if !md.file_type().is_symlink() {
        return None;
    }
    let mut link = std::fs::read_link(target).ok()?;
    if link.is_relative() {
        if let Some(parent) = target.parent() {
            link = parent.join(link);
        }
    }
    Some(link)
}

/// Permission bits (including setuid/setgid/sticky) of the node itself.
#[must_use]
pub fn mode_of(path: &Path) -> Option<u32> {
    std::fs::symlink_metadata(path).ok().map(|md| md.mode() & 0o7777)
}

/// `(uid, gid)` of the node itself.
#[must_use]
pub fn owner_of(path: &Path) -> Option<(u32, u32)> {
    std::fs::symlink_metadata(path)
        .ok()
        .map(|md| (md.uid(), md.gid()))
}
