use std::fmt;
use std::path::{Component, Path, PathBuf};

use super::errors::{Error, ErrorKind, Result};

/// A path confined to an install root.
///
/// Every filesystem path a step touches is stored as `root` + a normalized relative part, so
/// the same plan can run against `/` or against a staging tree. `..` and escapes are rejected.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SafePath {
    root: PathBuf,
    rel: PathBuf,
}

impl SafePath {
    /// Creates a new SafePath from a root and candidate path.
    ///
    /// Absolute candidates must already live under `root`; relative candidates are taken
    /// relative to it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath` when `root` is relative or the candidate has an unsupported
    /// component, and `InvalidPath` when the candidate escapes the root.
    pub fn from_rooted(root: &Path, candidate: &Path) -> Result<Self> {
        if !root.is_absolute() {
            return Err(Error::new(ErrorKind::InvalidPath, "root must be absolute"));
        }
        let effective = if candidate.is_absolute() {
            match candidate.strip_prefix(root) {
                Ok(p) => p.to_path_buf(),
                Err(_) => {
                    return Err(Error::new(
                        ErrorKind::InvalidPath,
                        format!("path escapes root: {}", candidate.display()),
                    ))
                }
            }
        } else {
            candidate.to_path_buf()
        };

        let mut rel = PathBuf::new();
        for seg in effective.components() {
            match seg {
                Component::CurDir => {}
                Component::Normal(p) => rel.push(p),
                Component::ParentDir => {
                    return Err(Error::new(
                        ErrorKind::InvalidPath,
                        format!("dotdot in {}", candidate.display()),
                    ));
                }
                _ => {
                    return Err(Error::new(
                        ErrorKind::InvalidPath,
                        format!("unsupported component in {}", candidate.display()),
                    ));
                }
            }
        }
        Ok(SafePath {
            root: root.to_path_buf(),
            rel,
        })
    }

    /// Map a host path such as `/etc/motioneye/motion.conf` into `root`.
    ///
    /// With `root = /` this is the identity; with a staging root the leading `/` is
    /// re-anchored under it.
    ///
    /// # Errors
    ///
    /// Same as [`from_rooted`](Self::from_rooted).
    pub fn under(root: &Path, host_path: impl AsRef<Path>) -> Result<Self> {
        let host_path = host_path.as_ref();
        let rel = host_path.strip_prefix("/").unwrap_or(host_path);
        Self::from_rooted(root, rel)
    }

    /// Extend this path with a relative suffix.
    ///
    /// # Errors
    ///
    /// Same as [`from_rooted`](Self::from_rooted).
    pub fn join(&self, suffix: impl AsRef<Path>) -> Result<Self> {
        Self::from_rooted(&self.root, &self.rel.join(suffix.as_ref()))
    }

    /// Returns the full path by joining the root and relative components.
    #[must_use]
    pub fn as_path(&self) -> PathBuf {
        self.root.join(&self.rel)
    }

    /// Returns a reference to the relative path component.
    #[must_use]
    pub fn rel(&self) -> &Path {
        &self.rel
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The containing directory, still confined to the same root.
    #[must_use]
    pub fn parent(&self) -> Option<SafePath> {
        self.rel.parent().map(|p| SafePath {
            root: self.root.clone(),
            rel: p.to_path_buf(),
        })
    }
}

impl fmt::Display for SafePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_path().display())
    }
}
