//! Install configuration, read once per invocation.
//!
//! Behaviour flags come from `GROUNDWORK_*` environment variables and the positional
//! account argument. The resulting [`InstallConfig`] is passed by value into recipe
//! compilation; nothing re-reads the environment mid-run.
use std::ffi::OsStr;
use std::path::PathBuf;

use crate::adapters::pkg::PackageBackend;
use crate::adapters::venv::PipFlags;
use crate::constants::ENV_PREFIX;
use crate::types::errors::{Error, ErrorKind, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstallConfig {
    /// Staging root every host path is re-anchored under; `/` on a real install.
    pub root: PathBuf,
    /// Account the service runs as; recipes supply a default.
    pub target_user: Option<String>,
    /// Overrides the recipe's install directory.
    pub install_dir: Option<PathBuf>,
    pub with_gui: bool,
    pub upgrade: bool,
    pub force_reinstall: bool,
    pub prerelease: bool,
    /// Forces a package backend instead of detecting one from `PATH`.
    pub pkg_manager: Option<PackageBackend>,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/"),
            target_user: None,
            install_dir: None,
            with_gui: false,
            upgrade: false,
            force_reinstall: false,
            prerelease: false,
            pkg_manager: None,
        }
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::precondition(format!(
            "{ENV_PREFIX}{key}: expected a boolean, got '{other}'"
        ))),
    }
}

impl InstallConfig {
    /// Build from `(name, value)` pairs; names without the `GROUNDWORK_` prefix are ignored.
    ///
    /// # Errors
    ///
    /// Returns `PreconditionFailed` on an unparsable flag or unknown package manager and
    /// `InvalidPath` when the root or install directory is relative.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut cfg = Self::default();
        for (k, v) in vars {
            let Some(key) = k.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let v = v.as_ref();
            match key {
                "ROOT" => cfg.root = absolute(key, v)?,
                "INSTALL_DIR" if !v.is_empty() => cfg.install_dir = Some(absolute(key, v)?),
                "USER" if !v.is_empty() => cfg.target_user = Some(v.to_string()),
                "WITH_GUI" => cfg.with_gui = parse_flag(key, v)?,
                "UPGRADE" => cfg.upgrade = parse_flag(key, v)?,
                "FORCE_REINSTALL" => cfg.force_reinstall = parse_flag(key, v)?,
                "PRERELEASE" => cfg.prerelease = parse_flag(key, v)?,
                "PKG_MANAGER" if !v.is_empty() => {
                    cfg.pkg_manager = Some(PackageBackend::from_id(v).ok_or_else(|| {
                        Error::precondition(format!("unsupported package manager '{v}'"))
                    })?);
                }
                _ => {}
            }
        }
        Ok(cfg)
    }

    /// # Errors
    ///
    /// Same as [`from_vars`](Self::from_vars). Non-UTF-8 variables are skipped.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars_os().filter_map(|(k, v)| {
            Some((k.into_string().ok()?, v.into_string().ok()?))
        }))
    }

    /// Positional account argument; wins over `GROUNDWORK_USER`.
    #[must_use]
    pub fn with_account(mut self, account: Option<String>) -> Self {
        if let Some(a) = account.filter(|a| !a.is_empty()) {
            self.target_user = Some(a);
        }
        self
    }

    #[must_use]
    pub const fn pip_flags(&self) -> PipFlags {
        PipFlags {
            upgrade: self.upgrade,
            prerelease: self.prerelease,
            force_reinstall: self.force_reinstall,
        }
    }

    /// The forced backend, or the first one whose tool is on `path`.
    ///
    /// # Errors
    ///
    /// Returns `PreconditionFailed` when nothing supported is found.
    pub fn backend(&self, path: Option<&OsStr>) -> Result<PackageBackend> {
        if let Some(b) = self.pkg_manager {
            return Ok(b);
        }
        PackageBackend::detect(path).ok_or_else(|| {
            Error::precondition("no supported package manager (apt-get, dnf, pacman) on PATH")
        })
    }
}

fn absolute(key: &str, v: &str) -> Result<PathBuf> {
    let p = PathBuf::from(v);
    if p.is_absolute() {
        Ok(p)
    } else {
        Err(Error::new(
            ErrorKind::InvalidPath,
            format!("{ENV_PREFIX}{key} must be absolute, got '{v}'"),
        ))
    }
}
