//! Package manager capability table.
//!
//! Each supported package manager is a variant of [`PackageBackend`]; the four primitive
//! operations (`is_available`, `install`, `install_optional`, `refresh_index`) dispatch on
//! the variant instead of comparing tool names at call sites.
use std::ffi::OsStr;

use serde::{Deserialize, Serialize};

use super::command::{failure_message, run_checked, spawn, CommandLine, CommandRunner};
use crate::preflight::checks::which_on_path;
use crate::types::errors::{Error, ErrorKind, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageBackend {
    Apt,
    Dnf,
    Pacman,
}

/// Outcome of a best-effort install of optional packages.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OptionalInstall {
    pub installed: Vec<String>,
    pub unavailable: Vec<String>,
    pub warnings: Vec<String>,
}

impl PackageBackend {
    pub const ALL: [PackageBackend; 3] = [PackageBackend::Apt, PackageBackend::Dnf, PackageBackend::Pacman];

    #[must_use]
    pub const fn id(&self) -> &'static str {
        match self {
            PackageBackend::Apt => "apt",
            PackageBackend::Dnf => "dnf",
            PackageBackend::Pacman => "pacman",
        }
    }

    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.id() == id.trim().to_ascii_lowercase())
    }

    /// Binary whose presence on `PATH` identifies this backend.
    #[must_use]
    pub const fn probe_tool(&self) -> &'static str {
        match self {
            PackageBackend::Apt => "apt-get",
            PackageBackend::Dnf => "dnf",
            PackageBackend::Pacman => "pacman",
        }
    }

    /// Detect the host package manager from a `PATH`-style search list.
    #[must_use]
    pub fn detect(path: Option<&OsStr>) -> Option<Self> {
        let path = path?;
        Self::ALL
            .into_iter()
            .find(|b| which_on_path(path, b.probe_tool()).is_some())
    }

    fn installed_query(&self, pkg: &str) -> CommandLine {
        match self {
            PackageBackend::Apt => {
                CommandLine::new("dpkg-query").args(["-W", "-f=${Status}", pkg])
            }
            PackageBackend::Dnf => CommandLine::new("rpm").args(["-q", pkg]),
            PackageBackend::Pacman => CommandLine::new("pacman").args(["-Q", pkg]),
        }
    }

    fn available_query(&self, pkg: &str) -> CommandLine {
        match self {
            PackageBackend::Apt => {
                CommandLine::new("apt-cache").args(["show", "--no-all-versions", pkg])
            }
            PackageBackend::Dnf => CommandLine::new("dnf").args(["-q", "info", pkg]),
            PackageBackend::Pacman => CommandLine::new("pacman").args(["-Si", pkg]),
        }
    }

    fn refresh_cmd(&self) -> CommandLine {
        match self {
            PackageBackend::Apt => CommandLine::new("apt-get")
                .args(["update", "-q"])
                .env("DEBIAN_FRONTEND", "noninteractive"),
            PackageBackend::Dnf => CommandLine::new("dnf").args(["-q", "makecache"]),
            PackageBackend::Pacman => CommandLine::new("pacman").args(["-Sy", "--noconfirm"]),
        }
    }

    fn install_cmd(&self, pkgs: &[String]) -> CommandLine {
        let base = match self {
            PackageBackend::Apt => CommandLine::new("apt-get")
                .args(["install", "-y", "--no-install-recommends"])
                .env("DEBIAN_FRONTEND", "noninteractive"),
            PackageBackend::Dnf => CommandLine::new("dnf").args(["install", "-y"]),
            PackageBackend::Pacman => {
                CommandLine::new("pacman").args(["-S", "--noconfirm", "--needed"])
            }
        };
        base.args(pkgs.iter().cloned())
    }

    /// Whether `pkg` is installed right now.
    ///
    /// # Errors
    ///
    /// Returns `PreconditionFailed` when the query tool cannot be started.
    pub fn is_installed(&self, runner: &dyn CommandRunner, pkg: &str) -> Result<bool> {
        let out = spawn(runner, &self.installed_query(pkg))?;
        Ok(match self {
            PackageBackend::Apt => out.success() && out.stdout.contains("install ok installed"),
            PackageBackend::Dnf | PackageBackend::Pacman => out.success(),
        })
    }

    /// Whether `pkg` resolves to an installable candidate.
    ///
    /// # Errors
    ///
    /// Returns `PreconditionFailed` when the query tool cannot be started.
    pub fn is_available(&self, runner: &dyn CommandRunner, pkg: &str) -> Result<bool> {
        let out = spawn(runner, &self.available_query(pkg))?;
        Ok(out.success() && !out.stdout.trim().is_empty())
    }

    /// Refresh the package index.
    ///
    /// # Errors
    ///
    /// Returns `ApplyFailed` when the package manager reports failure.
    pub fn refresh_index(&self, runner: &dyn CommandRunner) -> Result<()> {
        run_checked(runner, &self.refresh_cmd()).map(|_| ())
    }

    /// Install mandatory packages; any unavailable package fails the call before installing.
    ///
    /// # Errors
    ///
    /// Returns `PackageUnavailable` naming every unresolvable package, or `ApplyFailed` when
    /// the install itself fails.
    pub fn install(&self, runner: &dyn CommandRunner, pkgs: &[String]) -> Result<()> {
        if pkgs.is_empty() {
            return Ok(());
        }
        let mut missing = Vec::new();
        for p in pkgs {
            if !self.is_available(runner, p)? {
                missing.push(p.as_str());
            }
        }
        if !missing.is_empty() {
            return Err(Error::new(
                ErrorKind::PackageUnavailable,
                format!("package unavailable via {}: {}", self.id(), missing.join(", ")),
            ));
        }
        run_checked(runner, &self.install_cmd(pkgs)).map(|_| ())
    }

    /// Install whichever of `pkgs` are available; never fails on availability.
    ///
    /// When nothing is available the call is a no-op carrying a warning. A failing install
    /// of the available subset is also reported as a warning.
    ///
    /// # Errors
    ///
    /// Returns `PreconditionFailed` only when the query tool cannot be started.
    pub fn install_optional(
        &self,
        runner: &dyn CommandRunner,
        pkgs: &[String],
    ) -> Result<OptionalInstall> {
        let mut out = OptionalInstall::default();
        let mut wanted = Vec::new();
        for p in pkgs {
            if self.is_available(runner, p)? {
                wanted.push(p.clone());
            } else {
                out.unavailable.push(p.clone());
            }
        }
        if !out.unavailable.is_empty() {
            out.warnings.push(format!(
                "optional packages unavailable, skipped: {}",
                out.unavailable.join(", ")
            ));
        }
        if wanted.is_empty() {
            if !pkgs.is_empty() {
                out.warnings
                    .push("no optional packages available; nothing installed".to_string());
            }
            return Ok(out);
        }
        let cmd = self.install_cmd(&wanted);
        let res = spawn(runner, &cmd)?;
        if res.success() {
            out.installed = wanted;
        } else {
            out.warnings.push(format!(
                "optional install failed: {}",
                failure_message(&cmd, &res)
            ));
        }
        Ok(out)
    }
}
