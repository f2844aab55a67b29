//! Python virtual-environment tool: create, smoke-test, bootstrap and install into.
use std::path::{Path, PathBuf};

use super::command::{run_checked, spawn, CommandLine, CommandRunner};
use crate::constants::VENV_BOOTSTRAP;
use crate::types::errors::Result;

/// Flags for installing the application package.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipFlags {
    pub upgrade: bool,
    pub prerelease: bool,
    pub force_reinstall: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VenvTool {
    /// Interpreter used to create environments, e.g. `python3`.
    pub python: String,
}

impl Default for VenvTool {
    fn default() -> Self {
        Self {
            python: "python3".to_string(),
        }
    }
}

impl VenvTool {
    #[must_use]
    pub fn interpreter(venv: &Path) -> PathBuf {
        venv.join("bin").join("python")
    }

    fn in_venv(venv: &Path) -> CommandLine {
        CommandLine::new(Self::interpreter(venv).display().to_string())
    }

    /// # Errors
    ///
    /// Returns `ApplyFailed` when the interpreter fails to create the environment.
    pub fn create(&self, runner: &dyn CommandRunner, venv: &Path) -> Result<()> {
        let cmd = CommandLine::new(self.python.as_str())
            .args(["-m", "venv"])
            .arg(venv.display().to_string());
        run_checked(runner, &cmd).map(|_| ())
    }

    /// Run the environment's interpreter, import its path-resolution module and report
    /// `sys.prefix`. `Ok(None)` means the interpreter is there but does not work.
    ///
    /// # Errors
    ///
    /// Never fails on a broken interpreter; spawn failures are folded into `Ok(None)`.
    pub fn smoke(&self, runner: &dyn CommandRunner, venv: &Path) -> Result<Option<String>> {
        let cmd = Self::in_venv(venv).args(["-c", "import site, sys; print(sys.prefix)"]);
        match runner.run(&cmd) {
            Ok(out) if out.success() => Ok(Some(out.stdout.trim().to_string())),
            _ => Ok(None),
        }
    }

    /// # Errors
    ///
    /// Returns `ApplyFailed` when pip fails.
    pub fn upgrade_bootstrap(&self, runner: &dyn CommandRunner, venv: &Path) -> Result<()> {
        let cmd = Self::in_venv(venv)
            .args(["-m", "pip", "install", "--upgrade", "--quiet"])
            .args(VENV_BOOTSTRAP.iter().copied());
        run_checked(runner, &cmd).map(|_| ())
    }

    /// # Errors
    ///
    /// Returns `PreconditionFailed` when the interpreter cannot be started.
    pub fn pip_show(&self, runner: &dyn CommandRunner, venv: &Path, pkg: &str) -> Result<bool> {
        let cmd = Self::in_venv(venv).args(["-m", "pip", "show", "--quiet", pkg]);
        Ok(spawn(runner, &cmd)?.success())
    }

    #[must_use]
    pub fn pip_install_cmd(venv: &Path, requirement: &str, flags: PipFlags) -> CommandLine {
        let mut cmd = Self::in_venv(venv).args(["-m", "pip", "install", "--quiet"]);
        if flags.upgrade {
            cmd = cmd.arg("--upgrade");
        }
        if flags.prerelease {
            cmd = cmd.arg("--pre");
        }
        if flags.force_reinstall {
            cmd = cmd.arg("--force-reinstall");
        }
        cmd.arg(requirement)
    }

    /// # Errors
    ///
    /// Returns `ApplyFailed` when pip fails.
    pub fn pip_install(
        &self,
        runner: &dyn CommandRunner,
        venv: &Path,
        requirement: &str,
        flags: PipFlags,
    ) -> Result<()> {
        run_checked(runner, &Self::pip_install_cmd(venv, requirement, flags)).map(|_| ())
    }
}
