//! Service manager (`systemctl`) operations.
use std::thread;
use std::time::{Duration, Instant};

use super::command::{run_checked, spawn, CommandLine, CommandRunner};
use crate::types::errors::{Error, ErrorKind, Result};

/// Thin wrapper over the `systemctl` command line.
#[derive(Clone, Copy, Debug, Default)]
pub struct Systemctl;

impl Systemctl {
    fn cmd(verb: &str, unit: Option<&str>) -> CommandLine {
        let c = CommandLine::new("systemctl").arg(verb);
        match unit {
            Some(u) => c.arg(u),
            None => c,
        }
    }

    /// Reload unit definitions.
    ///
    /// # Errors
    ///
    /// Returns `ApplyFailed` when `systemctl` reports failure.
    pub fn daemon_reload(&self, runner: &dyn CommandRunner) -> Result<()> {
        run_checked(runner, &Self::cmd("daemon-reload", None)).map(|_| ())
    }

    /// # Errors
    ///
    /// Returns `ApplyFailed` when `systemctl` reports failure.
    pub fn enable(&self, runner: &dyn CommandRunner, unit: &str) -> Result<()> {
        run_checked(runner, &Self::cmd("enable", Some(unit))).map(|_| ())
    }

    /// # Errors
    ///
    /// Returns `ApplyFailed` when `systemctl` reports failure.
    pub fn restart(&self, runner: &dyn CommandRunner, unit: &str) -> Result<()> {
        run_checked(runner, &Self::cmd("restart", Some(unit))).map(|_| ())
    }

    /// # Errors
    ///
    /// Returns `ApplyFailed` when `systemctl` reports failure.
    pub fn stop(&self, runner: &dyn CommandRunner, unit: &str) -> Result<()> {
        run_checked(runner, &Self::cmd("stop", Some(unit))).map(|_| ())
    }

    /// # Errors
    ///
    /// Returns `PreconditionFailed` when `systemctl` cannot be started.
    pub fn is_active(&self, runner: &dyn CommandRunner, unit: &str) -> Result<bool> {
        let out = spawn(runner, &Self::cmd("is-active", Some(unit)))?;
        Ok(out.success() && out.stdout.trim() == "active")
    }

    /// # Errors
    ///
    /// Returns `PreconditionFailed` when `systemctl` cannot be started.
    pub fn is_enabled(&self, runner: &dyn CommandRunner, unit: &str) -> Result<bool> {
        let out = spawn(runner, &Self::cmd("is-enabled", Some(unit)))?;
        Ok(out.success() && out.stdout.trim() == "enabled")
    }

    /// Poll `is-active` until it reports active or `wait` elapses.
    ///
    /// # Errors
    ///
    /// Returns `HealthCheckFailed` when the unit is not active in time.
    pub fn wait_active(
        &self,
        runner: &dyn CommandRunner,
        unit: &str,
        wait: Duration,
        poll: Duration,
    ) -> Result<Duration> {
        let t0 = Instant::now();
        loop {
            if self.is_active(runner, unit)? {
                return Ok(t0.elapsed());
            }
            if t0.elapsed() >= wait {
                return Err(Error::new(
                    ErrorKind::HealthCheckFailed,
                    format!("{unit} not active after {} ms", wait.as_millis()),
                ));
            }
            thread::sleep(poll);
        }
    }
}
