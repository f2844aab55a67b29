//! Process spawning seam.
//!
//! Every external collaborator (package manager, service manager, venv tool, account
//! database) is reached by running a fixed command line through a [`CommandRunner`].
//! Production uses [`SystemRunner`]; tests substitute an in-memory host model.
use std::fmt;
use std::process::Command;

use crate::types::errors::{Error, ErrorKind, Result};

/// A program plus arguments and extra environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for a in &self.args {
            write!(f, " {a}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    #[must_use]
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    #[must_use]
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    #[must_use]
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

pub trait CommandRunner: Send + Sync {
    /// Run `cmd` to completion.
    /// # Errors
    /// Returns an IO error only when the process could not be spawned.
    fn run(&self, cmd: &CommandLine) -> std::io::Result<CommandOutput>;
}

/// Runs commands on the real host with a C locale.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &CommandLine) -> std::io::Result<CommandOutput> {
        let out = Command::new(&cmd.program)
            .args(&cmd.args)
            .env("LC_ALL", "C")
            .envs(cmd.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .output()?;
        Ok(CommandOutput {
            code: out.status.code(),
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
        })
    }
}

/// Spawn `cmd`, mapping a spawn failure to `PreconditionFailed` (the tool is missing).
///
/// # Errors
///
/// Returns `PreconditionFailed` when the program cannot be started.
pub fn spawn(runner: &dyn CommandRunner, cmd: &CommandLine) -> Result<CommandOutput> {
    runner
        .run(cmd)
        .map_err(|e| Error::precondition(format!("cannot run `{}`: {e}", cmd.program)))
}

/// Spawn `cmd` and require exit code 0.
///
/// # Errors
///
/// Returns `PreconditionFailed` when the program cannot be started and `ApplyFailed` when
/// it exits non-zero.
pub fn run_checked(runner: &dyn CommandRunner, cmd: &CommandLine) -> Result<CommandOutput> {
    let out = spawn(runner, cmd)?;
    if out.success() {
        return Ok(out);
    }
    Err(Error::new(ErrorKind::ApplyFailed, failure_message(cmd, &out)))
}

pub(crate) fn failure_message(cmd: &CommandLine, out: &CommandOutput) -> String {
    let status = out
        .code
        .map_or_else(|| "a signal".to_string(), |c| format!("status {c}"));
    let stderr = out.stderr.trim();
    if stderr.is_empty() {
        format!("`{cmd}` exited with {status}")
    } else {
        format!("`{cmd}` exited with {status}: {stderr}")
    }
}
