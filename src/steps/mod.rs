//! The `Step` abstraction and the concrete step library.
//!
//! A step pairs a side-effect-free probe with a mutating action. The runner
//! (`api::apply`) decides from the probed [`SatisfiedState`] and the step's
//! [`RepairPolicy`] whether to skip, repair, apply, and then verifies.
use std::thread;

use crate::adapters::accounts::{lookup_group, lookup_user, resolve_owner};
use crate::adapters::CommandRunner;
use crate::policy::types::Retry;
use crate::policy::Policy;
use crate::types::errors::{ErrorKind, Result};
use crate::types::{RepairPolicy, SatisfiedState};

pub mod account;
pub mod custom;
pub mod dir;
pub mod file;
pub mod link;
pub mod ownership;
pub mod packages;
pub mod service;
pub mod venv;

pub use account::EnsureUser;
pub use custom::FnStep;
pub use dir::EnsureDir;
pub use file::EnsureFile;
pub use link::EnsureLink;
pub use ownership::EnsureOwnership;
pub use packages::{OptionalPackages, RefreshIndex, RequiredPackages};
pub use service::{ServiceUnit, UnitSpec};
pub use venv::{EnsureVenv, PythonPackage};

/// Everything a step may touch while probing or applying.
#[derive(Clone, Copy)]
pub struct StepCtx<'a> {
    pub runner: &'a dyn CommandRunner,
    pub policy: &'a Policy,
}

/// Result of a successful `apply`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Applied {
    pub warnings: Vec<String>,
    /// Short human note recorded in the log entry (e.g. a backup path).
    pub detail: Option<String>,
    /// The action degraded to a no-op; nothing on the host changed.
    pub noop: bool,
}

impl Applied {
    #[must_use]
    pub fn changed() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn noop(warnings: Vec<String>) -> Self {
        Self {
            warnings,
            detail: None,
            noop: true,
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Name, declared dependencies and optionality shared by every step.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StepMeta {
    pub name: String,
    pub deps: Vec<String>,
    pub optional: bool,
}

impl StepMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

pub trait Step: Send + Sync {
    fn meta(&self) -> &StepMeta;

    /// Stable kind label used in facts, e.g. `"file"` or `"venv"`.
    fn kind(&self) -> &'static str;

    fn name(&self) -> &str {
        &self.meta().name
    }

    /// Names of earlier steps this one relies on. Informational; ordering is authored.
    fn depends_on(&self) -> &[String] {
        &self.meta().deps
    }

    /// Optional steps that fail are recorded as warnings and the run continues.
    fn optional(&self) -> bool {
        self.meta().optional
    }

    fn repair_policy(&self) -> RepairPolicy {
        RepairPolicy::SkipIfSatisfied
    }

    /// Inspect the live host. Must not mutate anything.
    ///
    /// # Errors
    ///
    /// Returns an error only when the host cannot be inspected at all.
    fn probe(&self, ctx: &StepCtx<'_>) -> Result<SatisfiedState>;

    /// Tear down a `Broken` artifact completely so it can be recreated.
    ///
    /// # Errors
    ///
    /// Returns an error when the artifact cannot be removed.
    fn repair(&self, _ctx: &StepCtx<'_>) -> Result<()> {
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the kind matching the failure (`ApplyFailed`, `PackageUnavailable`, ...).
    fn apply(&self, ctx: &StepCtx<'_>) -> Result<Applied>;

    /// State observed after a successful apply. Defaults to [`probe`](Self::probe).
    ///
    /// # Errors
    ///
    /// Same as [`probe`](Self::probe).
    fn verify(&self, ctx: &StepCtx<'_>) -> Result<SatisfiedState> {
        self.probe(ctx)
    }
}

/// Builder methods available on every concrete step.
pub trait Declare: Sized {
    fn meta_mut(&mut self) -> &mut StepMeta;

    /// Declare a dependency on an earlier step.
    #[must_use]
    fn after(mut self, dep: impl Into<String>) -> Self {
        self.meta_mut().deps.push(dep.into());
        self
    }

    #[must_use]
    fn as_optional(mut self) -> Self {
        self.meta_mut().optional = true;
        self
    }
}

macro_rules! declare_step {
    ($($t:ty),* $(,)?) => {
        $(impl $crate::steps::Declare for $t {
            fn meta_mut(&mut self) -> &mut $crate::steps::StepMeta {
                &mut self.meta
            }
        })*
    };
}

declare_step!(
    EnsureUser,
    FnStep,
    EnsureDir,
    EnsureFile,
    EnsureLink,
    EnsureOwnership,
    OptionalPackages,
    RefreshIndex,
    RequiredPackages,
    ServiceUnit,
    EnsureVenv,
    PythonPackage,
);

/// Desired owner of a path, by name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Owner {
    pub user: String,
    /// Defaults to the user's primary group.
    pub group: Option<String>,
}

impl Owner {
    pub fn user(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            group: None,
        }
    }

    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Numeric ids, or `None` while the account or group does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `PreconditionFailed` when the account database cannot be queried.
    pub fn lookup(&self, runner: &dyn CommandRunner) -> Result<Option<(u32, u32)>> {
        let Some(acct) = lookup_user(runner, &self.user)? else {
            return Ok(None);
        };
        let gid = match &self.group {
            Some(g) => match lookup_group(runner, g)? {
                Some(gid) => gid,
                None => return Ok(None),
            },
            None => acct.gid,
        };
        Ok(Some((acct.uid, gid)))
    }

    /// # Errors
    ///
    /// Returns `PreconditionFailed` when the account or group does not exist.
    pub fn resolve(&self, runner: &dyn CommandRunner) -> Result<(u32, u32)> {
        resolve_owner(runner, &self.user, self.group.as_deref())
    }
}

/// Run `f` up to `retry.attempts` times while it fails with `ApplyFailed`.
/// Returns the value and the number of attempts used.
pub(crate) fn with_retries<T>(retry: &Retry, mut f: impl FnMut() -> Result<T>) -> Result<(T, u32)> {
    let attempts = retry.attempts.max(1);
    let mut attempt = 1;
    loop {
        match f() {
            Ok(v) => return Ok((v, attempt)),
            Err(e) if e.kind == ErrorKind::ApplyFailed && attempt < attempts => {
                attempt += 1;
                thread::sleep(retry.delay);
            }
            Err(mut e) if attempt > 1 => {
                e.msg = format!("{} (after {attempt} attempts)", e.msg);
                return Err(e);
            }
            Err(e) => return Err(e),
        }
    }
}
