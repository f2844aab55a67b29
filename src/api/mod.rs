// Facade for API module; delegates to submodules under src/api/

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::adapters::{CommandRunner, LockManager, SystemRunner};
use crate::logging::{AuditSink, FactsEmitter};
use crate::policy::Policy;
use crate::steps::{Step, StepCtx};
use crate::types::{ApplyMode, ApplyReport, Plan, PreflightReport};

mod apply;
pub mod errors;
mod plan;
mod preflight;

pub struct Groundwork<E: FactsEmitter, A: AuditSink> {
    facts: E,
    audit: A,
    policy: Policy,
    runner: Box<dyn CommandRunner>,
    lock: Option<Box<dyn LockManager>>, // None in dev/test; required in production
    root: PathBuf,
    search_path: Option<OsString>,
}

impl<E: FactsEmitter, A: AuditSink> Groundwork<E, A> {
    pub fn new(facts: E, audit: A, policy: Policy) -> Self {
        Self {
            facts,
            audit,
            policy,
            runner: Box::new(SystemRunner),
            lock: None,
            root: PathBuf::from("/"),
            search_path: std::env::var_os("PATH"),
        }
    }

    /// Replace the process-spawning seam (tests use an in-memory host).
    #[must_use]
    pub fn with_runner(mut self, runner: Box<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    #[must_use]
    pub fn with_lock_manager(mut self, lock: Box<dyn LockManager>) -> Self {
        self.lock = Some(lock);
        self
    }

    /// Install root checked for writability by preflight.
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// `PATH`-style list searched for `policy.preconditions.required_tools`.
    #[must_use]
    pub fn with_search_path(mut self, path: impl Into<OsString>) -> Self {
        self.search_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub(crate) fn step_ctx(&self) -> StepCtx<'_> {
        StepCtx {
            runner: self.runner.as_ref(),
            policy: &self.policy,
        }
    }

    /// Validate authored step order and emit one `plan` fact per step.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidPlan` on duplicate names or unsatisfied dependencies.
    pub fn plan(&self, steps: Vec<Box<dyn Step>>) -> Result<Plan, errors::ApiError> {
        plan::build(self, steps)
    }

    /// # Errors
    ///
    /// Currently infallible; stops are reported inside the returned report.
    pub fn preflight(&self, plan: &Plan) -> Result<PreflightReport, errors::ApiError> {
        Ok(preflight::run(self, plan))
    }

    /// Run the plan. Step failures are reported in [`ApplyReport::failure`], not as `Err`.
    ///
    /// # Errors
    ///
    /// Currently infallible; kept fallible for facade stability.
    pub fn apply(&self, plan: &Plan, mode: ApplyMode) -> Result<ApplyReport, errors::ApiError> {
        Ok(apply::run(self, plan, mode))
    }
}
