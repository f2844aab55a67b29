//! Python virtual environments and the application package installed into them.
use std::fs;
use std::path::{Path, PathBuf};

use super::{with_retries, Applied, Step, StepCtx, StepMeta};
use crate::adapters::venv::{PipFlags, VenvTool};
use crate::fs::meta::{kind_of, NodeKind};
use crate::types::errors::{Error, Result};
use crate::types::{RepairPolicy, SafePath, SatisfiedState};

/// A runnable virtual environment at `path`.
///
/// `Broken` when the directory exists but the interpreter is missing, does not start,
/// or reports a different prefix; the whole tree is removed before recreating it.
#[derive(Clone, Debug)]
pub struct EnsureVenv {
    pub(crate) meta: StepMeta,
    path: SafePath,
    tool: VenvTool,
}

impl EnsureVenv {
    pub fn new(name: impl Into<String>, path: SafePath) -> Self {
        Self {
            meta: StepMeta::new(name),
            path,
            tool: VenvTool::default(),
        }
    }

    #[must_use]
    pub fn with_tool(mut self, tool: VenvTool) -> Self {
        self.tool = tool;
        self
    }
}

fn same_prefix(reported: &str, venv: &Path) -> bool {
    let reported = PathBuf::from(reported);
    reported == venv || fs::canonicalize(venv).is_ok_and(|c| c == reported)
}

impl Step for EnsureVenv {
    fn meta(&self) -> &StepMeta {
        &self.meta
    }

    fn kind(&self) -> &'static str {
        "venv"
    }

    fn repair_policy(&self) -> RepairPolicy {
        RepairPolicy::RecreateIfBroken
    }

    fn probe(&self, ctx: &StepCtx<'_>) -> Result<SatisfiedState> {
        let venv = self.path.as_path();
        match kind_of(&venv) {
            NodeKind::Missing => return Ok(SatisfiedState::Missing),
            NodeKind::Dir => {}
            _ => return Ok(SatisfiedState::Broken),
        }
        if kind_of(&VenvTool::interpreter(&venv)) == NodeKind::Missing {
            return Ok(SatisfiedState::Broken);
        }
        Ok(match self.tool.smoke(ctx.runner, &venv)? {
            Some(prefix) if same_prefix(&prefix, &venv) => SatisfiedState::Satisfied,
            _ => SatisfiedState::Broken,
        })
    }

    fn repair(&self, _ctx: &StepCtx<'_>) -> Result<()> {
        let venv = self.path.as_path();
        let res = match kind_of(&venv) {
            NodeKind::Missing => Ok(()),
            NodeKind::Dir => fs::remove_dir_all(&venv),
            _ => fs::remove_file(&venv),
        };
        res.map_err(|e| Error::io("remove broken venv", &venv, &e))
    }

    fn apply(&self, ctx: &StepCtx<'_>) -> Result<Applied> {
        let venv = self.path.as_path();
        self.tool.create(ctx.runner, &venv)?;
        let ((), attempts) =
            with_retries(&ctx.policy.retry, || self.tool.upgrade_bootstrap(ctx.runner, &venv))?;
        let mut applied = Applied::changed().with_detail(format!("created {}", venv.display()));
        if attempts > 1 {
            applied
                .warnings
                .push(format!("bootstrap upgrade needed {attempts} attempts"));
        }
        Ok(applied)
    }
}

/// The distribution name of a requirement such as `motioneye>=0.43` or `pkg[extra]`.
fn dist_name(requirement: &str) -> &str {
    let end = requirement
        .find(|c: char| matches!(c, '<' | '>' | '=' | '!' | '~' | '[' | ';' | ' ' | '@'))
        .unwrap_or(requirement.len());
    &requirement[..end]
}

/// An application package installed into a venv.
///
/// Upgrade or force-reinstall flags make the step reapply on every run.
#[derive(Clone, Debug)]
pub struct PythonPackage {
    pub(crate) meta: StepMeta,
    venv: SafePath,
    requirement: String,
    flags: PipFlags,
    tool: VenvTool,
}

impl PythonPackage {
    pub fn new(name: impl Into<String>, venv: SafePath, requirement: impl Into<String>, flags: PipFlags) -> Self {
        Self {
            meta: StepMeta::new(name),
            venv,
            requirement: requirement.into(),
            flags,
            tool: VenvTool::default(),
        }
    }
}

impl Step for PythonPackage {
    fn meta(&self) -> &StepMeta {
        &self.meta
    }

    fn kind(&self) -> &'static str {
        "python_package"
    }

    fn repair_policy(&self) -> RepairPolicy {
        if self.flags.upgrade || self.flags.force_reinstall {
            RepairPolicy::AlwaysReapply
        } else {
            RepairPolicy::SkipIfSatisfied
        }
    }

    fn probe(&self, ctx: &StepCtx<'_>) -> Result<SatisfiedState> {
        let venv = self.venv.as_path();
        if kind_of(&VenvTool::interpreter(&venv)) == NodeKind::Missing {
            return Ok(SatisfiedState::Missing);
        }
        Ok(if self.tool.pip_show(ctx.runner, &venv, dist_name(&self.requirement))? {
            SatisfiedState::Satisfied
        } else {
            SatisfiedState::Missing
        })
    }

    fn apply(&self, ctx: &StepCtx<'_>) -> Result<Applied> {
        let venv = self.venv.as_path();
        let ((), attempts) = with_retries(&ctx.policy.retry, || {
            self.tool.pip_install(ctx.runner, &venv, &self.requirement, self.flags)
        })?;
        let mut applied = Applied::changed().with_detail(format!("pip install {}", self.requirement));
        if attempts > 1 {
            applied
                .warnings
                .push(format!("pip install needed {attempts} attempts"));
        }
        Ok(applied)
    }
}
