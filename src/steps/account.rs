//! Service accounts.
use super::{Applied, Step, StepCtx, StepMeta};
use crate::adapters::accounts::{groups_of, lookup_group, lookup_user, useradd_cmd, usermod_groups_cmd, UserSpec};
use crate::adapters::command::run_checked;
use crate::adapters::CommandRunner;
use crate::types::errors::Result;
use crate::types::SatisfiedState;

/// Ensure an account exists and belongs to the requested supplementary groups.
///
/// Groups absent from the host are ignored with a warning rather than failing the step.
#[derive(Clone, Debug)]
pub struct EnsureUser {
    pub(crate) meta: StepMeta,
    spec: UserSpec,
}

impl EnsureUser {
    pub fn new(name: impl Into<String>, spec: UserSpec) -> Self {
        Self {
            meta: StepMeta::new(name),
            spec,
        }
    }

    /// Requested groups split into (present on host, absent from host).
    fn partition_groups(&self, runner: &dyn CommandRunner) -> Result<(Vec<String>, Vec<String>)> {
        let mut present = Vec::new();
        let mut absent = Vec::new();
        for g in &self.spec.groups {
            if lookup_group(runner, g)?.is_some() {
                present.push(g.clone());
            } else {
                absent.push(g.clone());
            }
        }
        Ok((present, absent))
    }

    fn missing_groups(&self, runner: &dyn CommandRunner, present: &[String]) -> Result<Vec<String>> {
        let current = groups_of(runner, &self.spec.name)?;
        Ok(present
            .iter()
            .filter(|g| !current.contains(g))
            .cloned()
            .collect())
    }
}

impl Step for EnsureUser {
    fn meta(&self) -> &StepMeta {
        &self.meta
    }

    fn kind(&self) -> &'static str {
        "user"
    }

    fn probe(&self, ctx: &StepCtx<'_>) -> Result<SatisfiedState> {
        if lookup_user(ctx.runner, &self.spec.name)?.is_none() {
            return Ok(SatisfiedState::Missing);
        }
        let (present, _) = self.partition_groups(ctx.runner)?;
        if self.missing_groups(ctx.runner, &present)?.is_empty() {
            Ok(SatisfiedState::Satisfied)
        } else {
            Ok(SatisfiedState::Broken)
        }
    }

    fn apply(&self, ctx: &StepCtx<'_>) -> Result<Applied> {
        let (present, absent) = self.partition_groups(ctx.runner)?;
        let mut applied = Applied::changed();
        if !absent.is_empty() {
            applied
                .warnings
                .push(format!("groups not present on host, skipped: {}", absent.join(", ")));
        }
        if lookup_user(ctx.runner, &self.spec.name)?.is_none() {
            let spec = UserSpec {
                groups: present,
                ..self.spec.clone()
            };
            run_checked(ctx.runner, &useradd_cmd(&spec))?;
            return Ok(applied.with_detail(format!("created account {}", self.spec.name)));
        }
        let missing = self.missing_groups(ctx.runner, &present)?;
        if !missing.is_empty() {
            run_checked(ctx.runner, &usermod_groups_cmd(&self.spec.name, &missing))?;
        }
        Ok(applied.with_detail(format!("added {} to {}", self.spec.name, missing.join(","))))
    }
}
