//! Steps assembled from closures.
use super::{Applied, Step, StepCtx, StepMeta};
use crate::types::errors::Result;
use crate::types::{RepairPolicy, SatisfiedState};

type ProbeFn = Box<dyn Fn(&StepCtx<'_>) -> Result<SatisfiedState> + Send + Sync>;
type ApplyFn = Box<dyn Fn(&StepCtx<'_>) -> Result<Applied> + Send + Sync>;
type RepairFn = Box<dyn Fn(&StepCtx<'_>) -> Result<()> + Send + Sync>;

/// A step whose probe, apply and optional repair are plain closures.
pub struct FnStep {
    pub(crate) meta: StepMeta,
    policy: RepairPolicy,
    probe: ProbeFn,
    apply: ApplyFn,
    repair: Option<RepairFn>,
}

impl FnStep {
    pub fn new(
        name: impl Into<String>,
        probe: impl Fn(&StepCtx<'_>) -> Result<SatisfiedState> + Send + Sync + 'static,
        apply: impl Fn(&StepCtx<'_>) -> Result<Applied> + Send + Sync + 'static,
    ) -> Self {
        Self {
            meta: StepMeta::new(name),
            policy: RepairPolicy::SkipIfSatisfied,
            probe: Box::new(probe),
            apply: Box::new(apply),
            repair: None,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: RepairPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_repair(
        mut self,
        repair: impl Fn(&StepCtx<'_>) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.repair = Some(Box::new(repair));
        self
    }
}

impl Step for FnStep {
    fn meta(&self) -> &StepMeta {
        &self.meta
    }

    fn kind(&self) -> &'static str {
        "custom"
    }

    fn repair_policy(&self) -> RepairPolicy {
        self.policy
    }

    fn probe(&self, ctx: &StepCtx<'_>) -> Result<SatisfiedState> {
        (self.probe)(ctx)
    }

    fn repair(&self, ctx: &StepCtx<'_>) -> Result<()> {
        match &self.repair {
            Some(r) => r(ctx),
            None => Ok(()),
        }
    }

    fn apply(&self, ctx: &StepCtx<'_>) -> Result<Applied> {
        (self.apply)(ctx)
    }
}

impl std::fmt::Debug for FnStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStep")
            .field("meta", &self.meta)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
