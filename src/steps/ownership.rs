//! Recursive ownership of an install tree.
use super::{Applied, Owner, Step, StepCtx, StepMeta};
use crate::fs::meta::{kind_of, NodeKind};
use crate::fs::perms::{chown_tree, count_foreign_owned};
use crate::types::errors::{Error, Result};
use crate::types::{SafePath, SatisfiedState};

#[derive(Clone, Debug)]
pub struct EnsureOwnership {
    pub(crate) meta: StepMeta,
    root: SafePath,
    owner: Owner,
}

impl EnsureOwnership {
    pub fn new(name: impl Into<String>, root: SafePath, owner: Owner) -> Self {
        Self {
            meta: StepMeta::new(name),
            root,
            owner,
        }
    }
}

impl Step for EnsureOwnership {
    fn meta(&self) -> &StepMeta {
        &self.meta
    }

    fn kind(&self) -> &'static str {
        "ownership"
    }

    fn probe(&self, ctx: &StepCtx<'_>) -> Result<SatisfiedState> {
        let p = self.root.as_path();
        if kind_of(&p) == NodeKind::Missing {
            return Ok(SatisfiedState::Missing);
        }
        let Some((uid, gid)) = self.owner.lookup(ctx.runner)? else {
            return Ok(SatisfiedState::Broken);
        };
        let foreign = count_foreign_owned(&p, uid, gid).map_err(|e| Error::io("scan", &p, &e))?;
        Ok(if foreign == 0 {
            SatisfiedState::Satisfied
        } else {
            SatisfiedState::Broken
        })
    }

    fn apply(&self, ctx: &StepCtx<'_>) -> Result<Applied> {
        let p = self.root.as_path();
        if kind_of(&p) == NodeKind::Missing {
            return Err(Error::precondition(format!("{} does not exist", p.display())));
        }
        let (uid, gid) = self.owner.resolve(ctx.runner)?;
        let changed = chown_tree(&p, uid, gid).map_err(|e| Error::io("chown", &p, &e))?;
        Ok(Applied::changed().with_detail(format!("{changed} nodes handed to {uid}:{gid}")))
    }
}
