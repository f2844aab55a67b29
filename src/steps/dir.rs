//! Directories with explicit owner and mode.
use std::fs;

use super::{Applied, Owner, Step, StepCtx, StepMeta};
use crate::fs::backup::backup_file;
use crate::fs::meta::{kind_of, mode_of, owner_of, NodeKind};
use crate::fs::perms::{set_mode, set_owner};
use crate::types::errors::{Error, Result};
use crate::types::{SafePath, SatisfiedState};

#[derive(Clone, Debug)]
pub struct EnsureDir {
    pub(crate) meta: StepMeta,
    path: SafePath,
    mode: u32,
    owner: Option<Owner>,
}

impl EnsureDir {
    pub fn new(name: impl Into<String>, path: SafePath, mode: u32) -> Self {
        Self {
            meta: StepMeta::new(name),
            path,
            mode,
            owner: None,
        }
    }

    #[must_use]
    pub fn owned_by(mut self, owner: Owner) -> Self {
        self.owner = Some(owner);
        self
    }
}

impl Step for EnsureDir {
    fn meta(&self) -> &StepMeta {
        &self.meta
    }

    fn kind(&self) -> &'static str {
        "dir"
    }

    fn probe(&self, ctx: &StepCtx<'_>) -> Result<SatisfiedState> {
        let p = self.path.as_path();
        match kind_of(&p) {
            NodeKind::Missing => return Ok(SatisfiedState::Missing),
            NodeKind::Dir => {}
            _ => return Ok(SatisfiedState::Broken),
        }
        if mode_of(&p) != Some(self.mode & 0o7777) {
            return Ok(SatisfiedState::Broken);
        }
        if let Some(owner) = &self.owner {
            match owner.lookup(ctx.runner)? {
                Some(ids) if owner_of(&p) == Some(ids) => {}
                _ => return Ok(SatisfiedState::Broken),
            }
        }
        Ok(SatisfiedState::Satisfied)
    }

    fn apply(&self, ctx: &StepCtx<'_>) -> Result<Applied> {
        let p = self.path.as_path();
        let mut applied = Applied::changed();
        match kind_of(&p) {
            NodeKind::Dir | NodeKind::Missing => {}
            NodeKind::File | NodeKind::Symlink => {
                if let Some(b) = backup_file(&p, &ctx.policy.backup.tag)
                    .map_err(|e| Error::io("back up", &p, &e))?
                {
                    applied = applied.with_detail(format!("moved aside to {}", b.display()));
                }
                fs::remove_file(&p).map_err(|e| Error::io("remove", &p, &e))?;
            }
            NodeKind::Other => {
                return Err(Error::precondition(format!(
                    "{} exists and is not a directory",
                    p.display()
                )))
            }
        }
        fs::create_dir_all(&p).map_err(|e| Error::io("create", &p, &e))?;
        set_mode(&p, self.mode).map_err(|e| Error::io("chmod", &p, &e))?;
        if let Some(owner) = &self.owner {
            let (uid, gid) = owner.resolve(ctx.runner)?;
            set_owner(&p, uid, gid).map_err(|e| Error::io("chown", &p, &e))?;
        }
        Ok(applied)
    }
}
