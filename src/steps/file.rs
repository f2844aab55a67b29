//! Templated configuration files, replaced atomically with a backup.
use super::{Applied, Owner, Step, StepCtx, StepMeta};
use crate::fs::atomic::write_atomic;
use crate::fs::backup::backup_file;
use crate::fs::meta::{kind_of, mode_of, owner_of, sha256_hex_bytes, sha256_hex_of, NodeKind};
use crate::types::errors::{Error, Result};
use crate::types::{SafePath, SatisfiedState};

#[derive(Clone, Debug)]
pub struct EnsureFile {
    pub(crate) meta: StepMeta,
    path: SafePath,
    content: Vec<u8>,
    mode: u32,
    owner: Option<Owner>,
}

impl EnsureFile {
    pub fn new(name: impl Into<String>, path: SafePath, content: impl Into<Vec<u8>>, mode: u32) -> Self {
        Self {
            meta: StepMeta::new(name),
            path,
            content: content.into(),
            mode,
            owner: None,
        }
    }

    #[must_use]
    pub fn owned_by(mut self, owner: Owner) -> Self {
        self.owner = Some(owner);
        self
    }

    #[must_use]
    pub fn path(&self) -> &SafePath {
        &self.path
    }
}

impl Step for EnsureFile {
    fn meta(&self) -> &StepMeta {
        &self.meta
    }

    fn kind(&self) -> &'static str {
        "file"
    }

    fn probe(&self, ctx: &StepCtx<'_>) -> Result<SatisfiedState> {
        let p = self.path.as_path();
        match kind_of(&p) {
            NodeKind::Missing => return Ok(SatisfiedState::Missing),
            NodeKind::File => {}
            _ => return Ok(SatisfiedState::Broken),
        }
        if sha256_hex_of(&p) != Some(sha256_hex_bytes(&self.content)) {
            return Ok(SatisfiedState::Broken);
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
        let owner = match &self.owner {
            Some(o) => Some(o.resolve(ctx.runner)?),
            None => None,
        };
        let mut applied = Applied::changed();
        match kind_of(&p) {
            NodeKind::Missing => {
                if let Some(parent) = p.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| Error::io("create", parent, &e))?;
                }
            }
            NodeKind::File | NodeKind::Symlink => {
                if let Some(b) = backup_file(&p, &ctx.policy.backup.tag)
                    .map_err(|e| Error::io("back up", &p, &e))?
                {
                    applied = applied.with_detail(format!("backup at {}", b.display()));
                }
            }
            NodeKind::Dir | NodeKind::Other => {
                return Err(Error::precondition(format!(
                    "{} exists and is not a regular file",
                    p.display()
                )))
            }
        }
        write_atomic(&p, &self.content, self.mode, owner)
            .map_err(|e| Error::io("atomic write", &p, &e))?;
        Ok(applied)
    }
}
