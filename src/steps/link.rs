//! Launcher symlinks.
use std::fs;

use super::{Applied, Step, StepCtx, StepMeta};
use crate::fs::atomic::atomic_symlink_swap;
use crate::fs::backup::backup_file;
use crate::fs::meta::{kind_of, resolve_symlink_target, NodeKind};
use crate::types::errors::{Error, Result};
use crate::types::{SafePath, SatisfiedState};

/// Ensure `target` is a symlink pointing at `source`.
#[derive(Clone, Debug)]
pub struct EnsureLink {
    pub(crate) meta: StepMeta,
    source: SafePath,
    target: SafePath,
}

impl EnsureLink {
    pub fn new(name: impl Into<String>, source: SafePath, target: SafePath) -> Self {
        Self {
            meta: StepMeta::new(name),
            source,
            target,
        }
    }
}

impl Step for EnsureLink {
    fn meta(&self) -> &StepMeta {
        &self.meta
    }

    fn kind(&self) -> &'static str {
        "link"
    }

    fn probe(&self, _ctx: &StepCtx<'_>) -> Result<SatisfiedState> {
        let t = self.target.as_path();
        Ok(match kind_of(&t) {
            NodeKind::Missing => SatisfiedState::Missing,
            NodeKind::Symlink if resolve_symlink_target(&t) == Some(self.source.as_path()) => {
                SatisfiedState::Satisfied
            }
            _ => SatisfiedState::Broken,
        })
    }

    fn apply(&self, ctx: &StepCtx<'_>) -> Result<Applied> {
        let src = self.source.as_path();
        let t = self.target.as_path();
        if kind_of(&src) == NodeKind::Missing {
            return Err(Error::precondition(format!("link source missing: {}", src.display())));
        }
        let mut applied = Applied::changed();
        match kind_of(&t) {
            NodeKind::Missing => {
                if let Some(parent) = t.parent() {
                    fs::create_dir_all(parent).map_err(|e| Error::io("create", parent, &e))?;
                }
            }
            NodeKind::Symlink => {}
            NodeKind::File => {
                if let Some(b) = backup_file(&t, &ctx.policy.backup.tag)
                    .map_err(|e| Error::io("back up", &t, &e))?
                {
                    applied = applied.with_detail(format!("backup at {}", b.display()));
                }
            }
            NodeKind::Dir | NodeKind::Other => {
                return Err(Error::precondition(format!(
                    "{} exists and cannot be replaced by a link",
                    t.display()
                )))
            }
        }
        atomic_symlink_swap(&src, &t).map_err(|e| Error::io("atomic symlink swap", &t, &e))?;
        Ok(applied)
    }
}
