//! Package index refresh, mandatory packages and best-effort optional packages.
use super::{with_retries, Applied, Step, StepCtx, StepMeta};
use crate::adapters::pkg::PackageBackend;
use crate::adapters::CommandRunner;
use crate::types::errors::{ErrorKind, Result};
use crate::types::SatisfiedState;

fn not_installed(
    backend: PackageBackend,
    runner: &dyn CommandRunner,
    pkgs: &[String],
) -> Result<Vec<String>> {
    let mut out = Vec::new();
    for p in pkgs {
        if !backend.is_installed(runner, p)? {
            out.push(p.clone());
        }
    }
    Ok(out)
}

fn all_installed(ctx: &StepCtx<'_>, backend: PackageBackend, pkgs: &[String]) -> Result<SatisfiedState> {
    Ok(if not_installed(backend, ctx.runner, pkgs)?.is_empty() {
        SatisfiedState::Satisfied
    } else {
        SatisfiedState::Missing
    })
}

/// Refresh the package index, unless every package the plan needs is already installed.
#[derive(Clone, Debug)]
pub struct RefreshIndex {
    pub(crate) meta: StepMeta,
    backend: PackageBackend,
    needed: Vec<String>,
}

impl RefreshIndex {
    pub fn new(name: impl Into<String>, backend: PackageBackend, needed: Vec<String>) -> Self {
        Self {
            meta: StepMeta::new(name),
            backend,
            needed,
        }
    }
}

impl Step for RefreshIndex {
    fn meta(&self) -> &StepMeta {
        &self.meta
    }

    fn kind(&self) -> &'static str {
        "package_index"
    }

    fn probe(&self, ctx: &StepCtx<'_>) -> Result<SatisfiedState> {
        all_installed(ctx, self.backend, &self.needed)
    }

    fn apply(&self, ctx: &StepCtx<'_>) -> Result<Applied> {
        let ((), attempts) = with_retries(&ctx.policy.retry, || self.backend.refresh_index(ctx.runner))?;
        let mut applied = Applied::changed().with_detail(format!("{} index refreshed", self.backend.id()));
        if attempts > 1 {
            applied.warnings.push(format!("index refresh needed {attempts} attempts"));
        }
        Ok(applied)
    }

    // A fresh index has no observable end state of its own.
    fn verify(&self, _ctx: &StepCtx<'_>) -> Result<SatisfiedState> {
        Ok(SatisfiedState::Satisfied)
    }
}

/// Packages the service cannot run without. Any unavailable name halts the plan.
#[derive(Clone, Debug)]
pub struct RequiredPackages {
    pub(crate) meta: StepMeta,
    backend: PackageBackend,
    packages: Vec<String>,
}

impl RequiredPackages {
    pub fn new(name: impl Into<String>, backend: PackageBackend, packages: Vec<String>) -> Self {
        Self {
            meta: StepMeta::new(name),
            backend,
            packages,
        }
    }
}

impl Step for RequiredPackages {
    fn meta(&self) -> &StepMeta {
        &self.meta
    }

    fn kind(&self) -> &'static str {
        "packages"
    }

    fn probe(&self, ctx: &StepCtx<'_>) -> Result<SatisfiedState> {
        all_installed(ctx, self.backend, &self.packages)
    }

    fn apply(&self, ctx: &StepCtx<'_>) -> Result<Applied> {
        let missing = not_installed(self.backend, ctx.runner, &self.packages)?;
        // Halts as an apply failure; `cause` keeps PackageUnavailable for the error id.
        self.backend
            .install(ctx.runner, &missing)
            .map_err(|e| match e.kind {
                ErrorKind::PackageUnavailable => e.escalate(ErrorKind::ApplyFailed),
                _ => e,
            })?;
        Ok(Applied::changed().with_detail(format!("installed {}", missing.join(" "))))
    }
}

/// Nice-to-have packages: installs the available subset, warns about the rest.
#[derive(Clone, Debug)]
pub struct OptionalPackages {
    pub(crate) meta: StepMeta,
    backend: PackageBackend,
    packages: Vec<String>,
}

impl OptionalPackages {
    pub fn new(name: impl Into<String>, backend: PackageBackend, packages: Vec<String>) -> Self {
        Self {
            meta: StepMeta::new(name),
            backend,
            packages,
        }
    }
}

impl Step for OptionalPackages {
    fn meta(&self) -> &StepMeta {
        &self.meta
    }

    fn kind(&self) -> &'static str {
        "optional_packages"
    }

    fn probe(&self, ctx: &StepCtx<'_>) -> Result<SatisfiedState> {
        all_installed(ctx, self.backend, &self.packages)
    }

    fn apply(&self, ctx: &StepCtx<'_>) -> Result<Applied> {
        let missing = not_installed(self.backend, ctx.runner, &self.packages)?;
        let res = self.backend.install_optional(ctx.runner, &missing)?;
        if res.installed.is_empty() {
            return Ok(Applied::noop(res.warnings));
        }
        Ok(Applied {
            detail: Some(format!("installed {}", res.installed.join(" "))),
            warnings: res.warnings,
            noop: false,
        })
    }

    /// Converged once every package that can be installed is installed.
    fn verify(&self, ctx: &StepCtx<'_>) -> Result<SatisfiedState> {
        for p in not_installed(self.backend, ctx.runner, &self.packages)? {
            if self.backend.is_available(ctx.runner, &p)? {
                return Ok(SatisfiedState::Missing);
            }
        }
        Ok(SatisfiedState::Satisfied)
    }
}
