//! Service unit definition and lifecycle.
//!
//! The unit file on disk must match the freshly rendered definition byte for byte, the
//! unit must be enabled at boot, and it must be active. Applying rewrites the definition
//! when it differs, reloads, enables, restarts and then waits for the unit to come up.
use std::fmt::Write as _;

use super::{Applied, Step, StepCtx, StepMeta};
use crate::adapters::command::{run_checked, CommandLine};
use crate::adapters::systemd::Systemctl;
use crate::fs::atomic::write_atomic;
use crate::fs::backup::backup_file;
use crate::fs::meta::{kind_of, NodeKind};
use crate::types::errors::{Error, ErrorKind, Result};
use crate::types::{SafePath, SatisfiedState};

/// Declarative service definition rendered to a systemd unit file.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct UnitSpec {
    /// Unit name without the `.service` suffix.
    pub name: String,
    pub description: String,
    pub after: Vec<String>,
    pub user: String,
    pub group: Option<String>,
    pub working_dir: Option<String>,
    pub exec_start: String,
    pub environment: Vec<(String, String)>,
    pub restart: Option<String>,
}

impl UnitSpec {
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.service", self.name)
    }

    /// Render the unit file. Output is a pure function of the spec.
    #[must_use]
    pub fn render(&self) -> String {
        let mut s = String::new();
        s.push_str("[Unit]\n");
        let _ = writeln!(s, "Description={}", self.description);
        let after = if self.after.is_empty() {
            "network-online.target".to_string()
        } else {
            self.after.join(" ")
        };
        let _ = writeln!(s, "After={after}");
        let _ = writeln!(s, "Wants={after}");
        s.push_str("\n[Service]\nType=simple\n");
        let _ = writeln!(s, "User={}", self.user);
        if let Some(g) = &self.group {
            let _ = writeln!(s, "Group={g}");
        }
        if let Some(w) = &self.working_dir {
            let _ = writeln!(s, "WorkingDirectory={w}");
        }
        for (k, v) in &self.environment {
            let _ = writeln!(s, "Environment=\"{k}={v}\"");
        }
        let _ = writeln!(s, "ExecStart={}", self.exec_start);
        let _ = writeln!(
            s,
            "Restart={}",
            self.restart.as_deref().unwrap_or("on-failure")
        );
        s.push_str("RestartSec=5\n\n[Install]\nWantedBy=multi-user.target\n");
        s
    }
}

#[derive(Clone, Debug)]
pub struct ServiceUnit {
    pub(crate) meta: StepMeta,
    unit: UnitSpec,
    unit_path: SafePath,
    /// Extra command that must succeed once the unit is active (e.g. `app --version`).
    health_cmd: Option<CommandLine>,
    systemctl: Systemctl,
}

impl ServiceUnit {
    /// `unit_dir` is the directory holding unit files, e.g. `/etc/systemd/system` under the root.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath` when the unit name is not a plain file name.
    pub fn new(name: impl Into<String>, unit: UnitSpec, unit_dir: &SafePath) -> Result<Self> {
        if unit.name.is_empty() || unit.name.contains('/') {
            return Err(Error::new(
                ErrorKind::InvalidPath,
                format!("invalid unit name '{}'", unit.name),
            ));
        }
        let unit_path = unit_dir.join(unit.file_name())?;
        Ok(Self {
            meta: StepMeta::new(name),
            unit,
            unit_path,
            health_cmd: None,
            systemctl: Systemctl,
        })
    }

    #[must_use]
    pub fn with_health_cmd(mut self, cmd: CommandLine) -> Self {
        self.health_cmd = Some(cmd);
        self
    }

    fn definition_matches(&self) -> bool {
        std::fs::read(self.unit_path.as_path()).is_ok_and(|b| b == self.unit.render().as_bytes())
    }
}

impl Step for ServiceUnit {
    fn meta(&self) -> &StepMeta {
        &self.meta
    }

    fn kind(&self) -> &'static str {
        "service"
    }

    fn probe(&self, ctx: &StepCtx<'_>) -> Result<SatisfiedState> {
        if kind_of(&self.unit_path.as_path()) == NodeKind::Missing {
            return Ok(SatisfiedState::Missing);
        }
        let unit = self.unit.file_name();
        let ok = self.definition_matches()
            && self.systemctl.is_enabled(ctx.runner, &unit)?
            && self.systemctl.is_active(ctx.runner, &unit)?;
        Ok(if ok {
            SatisfiedState::Satisfied
        } else {
            SatisfiedState::Broken
        })
    }

    fn apply(&self, ctx: &StepCtx<'_>) -> Result<Applied> {
        let path = self.unit_path.as_path();
        let unit = self.unit.file_name();
        let mut applied = Applied::changed();
        if !self.definition_matches() {
            if let Some(b) = backup_file(&path, &ctx.policy.backup.tag)
                .map_err(|e| Error::io("back up", &path, &e))?
            {
                applied = applied.with_detail(format!("previous unit at {}", b.display()));
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| Error::io("create", parent, &e))?;
            }
            write_atomic(&path, self.unit.render().as_bytes(), 0o644, None)
                .map_err(|e| Error::io("atomic write", &path, &e))?;
            self.systemctl.daemon_reload(ctx.runner)?;
        }
        self.systemctl.enable(ctx.runner, &unit)?;
        self.systemctl.restart(ctx.runner, &unit)?;
        let waited = self.systemctl.wait_active(
            ctx.runner,
            &unit,
            ctx.policy.health.wait,
            ctx.policy.health.poll,
        )?;
        if let Some(cmd) = &self.health_cmd {
            run_checked(ctx.runner, cmd)
                .map_err(|e| Error::new(ErrorKind::HealthCheckFailed, format!("health command: {}", e.msg)))?;
        }
        if applied.detail.is_none() {
            applied = applied.with_detail(format!("{unit} active after {} ms", waited.as_millis()));
        }
        Ok(applied)
    }
}
