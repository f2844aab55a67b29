use serde::Serialize;
use uuid::Uuid;

use super::errors::ErrorKind;
use super::plan::ApplyMode;
use super::state::SatisfiedState;

/// What the runner decided for one step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Probe reported `Satisfied`, or the action degraded to a no-op.
    Skipped,
    Applied,
    /// Broken state was torn down and the step re-applied.
    Repaired,
    /// Dry run: the step would have been applied.
    WouldApply,
    /// An optional step failed; the run continued.
    Warned,
    Failed,
}

impl Decision {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Decision::Skipped => "skipped",
            Decision::Applied => "applied",
            Decision::Repaired => "repaired",
            Decision::WouldApply => "would_apply",
            Decision::Warned => "warned",
            Decision::Failed => "failed",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct LogEntry {
    pub step: String,
    pub decision: Decision,
    /// State reported by the first probe, when the probe itself succeeded.
    pub probed: Option<SatisfiedState>,
    pub ts: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Append-only audit trail of one run.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(transparent)]
pub struct ExecutionLog {
    entries: Vec<LogEntry>,
}

impl ExecutionLog {
    pub fn record(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    #[must_use]
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Decision recorded for the named step, if it ran.
    #[must_use]
    pub fn decision_of(&self, step: &str) -> Option<Decision> {
        self.entries
            .iter()
            .find(|e| e.step == step)
            .map(|e| e.decision)
    }

    #[must_use]
    pub fn count(&self, decision: Decision) -> usize {
        self.entries.iter().filter(|e| e.decision == decision).count()
    }
}

/// The step that halted a run and why.
#[derive(Clone, Debug, Serialize)]
pub struct StepFailure {
    /// Empty when the run stopped before any step (lock, preflight).
    pub step: String,
    pub kind: ErrorKind,
    /// Stable id, e.g. `E_PACKAGE_UNAVAILABLE`.
    pub error_id: String,
    pub msg: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ApplyReport {
    pub plan_id: Uuid,
    pub run_id: String,
    pub mode: ApplyMode,
    pub log: ExecutionLog,
    pub duration_ms: u64,
    pub failure: Option<StepFailure>,
    /// Warnings from optional steps and degraded actions.
    pub warnings: Vec<String>,
}

impl ApplyReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Process exit code for this run: `0` on success, the error id's code otherwise.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.failure
            .as_ref()
            .map_or(0, |f| {
                crate::api::errors::exit_code_for_id_str(&f.error_id)
                    .unwrap_or_else(|| crate::api::errors::exit_code_for(f.kind.into()))
            })
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct PreflightReport {
    pub ok: bool,
    pub warnings: Vec<String>,
    pub stops: Vec<String>,
}
