//! Probe results and repair policies.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Observed state of one step's subject on the live system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SatisfiedState {
    /// Matches the declared desired state.
    Satisfied,
    /// Nothing there yet; needs creation.
    Missing,
    /// Partial or corrupt state exists; needs recreation.
    Broken,
}

impl SatisfiedState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            SatisfiedState::Satisfied => "satisfied",
            SatisfiedState::Missing => "missing",
            SatisfiedState::Broken => "broken",
        }
    }

    #[must_use]
    pub const fn is_satisfied(&self) -> bool {
        matches!(self, SatisfiedState::Satisfied)
    }
}

impl fmt::Display for SatisfiedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the runner reacts to a probed state.
///
/// | probed      | `SkipIfSatisfied` | `RecreateIfBroken`     | `AlwaysReapply`        |
/// |-------------|-------------------|------------------------|------------------------|
/// | `Satisfied` | skip              | skip                   | apply                  |
/// | `Missing`   | apply             | apply                  | apply                  |
/// | `Broken`    | apply in place    | repair, re-probe, apply| repair, re-probe, apply|
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairPolicy {
    #[default]
    SkipIfSatisfied,
    RecreateIfBroken,
    AlwaysReapply,
}

impl RepairPolicy {
    /// Whether a step probed in `state` must be applied.
    #[must_use]
    pub const fn needs_apply(&self, state: SatisfiedState) -> bool {
        !matches!(
            (self, state),
            (
                RepairPolicy::SkipIfSatisfied | RepairPolicy::RecreateIfBroken,
                SatisfiedState::Satisfied
            )
        )
    }

    /// Whether a `Broken` artifact must be torn down before applying.
    #[must_use]
    pub const fn repairs_broken(&self) -> bool {
        !matches!(self, RepairPolicy::SkipIfSatisfied)
    }
}
