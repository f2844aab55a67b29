use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use super::errors::{Error, ErrorKind, Result};
use crate::steps::Step;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyMode {
    /// Probe every step and report what would change; mutate nothing.
    #[default]
    DryRun,
    Commit,
}

/// An ordered, statically authored sequence of steps.
///
/// Ordering is authored, not inferred: `Plan::new` only checks that every declared
/// dependency names a step that comes earlier, and that step names are unique.
#[derive(Default)]
pub struct Plan {
    steps: Vec<Box<dyn Step>>,
}

impl Plan {
    /// Validate and wrap an ordered list of steps.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPlan` on an empty or duplicate step name, or when a step depends on a
    /// name that is not declared by an earlier step.
    pub fn new(steps: Vec<Box<dyn Step>>) -> Result<Self> {
        let mut seen: HashSet<&str> = HashSet::new();
        for (idx, step) in steps.iter().enumerate() {
            let name = step.name();
            if name.trim().is_empty() {
                return Err(Error::new(
                    ErrorKind::InvalidPlan,
                    format!("step #{idx} has an empty name"),
                ));
            }
            for dep in step.depends_on() {
                if !seen.contains(dep.as_str()) {
                    return Err(Error::new(
                        ErrorKind::InvalidPlan,
                        format!("step '{name}' depends on '{dep}', which is not an earlier step"),
                    ));
                }
            }
            if !seen.insert(name) {
                return Err(Error::new(
                    ErrorKind::InvalidPlan,
                    format!("duplicate step name '{name}'"),
                ));
            }
        }
        Ok(Self { steps })
    }

    #[must_use]
    pub fn steps(&self) -> &[Box<dyn Step>] {
        &self.steps
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|s| s.name())
    }
}

impl fmt::Debug for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
