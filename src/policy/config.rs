use std::time::Duration;

use super::types::{ApplyFlow, Backup, Governance, Health, LockingPolicy, Preconditions, Retry};

/// Policy governs preflight gates, locking, waits and retries for a Groundwork run.
///
/// Grouped fields provide clearer ownership and ergonomics.
#[derive(Clone, Debug, Default)]
pub struct Policy {
    pub governance: Governance,
    pub preconditions: Preconditions,
    pub apply: ApplyFlow,
    pub health: Health,
    pub retry: Retry,
    pub backup: Backup,
}

impl Policy {
    /// Construct a Policy configured with recommended **production defaults**.
    ///
    /// Enables:
    /// - `governance.locking = Required`: a Commit run without the run lock fails early
    ///   with `error_id=E_LOCKING` (`exit_code=60`).
    /// - `preconditions.require_root = true`
    /// - `preconditions.required_tools`: `systemctl`, `getent`, `useradd`
    ///
    /// # Example
    /// ```rust
    /// use groundwork::policy::Policy;
    /// use groundwork::{Groundwork, logging::JsonlSink};
    /// use groundwork::adapters::FileLockManager;
    ///
    /// let policy = Policy::production_preset();
    /// let api = Groundwork::new(JsonlSink::default(), JsonlSink::default(), policy)
    ///     .with_lock_manager(Box::new(FileLockManager::new("/run/lock/groundwork.lock".into())));
    /// # let _ = api;
    /// ```
    #[must_use]
    pub fn production_preset() -> Self {
        let mut p = Self::default();
        p.governance.locking = LockingPolicy::Required;
        p.preconditions.require_root = true;
        p.preconditions.required_tools = ["systemctl", "getent", "useradd"]
            .into_iter()
            .map(String::from)
            .collect();
        p
    }

    /// Mutate self to match [`production_preset`](Self::production_preset).
    pub fn apply_production_preset(&mut self) -> &mut Self {
        *self = Self::production_preset();
        self
    }

    /// Short waits and no retry delay; for staging-root and test runs.
    #[must_use]
    pub fn fast() -> Self {
        let mut p = Self::default();
        p.health.wait = Duration::from_millis(200);
        p.health.poll = Duration::from_millis(10);
        p.retry.delay = Duration::ZERO;
        p
    }
}
