use std::time::Duration;

use crate::constants::{
    DEFAULT_BACKUP_TAG, DEFAULT_HEALTH_POLL_MS, DEFAULT_HEALTH_WAIT_MS, DEFAULT_LOCK_TIMEOUT_MS,
    DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY_MS,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockingPolicy {
    /// Commit runs abort with `E_LOCKING` when the run lock cannot be taken.
    Required,
    /// Commit runs without a lock manager proceed with a warning.
    Optional,
}

#[derive(Clone, Debug)]
pub struct Governance {
    pub locking: LockingPolicy,
    pub lock_timeout: Duration,
}

impl Default for Governance {
    fn default() -> Self {
        Self {
            locking: LockingPolicy::Optional,
            lock_timeout: Duration::from_millis(DEFAULT_LOCK_TIMEOUT_MS),
        }
    }
}

/// Host conditions checked by preflight before any step runs.
#[derive(Clone, Debug, Default)]
pub struct Preconditions {
    pub require_root: bool,
    /// Binaries that must resolve on `PATH`.
    pub required_tools: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct ApplyFlow {
    /// Run even when preflight reported stops.
    pub override_preflight: bool,
}

/// Service health wait after a (re)start.
#[derive(Clone, Debug)]
pub struct Health {
    pub wait: Duration,
    pub poll: Duration,
}

impl Default for Health {
    fn default() -> Self {
        Self {
            wait: Duration::from_millis(DEFAULT_HEALTH_WAIT_MS),
            poll: Duration::from_millis(DEFAULT_HEALTH_POLL_MS),
        }
    }
}

/// Bounded retries for network-facing actions.
#[derive(Clone, Debug)]
pub struct Retry {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for Retry {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_RETRY_ATTEMPTS,
            delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Backup {
    pub tag: String,
}

impl Default for Backup {
    fn default() -> Self {
        Self {
            tag: DEFAULT_BACKUP_TAG.to_string(),
        }
    }
}
