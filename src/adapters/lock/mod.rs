pub mod file;

use crate::types::errors::Result;

/// Held for the duration of a run; releasing happens on drop.
pub trait LockGuard: Send {}

pub trait LockManager: Send + Sync {
    /// Acquire the host-wide run lock with the specified timeout.
    /// # Errors
    /// Returns a `Locking` error if the lock cannot be acquired within the timeout period.
    fn acquire_process_lock(&self, timeout_ms: u64) -> Result<Box<dyn LockGuard>>;
}
