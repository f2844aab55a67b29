//! Shared crate-wide constants for Groundwork.
//!
//! Centralizes magic values and default labels used across modules.

/// Default logical tag used for naming backup artifacts.
/// Example filename: `.<name>.<tag>.<millis>.bak`.
pub const DEFAULT_BACKUP_TAG: &str = "groundwork";

/// Temporary filename suffix used when staging files and links within a directory.
/// The temporary name is constructed as `.{fname}.{pid}.{n}{TMP_SUFFIX}`.
pub const TMP_SUFFIX: &str = ".groundwork.tmp";

/// Poll interval in milliseconds for the file-backed lock manager.
pub const LOCK_POLL_MS: u64 = 25;

/// Default lock timeout used unless overridden by policy.
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5_000;

/// Default location of the advisory run lock.
pub const DEFAULT_LOCK_PATH: &str = "/run/lock/groundwork.lock";

/// UUIDv5 namespace tag for deterministic plan/step IDs.
pub const NS_TAG: &str = "https://groundwork.dev/provisioning";

/// How long a restarted service gets to report `active` before the run fails.
pub const DEFAULT_HEALTH_WAIT_MS: u64 = 10_000;

/// Poll interval while waiting for a service to become active.
pub const DEFAULT_HEALTH_POLL_MS: u64 = 500;

/// Attempts made by network-facing actions (package fetches) before failing.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Delay between attempts of a network-facing action.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 2_000;

/// Directory where generated service unit definitions are written.
pub const SYSTEMD_UNIT_DIR: &str = "/etc/systemd/system";

/// Bootstrap tooling upgraded inside every fresh virtual environment.
pub const VENV_BOOTSTRAP: &[&str] = &["pip", "setuptools", "wheel"];

/// Environment variable prefix for install configuration.
pub const ENV_PREFIX: &str = "GROUNDWORK_";
