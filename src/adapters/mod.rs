//! Seams to external collaborators.
//!
//! - `command`: the process-spawning seam every other adapter goes through
//! - `pkg`: package manager capability table
//! - `accounts`: user/group database
//! - `systemd`: service manager
//! - `venv`: Python virtual-environment tool
//! - `lock`: host-wide advisory run lock
pub mod accounts;
pub mod command;
pub mod lock;
pub mod pkg;
pub mod systemd;
pub mod venv;

pub use accounts::{lookup_group, lookup_user, resolve_owner, Account, UserSpec};
pub use command::{CommandLine, CommandOutput, CommandRunner, SystemRunner};
pub use lock::file::FileLockManager;
pub use lock::{LockGuard, LockManager};
pub use pkg::{OptionalInstall, PackageBackend};
pub use systemd::Systemctl;
pub use venv::{PipFlags, VenvTool};
