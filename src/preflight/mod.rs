//! Preflight checks and helpers.
//!
//! Best-effort host checks used by the higher-level API before any step runs:
//! privileges, tool availability and writability of the install root.

pub mod checks;

pub use checks::{effective_uid_is_root, ensure_writable_dir, is_executable, which_on_path};
