use std::ffi::OsStr;
use std::path::Path;

use crate::policy::Policy;
use crate::preflight::checks::{effective_uid_is_root, ensure_writable_dir, which_on_path};

/// Host-level stops for running a plan under `policy` against `root`.
///
/// Shared by preflight (which reports them) and apply (which refuses to proceed on them).
pub(crate) fn gating_errors(policy: &Policy, root: &Path, path_var: Option<&OsStr>) -> Vec<String> {
    let mut stops: Vec<String> = Vec::new();

    if policy.preconditions.require_root && !effective_uid_is_root() {
        stops.push("root privileges required (effective uid is not 0)".to_string());
    }

    for tool in &policy.preconditions.required_tools {
        let found = path_var.and_then(|p| which_on_path(p, tool)).is_some();
        if !found {
            stops.push(format!("required tool not found on PATH: {tool}"));
        }
    }

    if let Err(e) = ensure_writable_dir(root) {
        stops.push(format!("install root not writable: {e} (root={})", root.display()));
    }

    stops
}
