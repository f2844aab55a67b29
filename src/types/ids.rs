//! Deterministic UUIDv5 identifiers for plans and steps.
//!
//! The UUID namespace is derived from a stable tag (`NS_TAG`) so that
//! `plan_id` and `step_id` are reproducible across runs for the same
//! ordered sequence of step names.
use std::fmt::Write;
use uuid::Uuid;

use super::plan::Plan;
use crate::constants::NS_TAG;

fn namespace() -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, NS_TAG.as_bytes())
}

/// Compute a deterministic UUIDv5 for a plan by serializing step names in order.
#[must_use]
pub fn plan_id(plan: &Plan) -> Uuid {
    let mut s = String::new();
    for name in plan.names() {
        s.push_str(name);
        s.push('\n');
    }
    Uuid::new_v5(&namespace(), s.as_bytes())
}

/// Compute a deterministic UUIDv5 for a step from the plan ID, its name and position.
#[must_use]
pub fn step_id(plan_id: &Uuid, name: &str, idx: usize) -> Uuid {
    let mut s = name.to_string();
    let _ = write!(s, "#{idx}");
    Uuid::new_v5(plan_id, s.as_bytes())
}

/// Fresh random identifier for a single run.
#[must_use]
pub fn new_run_id() -> String {
    Uuid::new_v4().to_string()
}
