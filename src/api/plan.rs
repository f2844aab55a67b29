//! api/plan.rs: plan validation and plan facts

use serde_json::json;

use crate::logging::audit::{AuditCtx, AuditMode};
use crate::logging::{AuditSink, FactsEmitter, StageLogger, TS_ZERO};
use crate::steps::Step;
use crate::types::ids::{plan_id, step_id};
use crate::types::Plan;

use super::errors::ApiError;

/// Validate the authored order and emit one plan fact per step.
pub(super) fn build<E: FactsEmitter, A: AuditSink>(
    api: &super::Groundwork<E, A>,
    steps: Vec<Box<dyn Step>>,
) -> Result<Plan, ApiError> {
    let plan = Plan::new(steps)?;

    let pid = plan_id(&plan);
    let tctx = AuditCtx::new(
        &api.facts as &dyn FactsEmitter,
        pid.to_string(),
        String::new(),
        TS_ZERO.to_string(),
        AuditMode {
            dry_run: true,
            redact: true,
        },
    );
    let slog = StageLogger::new(&tctx);
    for (idx, step) in plan.steps().iter().enumerate() {
        slog.plan()
            .step(step.name(), step_id(&pid, step.name(), idx).to_string())
            .merge(&json!({
                "kind": step.kind(),
                "index": idx,
                "depends_on": step.depends_on(),
                "optional": step.optional(),
                "repair_policy": step.repair_policy(),
            }))
            .emit_success();
    }
    Ok(plan)
}
