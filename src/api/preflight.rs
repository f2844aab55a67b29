//! Preflight stage: host gating plus a read-only probe of every step.
//!
//! Side-effects:
//! - Emits one `preflight` fact per step with its current state.
//! - Emits a `preflight` summary fact with the stop and warning counts.

use log::Level;
use serde_json::json;

use crate::logging::audit::{AuditCtx, AuditMode};
use crate::logging::{AuditSink, FactsEmitter, StageLogger, TS_ZERO};
use crate::policy::types::LockingPolicy;
use crate::types::ids::{plan_id, step_id};
use crate::types::{Plan, PreflightReport};

pub(crate) fn run<E: FactsEmitter, A: AuditSink>(
    api: &super::Groundwork<E, A>,
    plan: &Plan,
) -> PreflightReport {
    let mut warnings: Vec<String> = Vec::new();
    let mut stops =
        crate::policy::gating::gating_errors(&api.policy, &api.root, api.search_path.as_deref());

    let pid = plan_id(plan);
    let ctx = AuditCtx::new(
        &api.facts as &dyn FactsEmitter,
        pid.to_string(),
        String::new(),
        TS_ZERO.to_string(),
        AuditMode {
            dry_run: true,
            redact: true,
        },
    );
    let slog = StageLogger::new(&ctx);

    if api.lock.is_none() {
        match api.policy.governance.locking {
            LockingPolicy::Required => {
                stops.push("run lock required but no lock manager configured".to_string());
            }
            LockingPolicy::Optional => warnings
                .push("no lock manager configured; concurrent runs are not excluded".to_string()),
        }
    }
    if plan.is_empty() {
        warnings.push("plan has no steps".to_string());
    }

    let sctx = api.step_ctx();
    for (idx, step) in plan.steps().iter().enumerate() {
        let sid = step_id(&pid, step.name(), idx).to_string();
        match step.probe(&sctx) {
            Ok(state) => slog
                .preflight()
                .step(step.name(), sid)
                .merge(&json!({
                    "kind": step.kind(),
                    "current": state,
                    "would_apply": step.repair_policy().needs_apply(state),
                    "optional": step.optional(),
                }))
                .emit_success(),
            Err(e) => {
                warnings.push(format!("cannot probe '{}': {e}", step.name()));
                slog.preflight()
                    .step(step.name(), sid)
                    .merge(&json!({ "kind": step.kind(), "error": e.to_string() }))
                    .emit_warn();
            }
        }
    }

    let ok = stops.is_empty();
    let summary = slog.preflight().merge(&json!({
        "summary": true,
        "stops": stops.len(),
        "warnings": warnings.len(),
    }));
    if ok {
        summary.emit_success();
    } else {
        summary
            .error_id(crate::api::errors::ErrorId::E_PRECONDITION)
            .exit_code_for(crate::api::errors::ErrorId::E_PRECONDITION)
            .emit_failure();
        api.audit
            .log(Level::Warn, &format!("preflight: {} stop(s)", stops.len()));
    }

    PreflightReport {
        ok,
        warnings,
        stops,
    }
}
