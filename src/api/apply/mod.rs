//! Apply stage: the Runner. Executes a plan top to bottom and halts on the first
//! unrecoverable step failure.
//!
//! Side-effects:
//! - Emits `apply.attempt`, then `step.probe`/`step.result` per step (`health` for services),
//!   and a closing `apply.result` summary.
//! - Enforces locking policy and maps failures to `E_LOCKING` with bounded wait.
//! - Enforces preflight gating (unless `override_preflight=true`).
//! - There is no rollback: a halted run leaves the host as the last completed step left it.

use std::time::Instant;

use log::Level;
use serde_json::json;

use crate::api::errors::{id_str, primary_error_id};
use crate::api::Groundwork;
use crate::logging::audit::{AuditCtx, AuditMode};
use crate::logging::{ts_for_mode, AuditSink, FactsEmitter, StageLogger};
use crate::types::ids::{new_run_id, plan_id, step_id};
use crate::types::{ApplyMode, ApplyReport, ExecutionLog, Plan, StepFailure};

mod lock;
mod policy_gate;
mod step;
mod summary;

pub(crate) fn run<E: FactsEmitter, A: AuditSink>(
    api: &Groundwork<E, A>,
    plan: &Plan,
    mode: ApplyMode,
) -> ApplyReport {
    let t0 = Instant::now();
    let dry = matches!(mode, ApplyMode::DryRun);
    let pid = plan_id(plan);
    let run_id = new_run_id();
    let tctx = AuditCtx::new(
        &api.facts,
        pid.to_string(),
        run_id.clone(),
        ts_for_mode(&mode),
        AuditMode {
            dry_run: dry,
            redact: dry,
        },
    );
    let slog = StageLogger::new(&tctx);

    api.audit.log(
        Level::Info,
        &format!("apply: starting {} step(s){}", plan.len(), if dry { " (dry run)" } else { "" }),
    );
    let linfo = lock::acquire(api, t0, pid, mode, &tctx);
    let _lock_guard = linfo.guard;
    if let Some(early) = linfo.early_report {
        return early;
    }

    slog.apply_attempt()
        .merge(&json!({
            "lock_backend": linfo.lock_backend,
            "lock_wait_ms": linfo.lock_wait_ms,
            "steps": plan.len(),
        }))
        .emit_success();

    if let Some(report) = policy_gate::enforce(api, pid, &run_id, mode, t0, &slog) {
        return report;
    }

    let ctx = api.step_ctx();
    let mut log = ExecutionLog::default();
    let mut warnings: Vec<String> = Vec::new();
    let mut failure: Option<StepFailure> = None;
    for (idx, s) in plan.steps().iter().enumerate() {
        let sid = step_id(&pid, s.name(), idx).to_string();
        let res = step::execute(s.as_ref(), &ctx, mode, &slog, &api.audit, &sid);
        warnings.extend(
            res.entry
                .warnings
                .iter()
                .map(|w| format!("{}: {w}", s.name())),
        );
        log.record(res.entry);
        if let Some(e) = res.error {
            failure = Some(StepFailure {
                step: s.name().to_string(),
                kind: e.kind,
                error_id: id_str(primary_error_id(&e)).to_string(),
                msg: e.msg,
            });
            break;
        }
    }

    let duration_ms = u64::try_from(t0.elapsed().as_millis()).unwrap_or(u64::MAX);
    summary::ApplySummary::new(linfo.lock_backend, linfo.lock_wait_ms)
        .counts(&log)
        .duration(duration_ms)
        .failure(failure.as_ref())
        .emit(&slog, failure.is_none());

    match &failure {
        None => api.audit.log(Level::Info, "apply: finished"),
        Some(f) => api.audit.log(
            Level::Error,
            &format!("apply: halted at '{}' ({}): {}", f.step, f.error_id, f.msg),
        ),
    }

    ApplyReport {
        plan_id: pid,
        run_id,
        mode,
        log,
        duration_ms,
        failure,
        warnings,
    }
}
