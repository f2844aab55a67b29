//! Policy gating helper for the Apply stage.
//!
//! Refuses a Commit run when preflight would stop, unless `override_preflight` is set.
use std::time::Instant;

use log::Level;
use serde_json::json;
use uuid::Uuid;

use crate::api::errors::{id_str, ErrorId};
use crate::api::Groundwork;
use crate::logging::{AuditSink, FactsEmitter, StageLogger};
use crate::types::{ApplyMode, ApplyReport, ErrorKind, ExecutionLog, StepFailure};

pub(crate) fn enforce<E: FactsEmitter, A: AuditSink>(
    api: &Groundwork<E, A>,
    pid: Uuid,
    run_id: &str,
    mode: ApplyMode,
    t0: Instant,
    slog: &StageLogger<'_>,
) -> Option<ApplyReport> {
    if api.policy.apply.override_preflight || matches!(mode, ApplyMode::DryRun) {
        return None;
    }
    let stops =
        crate::policy::gating::gating_errors(&api.policy, &api.root, api.search_path.as_deref());
    if stops.is_empty() {
        return None;
    }
    api.audit.log(
        Level::Warn,
        &format!("apply: preflight gating rejected plan (E_PRECONDITION): {}", stops.join("; ")),
    );
    slog.apply_result()
        .merge(&json!({
            "stops": stops,
            "summary_error_ids": [id_str(ErrorId::E_PRECONDITION)],
        }))
        .error_id(ErrorId::E_PRECONDITION)
        .exit_code_for(ErrorId::E_PRECONDITION)
        .emit_failure();

    Some(ApplyReport {
        plan_id: pid,
        run_id: run_id.to_string(),
        mode,
        log: ExecutionLog::default(),
        duration_ms: u64::try_from(t0.elapsed().as_millis()).unwrap_or(u64::MAX),
        failure: Some(StepFailure {
            step: String::new(),
            kind: ErrorKind::PreconditionFailed,
            error_id: id_str(ErrorId::E_PRECONDITION).to_string(),
            msg: stops.join("; "),
        }),
        warnings: Vec::new(),
    })
}
