use std::time::Instant;

use log::Level;
use serde_json::json;
use uuid::Uuid;

use crate::adapters::lock::LockGuard;
use crate::api::errors::{id_str, ErrorId};
use crate::api::Groundwork;
use crate::logging::audit::AuditCtx;
use crate::logging::{AuditSink, FactsEmitter, StageLogger};
use crate::policy::types::LockingPolicy;
use crate::types::{ApplyMode, ApplyReport, ErrorKind, ExecutionLog, StepFailure};

pub(crate) struct LockInfo {
    pub lock_backend: &'static str,
    pub lock_wait_ms: Option<u64>,
    pub guard: Option<Box<dyn LockGuard>>,
    pub early_report: Option<ApplyReport>,
}

pub(crate) fn acquire<E: FactsEmitter, A: AuditSink>(
    api: &Groundwork<E, A>,
    t0: Instant,
    pid: Uuid,
    mode: ApplyMode,
    tctx: &AuditCtx<'_>,
) -> LockInfo {
    let dry = matches!(mode, ApplyMode::DryRun);
    let slog = StageLogger::new(tctx);

    if let Some(mgr) = &api.lock {
        let lt0 = Instant::now();
        let timeout_ms = u64::try_from(api.policy.governance.lock_timeout.as_millis()).unwrap_or(u64::MAX);
        let res = mgr.acquire_process_lock(timeout_ms);
        let lock_wait_ms = Some(u64::try_from(lt0.elapsed().as_millis()).unwrap_or(u64::MAX));
        return match res {
            Ok(g) => LockInfo {
                lock_backend: "file",
                lock_wait_ms,
                guard: Some(g),
                early_report: None,
            },
            Err(e) => {
                emit_failure(&slog, "file", lock_wait_ms);
                api.audit
                    .log(Level::Error, &format!("apply: lock acquisition failed (E_LOCKING): {e}"));
                LockInfo {
                    lock_backend: "file",
                    lock_wait_ms,
                    guard: None,
                    early_report: Some(early_report(pid, tctx, mode, t0, e.msg)),
                }
            }
        };
    }

    if !dry {
        match api.policy.governance.locking {
            LockingPolicy::Required => {
                emit_failure(&slog, "none", None);
                api.audit
                    .log(Level::Error, "apply: lock manager required in Commit mode (E_LOCKING)");
                return LockInfo {
                    lock_backend: "none",
                    lock_wait_ms: None,
                    guard: None,
                    early_report: Some(early_report(
                        pid,
                        tctx,
                        mode,
                        t0,
                        "lock manager required in Commit mode".to_string(),
                    )),
                };
            }
            LockingPolicy::Optional => {
                slog.apply_attempt()
                    .merge(&json!({
                        "lock_backend": "none",
                        "no_lock_manager": true,
                    }))
                    .emit_warn();
            }
        }
    }
    LockInfo {
        lock_backend: "none",
        lock_wait_ms: None,
        guard: None,
        early_report: None,
    }
}

fn emit_failure(slog: &StageLogger<'_>, backend: &str, wait_ms: Option<u64>) {
    slog.apply_attempt()
        .merge(&json!({
            "lock_backend": backend,
            "lock_wait_ms": wait_ms,
        }))
        .error_id(ErrorId::E_LOCKING)
        .exit_code_for(ErrorId::E_LOCKING)
        .emit_failure();
    slog.apply_result()
        .merge(&json!({
            "lock_backend": backend,
            "lock_wait_ms": wait_ms,
            "summary_error_ids": [id_str(ErrorId::E_LOCKING)],
        }))
        .error_id(ErrorId::E_LOCKING)
        .exit_code_for(ErrorId::E_LOCKING)
        .emit_failure();
}

fn early_report(
    pid: Uuid,
    tctx: &AuditCtx<'_>,
    mode: ApplyMode,
    t0: Instant,
    msg: String,
) -> ApplyReport {
    ApplyReport {
        plan_id: pid,
        run_id: tctx.run_id.clone(),
        mode,
        log: ExecutionLog::default(),
        duration_ms: u64::try_from(t0.elapsed().as_millis()).unwrap_or(u64::MAX),
        failure: Some(StepFailure {
            step: String::new(),
            kind: ErrorKind::Locking,
            error_id: id_str(ErrorId::E_LOCKING).to_string(),
            msg,
        }),
        warnings: Vec::new(),
    }
}
