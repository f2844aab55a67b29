//! Per-step state machine: probe, decide, repair, apply, verify.
use std::time::Instant;

use log::Level;
use serde_json::json;

use crate::api::errors::{id_str, primary_error_id, ErrorId};
use crate::logging::{ts_for_mode, AuditSink, StageLogger};
use crate::steps::{Applied, Step, StepCtx};
use crate::types::errors::{Error, ErrorKind, Result};
use crate::types::{ApplyMode, Decision, LogEntry, RepairPolicy, SatisfiedState};

pub(crate) struct StepRun {
    pub entry: LogEntry,
    /// Set only for a non-optional failure; the run halts on it.
    pub error: Option<Error>,
}

/// Drive one step to its decision. Never panics; every failure ends up in the entry.
pub(crate) fn execute(
    step: &dyn Step,
    ctx: &StepCtx<'_>,
    mode: ApplyMode,
    slog: &StageLogger<'_>,
    audit: &dyn AuditSink,
    sid: &str,
) -> StepRun {
    let t0 = Instant::now();
    let name = step.name();
    let policy = step.repair_policy();

    let outcome = match step.probe(ctx) {
        Err(e) => Err((None, e)),
        Ok(probed) => {
            slog.step_probe()
                .step(name, sid)
                .merge(&json!({
                    "kind": step.kind(),
                    "state": probed,
                    "repair_policy": policy,
                }))
                .emit_success();
            if !policy.needs_apply(probed) {
                Ok((probed, Decision::Skipped, Applied::noop(Vec::new())))
            } else if matches!(mode, ApplyMode::DryRun) {
                Ok((probed, Decision::WouldApply, Applied::noop(Vec::new())))
            } else {
                converge(step, ctx, probed, policy)
                    .map(|(d, a)| (probed, d, a))
                    .map_err(|e| (Some(probed), e))
            }
        }
    };

    if step.kind() == "service" && matches!(mode, ApplyMode::Commit) {
        emit_health(slog, step, sid, &outcome);
    }

    let duration_ms = u64::try_from(t0.elapsed().as_millis()).unwrap_or(u64::MAX);
    let ts = ts_for_mode(&mode);
    match outcome {
        Ok((probed, decision, applied)) => {
            for w in &applied.warnings {
                audit.log(Level::Warn, &format!("{name}: {w}"));
            }
            audit.log(Level::Info, &format!("{name}: {}", decision.as_str()));
            let builder = slog.step_result().step(name, sid).merge(&json!({
                "kind": step.kind(),
                "probed": probed,
                "outcome": decision.as_str(),
                "detail": applied.detail,
                "warnings": applied.warnings,
                "duration_ms": duration_ms,
            }));
            if applied.warnings.is_empty() {
                builder.emit_success();
            } else {
                builder.emit_warn();
            }
            StepRun {
                entry: LogEntry {
                    step: name.to_string(),
                    decision,
                    probed: Some(probed),
                    ts,
                    detail: applied.detail,
                    warnings: applied.warnings,
                },
                error: None,
            }
        }
        Err((probed, e)) if step.optional() => {
            audit.log(Level::Warn, &format!("{name}: optional step failed: {e}"));
            slog.step_result()
                .step(name, sid)
                .merge(&json!({
                    "kind": step.kind(),
                    "probed": probed,
                    "outcome": Decision::Warned.as_str(),
                    "error": e.to_string(),
                    "duration_ms": duration_ms,
                }))
                .emit_warn();
            StepRun {
                entry: LogEntry {
                    step: name.to_string(),
                    decision: Decision::Warned,
                    probed,
                    ts,
                    detail: None,
                    warnings: vec![format!("optional step failed: {e}")],
                },
                error: None,
            }
        }
        Err((probed, e)) => {
            let id = primary_error_id(&e);
            audit.log(Level::Error, &format!("{name}: failed ({}): {e}", id_str(id)));
            slog.step_result()
                .step(name, sid)
                .merge(&json!({
                    "kind": step.kind(),
                    "probed": probed,
                    "outcome": Decision::Failed.as_str(),
                    "error": e.to_string(),
                    "duration_ms": duration_ms,
                }))
                .error_id(id)
                .exit_code_for(id)
                .emit_failure();
            StepRun {
                entry: LogEntry {
                    step: name.to_string(),
                    decision: Decision::Failed,
                    probed,
                    ts,
                    detail: Some(e.to_string()),
                    warnings: Vec::new(),
                },
                error: Some(e),
            }
        }
    }
}

/// Mutating half of the state machine; only reached in Commit mode with work to do.
fn converge(
    step: &dyn Step,
    ctx: &StepCtx<'_>,
    probed: SatisfiedState,
    policy: RepairPolicy,
) -> Result<(Decision, Applied)> {
    let mut repaired = false;
    if probed == SatisfiedState::Broken && policy.repairs_broken() {
        step.repair(ctx)?;
        match step.probe(ctx)? {
            SatisfiedState::Broken => {
                return Err(Error::new(
                    ErrorKind::StateBroken,
                    format!("'{}' still broken after repair", step.name()),
                ))
            }
            SatisfiedState::Satisfied if policy != RepairPolicy::AlwaysReapply => {
                return Ok((
                    Decision::Repaired,
                    Applied::changed().with_detail("repair cleared the broken state"),
                ));
            }
            _ => {}
        }
        repaired = true;
    }

    let applied = step.apply(ctx)?;
    if applied.noop {
        return Ok((Decision::Skipped, applied));
    }
    let after = step.verify(ctx)?;
    if !after.is_satisfied() {
        return Err(Error::apply_failed(format!(
            "'{}' did not converge: probe reports {after} after apply",
            step.name()
        )));
    }
    Ok((
        if repaired {
            Decision::Repaired
        } else {
            Decision::Applied
        },
        applied,
    ))
}

type Outcome = std::result::Result<(SatisfiedState, Decision, Applied), (Option<SatisfiedState>, Error)>;

fn emit_health(slog: &StageLogger<'_>, step: &dyn Step, sid: &str, outcome: &Outcome) {
    match outcome {
        Ok((_, Decision::Skipped, _)) => {}
        Ok(_) => slog
            .health()
            .step(step.name(), sid)
            .field("active", json!(true))
            .emit_success(),
        Err((_, e)) if e.kind == ErrorKind::HealthCheckFailed => slog
            .health()
            .step(step.name(), sid)
            .merge(&json!({ "active": false, "error": e.msg }))
            .error_id(ErrorId::E_HEALTH)
            .exit_code_for(ErrorId::E_HEALTH)
            .emit_failure(),
        Err(_) => {}
    }
}
