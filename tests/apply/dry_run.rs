use groundwork::logging::redact_event;
use groundwork::types::{ApplyMode, Decision};
use serde_json::Value;

use crate::common::{api_for, cfg_for, mutating_calls, recipe_plan, with_temp_root, FakeHost, TestEmitter};

#[test]
fn dry_run_reports_without_touching_the_host() {
    let td = with_temp_root();
    let (host, state) = FakeHost::debian();
    let facts = TestEmitter::default();
    let api = api_for(td.path(), host, &facts);
    let plan = recipe_plan(&api, "camera-manager", &cfg_for(td.path()));

    let report = api.apply(&plan, ApplyMode::DryRun).unwrap();
    assert!(report.is_success());
    assert_eq!(report.log.count(Decision::WouldApply), plan.len());
    assert!(mutating_calls(&state).is_empty());
    assert!(!td.path().join("opt").exists());
    assert!(!td.path().join("etc").exists());
    for f in facts.fields() {
        assert_eq!(f["dry_run"], true);
    }
}

#[test]
fn repeated_dry_runs_emit_identical_redacted_facts() {
    let td = with_temp_root();
    let (host, _state) = FakeHost::debian();
    let facts = TestEmitter::default();
    let api = api_for(td.path(), host, &facts);
    let plan = recipe_plan(&api, "gcs-telemetry", &cfg_for(td.path()));
    // Only compare what the two applies emit.
    facts.clear();

    let _ = api.apply(&plan, ApplyMode::DryRun).unwrap();
    let first: Vec<Value> = facts.fields().into_iter().map(redact_event).collect();
    facts.clear();
    let _ = api.apply(&plan, ApplyMode::DryRun).unwrap();
    let second: Vec<Value> = facts.fields().into_iter().map(redact_event).collect();
    assert!(!first.is_empty());
    assert_eq!(first[0]["stage"], "apply.attempt");
    assert_eq!(first, second);
}
