use groundwork::steps::{FnStep, Step};
use groundwork::types::{ApplyMode, Decision, Error, ErrorKind, SatisfiedState};

use crate::common::{api_for, cfg_for, mutating_calls, recipe_plan, with_temp_root, FakeHost, TestEmitter};

#[test]
fn unavailable_mandatory_package_halts_the_run() {
    let td = with_temp_root();
    let (host, state) = FakeHost::debian();
    state.lock().unwrap().available.remove("motion");
    let facts = TestEmitter::default();
    let api = api_for(td.path(), host, &facts);
    let plan = recipe_plan(&api, "camera-manager", &cfg_for(td.path()));

    let report = api.apply(&plan, ApplyMode::Commit).unwrap();
    let failure = report.failure.as_ref().expect("run must fail");
    assert_eq!(failure.step, "packages");
    assert_eq!(failure.kind, ErrorKind::ApplyFailed);
    assert_eq!(failure.error_id, "E_PACKAGE_UNAVAILABLE");
    assert!(failure.msg.contains("motion"));
    assert_eq!(report.exit_code(), 20);

    assert_eq!(report.log.decision_of("packages"), Some(Decision::Failed));
    assert_eq!(report.log.decision_of("user"), None);
    assert_eq!(report.log.entries().last().map(|e| e.step.as_str()), Some("packages"));
    assert!(!mutating_calls(&state).iter().any(|c| c.starts_with("apt-get install")));
    assert!(!state.lock().unwrap().users.contains_key("motion"));

    let summary = facts.stage("apply.result");
    assert_eq!(summary[0]["decision"], "failure");
    assert_eq!(summary[0]["error_id"], "E_PACKAGE_UNAVAILABLE");
    assert_eq!(
        summary[0]["summary_error_ids"],
        serde_json::json!(["E_PACKAGE_UNAVAILABLE", "E_APPLY_FAILED"])
    );
}

#[test]
fn failing_tool_maps_to_apply_failed() {
    let td = with_temp_root();
    let (host, state) = FakeHost::debian();
    state.lock().unwrap().failing.insert("useradd".into());
    let facts = TestEmitter::default();
    let api = api_for(td.path(), host, &facts);
    let plan = recipe_plan(&api, "file-share", &cfg_for(td.path()));

    let report = api.apply(&plan, ApplyMode::Commit).unwrap();
    let failure = report.failure.as_ref().expect("run must fail");
    assert_eq!(failure.step, "user");
    assert_eq!(failure.error_id, "E_APPLY_FAILED");
    assert_eq!(report.exit_code(), 40);
    assert_eq!(report.log.decision_of("packages"), Some(Decision::Applied));
}

#[test]
fn tool_stderr_mentioning_unavailability_stays_an_apply_failure() {
    let td = with_temp_root();
    let (host, _state) = FakeHost::debian();
    let facts = TestEmitter::default();
    let api = api_for(td.path(), host, &facts);
    let steps: Vec<Box<dyn Step>> = vec![Box::new(FnStep::new(
        "wheel",
        |_| Ok(SatisfiedState::Missing),
        |_| {
            Err(Error::apply_failed(
                "`python -m pip install foo` exited with status 1: \
                 ERROR: package unavailable for this platform; lock held; health",
            ))
        },
    ))];
    let plan = api.plan(steps).unwrap();

    let report = api.apply(&plan, ApplyMode::Commit).unwrap();
    let failure = report.failure.as_ref().unwrap();
    assert_eq!(failure.kind, ErrorKind::ApplyFailed);
    assert_eq!(failure.error_id, "E_APPLY_FAILED");
    assert_eq!(report.exit_code(), 40);

    let summary = facts.stage("apply.result");
    assert_eq!(summary[0]["exit_code"], 40);
    assert_eq!(summary[0]["summary_error_ids"], serde_json::json!(["E_APPLY_FAILED"]));
}
