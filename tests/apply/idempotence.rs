use groundwork::types::{ApplyMode, Decision};

use crate::common::{api_for, cfg_for, mutating_calls, recipe_plan, with_temp_root, FakeHost, TestEmitter};

#[test]
fn second_commit_run_skips_every_step() {
    let td = with_temp_root();
    let (host, state) = FakeHost::debian();
    let facts = TestEmitter::default();
    let api = api_for(td.path(), host, &facts);
    let plan = recipe_plan(&api, "camera-manager", &cfg_for(td.path()));

    let first = api.apply(&plan, ApplyMode::Commit).unwrap();
    assert!(first.is_success(), "first run failed: {:?}", first.failure);
    assert_eq!(first.exit_code(), 0);
    assert_eq!(first.log.decision_of("packages"), Some(Decision::Applied));
    assert_eq!(first.log.decision_of("venv"), Some(Decision::Applied));
    assert_eq!(first.log.decision_of("service"), Some(Decision::Applied));
    assert!(td.path().join("etc/motioneye/motioneye.conf").is_file());
    assert!(td.path().join("etc/systemd/system/motioneye.service").is_file());
    assert_eq!(
        std::fs::read_link(td.path().join("usr/local/bin/meyectl")).unwrap(),
        td.path().join("opt/motioneye/venv/bin/meyectl")
    );
    assert!(state.lock().unwrap().users.contains_key("motion"));

    let before = mutating_calls(&state).len();
    let second = api.apply(&plan, ApplyMode::Commit).unwrap();
    assert!(second.is_success());
    assert_eq!(second.log.entries().len(), plan.len());
    assert_eq!(second.log.count(Decision::Skipped), plan.len());
    assert_eq!(mutating_calls(&state).len(), before, "second run mutated the host");
}

#[test]
fn each_step_emits_probe_and_result_facts() {
    let td = with_temp_root();
    let (host, _state) = FakeHost::debian();
    let facts = TestEmitter::default();
    let api = api_for(td.path(), host, &facts);
    let plan = recipe_plan(&api, "file-share", &cfg_for(td.path()));
    let report = api.apply(&plan, ApplyMode::Commit).unwrap();
    assert!(report.is_success());

    assert_eq!(facts.stage("step.probe").len(), plan.len());
    let results = facts.stage("step.result");
    assert_eq!(results.len(), plan.len());
    for r in &results {
        assert_eq!(r["schema_version"], 1);
        assert!(r.get("plan_id").is_some());
        assert!(r.get("step").is_some());
    }
    let summary = facts.stage("apply.result");
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0]["decision"], "success");
}
