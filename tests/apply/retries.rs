use groundwork::types::{ApplyMode, Decision, ErrorKind};

use crate::common::{api_for, cfg_for, recipe_plan, with_temp_root, FakeHost, TestEmitter};

#[test]
fn transient_index_refresh_failures_are_retried() {
    let td = with_temp_root();
    let (host, state) = FakeHost::debian();
    state.lock().unwrap().flaky_refreshes = 2;
    let facts = TestEmitter::default();
    let api = api_for(td.path(), host, &facts);
    let plan = recipe_plan(&api, "file-share", &cfg_for(td.path()));

    let report = api.apply(&plan, ApplyMode::Commit).unwrap();
    assert!(report.is_success(), "run failed: {:?}", report.failure);
    assert_eq!(report.log.decision_of("package-index"), Some(Decision::Applied));
    assert!(report
        .warnings
        .iter()
        .any(|w| w.starts_with("package-index: ") && w.contains("3 attempts")));
}

#[test]
fn refresh_gives_up_after_bounded_attempts() {
    let td = with_temp_root();
    let (host, state) = FakeHost::debian();
    state.lock().unwrap().flaky_refreshes = 10;
    let facts = TestEmitter::default();
    let api = api_for(td.path(), host, &facts);
    let plan = recipe_plan(&api, "file-share", &cfg_for(td.path()));

    let report = api.apply(&plan, ApplyMode::Commit).unwrap();
    let failure = report.failure.as_ref().unwrap();
    assert_eq!(failure.step, "package-index");
    assert_eq!(failure.kind, ErrorKind::ApplyFailed);
    assert!(failure.msg.contains("after 3 attempts"), "{}", failure.msg);
    assert_eq!(report.exit_code(), 40);
    assert_eq!(report.log.decision_of("packages"), None);
    // 7 refreshes are still pending
    assert_eq!(state.lock().unwrap().flaky_refreshes, 7);
}
