use groundwork::policy::Policy;
use groundwork::types::{ApplyMode, ErrorKind};
use groundwork::Groundwork;

use crate::common::{cfg_for, mutating_calls, recipe_plan, with_temp_root, FakeHost, TestAudit, TestEmitter};

fn strict_policy() -> Policy {
    let mut p = Policy::fast();
    p.preconditions.required_tools = vec!["groundwork-test-missing-tool".into()];
    p
}

#[test]
fn missing_required_tool_stops_commit_with_e_precondition() {
    let td = with_temp_root();
    let (host, state) = FakeHost::debian();
    let facts = TestEmitter::default();
    let api = Groundwork::new(facts.clone(), TestAudit, strict_policy())
        .with_runner(Box::new(host))
        .with_root(td.path())
        .with_search_path(td.path().as_os_str());
    let plan = recipe_plan(&api, "file-share", &cfg_for(td.path()));

    let pre = api.preflight(&plan).unwrap();
    assert!(!pre.ok);
    assert!(pre.stops.iter().any(|s| s.contains("groundwork-test-missing-tool")));

    let report = api.apply(&plan, ApplyMode::Commit).unwrap();
    let failure = report.failure.as_ref().unwrap();
    assert_eq!(failure.kind, ErrorKind::PreconditionFailed);
    assert_eq!(failure.error_id, "E_PRECONDITION");
    assert_eq!(report.exit_code(), 10);
    assert!(mutating_calls(&state).is_empty());

    // Dry runs still report what would change.
    assert!(api.apply(&plan, ApplyMode::DryRun).unwrap().is_success());
}

#[test]
fn override_preflight_lets_commit_proceed() {
    let td = with_temp_root();
    let (host, _state) = FakeHost::debian();
    let facts = TestEmitter::default();
    let mut policy = strict_policy();
    policy.apply.override_preflight = true;
    let api = Groundwork::new(facts.clone(), TestAudit, policy)
        .with_runner(Box::new(host))
        .with_root(td.path())
        .with_search_path(td.path().as_os_str());
    let plan = recipe_plan(&api, "file-share", &cfg_for(td.path()));
    let report = api.apply(&plan, ApplyMode::Commit).unwrap();
    assert!(report.is_success(), "{:?}", report.failure);
}
