use groundwork::types::{ApplyMode, Decision, ErrorKind};

use crate::common::{api_for, cfg_for, recipe_plan, with_temp_root, FakeHost, TestEmitter};

#[test]
fn unit_that_never_becomes_active_fails_health() {
    let td = with_temp_root();
    let (host, state) = FakeHost::debian();
    state
        .lock()
        .unwrap()
        .dead_units
        .insert("syncthing.service".into());
    let facts = TestEmitter::default();
    let api = api_for(td.path(), host, &facts);
    let plan = recipe_plan(&api, "file-share", &cfg_for(td.path()));

    let report = api.apply(&plan, ApplyMode::Commit).unwrap();
    let failure = report.failure.as_ref().expect("health failure");
    assert_eq!(failure.step, "service");
    assert_eq!(failure.kind, ErrorKind::HealthCheckFailed);
    assert_eq!(failure.error_id, "E_HEALTH");
    assert_eq!(report.exit_code(), 50);

    let health = facts.stage("health");
    assert_eq!(health.len(), 1);
    assert_eq!(health[0]["decision"], "failure");
    assert_eq!(health[0]["active"], false);
}

#[test]
fn failing_health_command_fails_the_service_step() {
    let td = with_temp_root();
    let (host, state) = FakeHost::debian();
    state.lock().unwrap().failing.insert("syncthing".into());
    let facts = TestEmitter::default();
    let api = api_for(td.path(), host, &facts);
    let plan = recipe_plan(&api, "file-share", &cfg_for(td.path()));

    let report = api.apply(&plan, ApplyMode::Commit).unwrap();
    let failure = report.failure.as_ref().expect("health failure");
    assert_eq!(failure.error_id, "E_HEALTH");
    assert!(failure.msg.contains("health command"));
}

#[test]
fn changed_unit_definition_is_rewritten_and_restarted() {
    let td = with_temp_root();
    let (host, state) = FakeHost::debian();
    let facts = TestEmitter::default();
    let api = api_for(td.path(), host, &facts);
    let cfg = cfg_for(td.path());
    let plan = recipe_plan(&api, "file-share", &cfg);
    assert!(api.apply(&plan, ApplyMode::Commit).unwrap().is_success());
    assert!(facts.stage("health").iter().all(|h| h["decision"] == "success"));

    let unit = td.path().join("etc/systemd/system/syncthing.service");
    std::fs::write(&unit, "[Unit]\nDescription=stale\n").unwrap();
    let restarts = |s: &crate::common::HostState| {
        s.calls.iter().filter(|c| c.as_str() == "systemctl restart syncthing.service").count()
    };
    let before = restarts(&state.lock().unwrap());

    let report = api.apply(&plan, ApplyMode::Commit).unwrap();
    assert!(report.is_success());
    assert_eq!(report.log.decision_of("service"), Some(Decision::Applied));
    assert_eq!(restarts(&state.lock().unwrap()), before + 1);
    assert!(std::fs::read_to_string(&unit).unwrap().contains("Description=Syncthing"));
    assert_eq!(groundwork::fs::list_backups(&unit, "groundwork").len(), 1);
}
