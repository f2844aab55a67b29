use groundwork::steps::{Applied, FnStep, Step};
use groundwork::types::{ApplyMode, Decision, ErrorKind, RepairPolicy, SatisfiedState};

use crate::common::{api_for, cfg_for, recipe_plan, with_temp_root, FakeHost, TestEmitter};

#[test]
fn corrupted_venv_is_recreated_and_the_package_reinstalled() {
    let td = with_temp_root();
    let (host, state) = FakeHost::debian();
    let facts = TestEmitter::default();
    let api = api_for(td.path(), host, &facts);
    let plan = recipe_plan(&api, "camera-manager", &cfg_for(td.path()));
    assert!(api.apply(&plan, ApplyMode::Commit).unwrap().is_success());

    let venv = td.path().join("opt/motioneye/venv");
    std::fs::write(venv.join("bin/python"), "broken").unwrap();
    std::fs::write(venv.join("stale-marker"), "x").unwrap();

    let report = api.apply(&plan, ApplyMode::Commit).unwrap();
    assert!(report.is_success(), "{:?}", report.failure);
    assert_eq!(report.log.decision_of("venv"), Some(Decision::Repaired));
    assert_eq!(report.log.decision_of("python-package"), Some(Decision::Applied));
    assert_eq!(report.log.decision_of("link:meyectl"), Some(Decision::Skipped));
    assert!(!venv.join("stale-marker").exists());
    assert!(venv.join("bin/meyectl").is_file());
    let entry = report.log.entries().iter().find(|e| e.step == "venv").unwrap();
    assert_eq!(entry.probed, Some(SatisfiedState::Broken));
    assert!(state
        .lock()
        .unwrap()
        .calls
        .iter()
        .any(|c| c.ends_with("-m pip install --quiet --pre motioneye")));

    let settled = api.apply(&plan, ApplyMode::Commit).unwrap();
    assert_eq!(settled.log.count(Decision::Skipped), plan.len());
}

#[test]
fn broken_state_that_survives_repair_fails_the_run() {
    let td = with_temp_root();
    let (host, _state) = FakeHost::debian();
    let facts = TestEmitter::default();
    let api = api_for(td.path(), host, &facts);
    let steps: Vec<Box<dyn Step>> = vec![Box::new(
        FnStep::new(
            "stuck",
            |_| Ok(SatisfiedState::Broken),
            |_| Ok(Applied::changed()),
        )
        .with_policy(RepairPolicy::RecreateIfBroken),
    )];
    let plan = api.plan(steps).unwrap();
    let report = api.apply(&plan, ApplyMode::Commit).unwrap();
    let failure = report.failure.as_ref().unwrap();
    assert_eq!(failure.kind, ErrorKind::StateBroken);
    assert_eq!(failure.error_id, "E_STATE_BROKEN");
    assert_eq!(report.exit_code(), 30);
}

#[test]
fn apply_that_does_not_converge_is_a_failure() {
    let td = with_temp_root();
    let (host, _state) = FakeHost::debian();
    let facts = TestEmitter::default();
    let api = api_for(td.path(), host, &facts);
    let steps: Vec<Box<dyn Step>> = vec![Box::new(FnStep::new(
        "liar",
        |_| Ok(SatisfiedState::Missing),
        |_| Ok(Applied::changed()),
    ))];
    let plan = api.plan(steps).unwrap();
    let report = api.apply(&plan, ApplyMode::Commit).unwrap();
    let failure = report.failure.as_ref().unwrap();
    assert_eq!(failure.kind, ErrorKind::ApplyFailed);
    assert!(failure.msg.contains("did not converge"));
}

#[test]
fn drifted_config_file_is_restored_with_a_backup() {
    let td = with_temp_root();
    let (host, _state) = FakeHost::debian();
    let facts = TestEmitter::default();
    let api = api_for(td.path(), host, &facts);
    let plan = recipe_plan(&api, "file-share", &cfg_for(td.path()));
    assert!(api.apply(&plan, ApplyMode::Commit).unwrap().is_success());

    let conf = td.path().join("etc/default/syncthing");
    let desired = std::fs::read_to_string(&conf).unwrap();
    std::fs::write(&conf, "edited by hand\n").unwrap();

    let report = api.apply(&plan, ApplyMode::Commit).unwrap();
    assert!(report.is_success());
    assert_eq!(
        report.log.decision_of("file:/etc/default/syncthing"),
        Some(Decision::Applied)
    );
    assert_eq!(std::fs::read_to_string(&conf).unwrap(), desired);
    let backups = groundwork::fs::list_backups(&conf, "groundwork");
    assert_eq!(backups.len(), 1);
    assert_eq!(std::fs::read_to_string(&backups[0]).unwrap(), "edited by hand\n");
}
