use std::os::unix::fs::PermissionsExt;

use groundwork::adapters::PackageBackend;
use groundwork::recipes::{self, Recipe};
use groundwork::types::{ApplyMode, Decision};

use crate::common::{api_for, cfg_for, with_temp_root, FakeHost, TestEmitter};

#[test]
fn telemetry_recipe_converges_for_an_explicit_account() {
    let td = with_temp_root();
    let (host, state) = FakeHost::debian();
    let facts = TestEmitter::default();
    let api = api_for(td.path(), host, &facts);
    let cfg = cfg_for(td.path()).with_account(Some("pilot".into()));
    let recipe = recipes::builtin("gcs-telemetry").unwrap();
    let plan = api
        .plan(recipes::compile(&recipe, &cfg, PackageBackend::Apt).unwrap())
        .unwrap();

    let report = api.apply(&plan, ApplyMode::Commit).unwrap();
    assert!(report.is_success(), "{:?}", report.failure);
    {
        let s = state.lock().unwrap();
        assert!(s.users.contains_key("pilot"));
        assert!(!s.users.contains_key("gcs"));
        assert!(s.memberships["pilot"].contains("dialout"));
        assert!(s.units["mavproxy.service"].enabled);
        assert!(s.units["mavproxy.service"].active);
    }
    let unit = std::fs::read_to_string(td.path().join("etc/systemd/system/mavproxy.service")).unwrap();
    assert!(unit.contains("User=pilot\n"));
    assert!(unit.contains("ExecStart=/opt/mavproxy/venv/bin/mavproxy.py --master=/dev/ttyACM0"));
    let state_dir = td.path().join("var/lib/mavproxy");
    let mode = std::fs::metadata(&state_dir).unwrap().permissions().mode() & 0o7777;
    assert_eq!(mode, 0o750);
}

#[test]
fn missing_supplementary_group_is_added_on_rerun() {
    let td = with_temp_root();
    let (host, state) = FakeHost::debian();
    let facts = TestEmitter::default();
    let api = api_for(td.path(), host, &facts);
    let recipe = recipes::builtin("camera-manager").unwrap();
    let plan = api
        .plan(recipes::compile(&recipe, &cfg_for(td.path()), PackageBackend::Apt).unwrap())
        .unwrap();
    assert!(api.apply(&plan, ApplyMode::Commit).unwrap().is_success());

    state
        .lock()
        .unwrap()
        .memberships
        .get_mut("motion")
        .unwrap()
        .remove("video");
    let report = api.apply(&plan, ApplyMode::Commit).unwrap();
    assert_eq!(report.log.decision_of("user"), Some(Decision::Applied));
    assert!(state.lock().unwrap().memberships["motion"].contains("video"));
}

#[test]
fn recipe_loaded_from_json_runs_like_a_builtin() {
    let td = with_temp_root();
    let file = td.path().join("demo.json");
    std::fs::write(
        &file,
        r#"{
            "name": "demo",
            "default_user": "demo",
            "system_user": true,
            "install_dir": "/srv/demo",
            "packages": ["python3"],
            "files": [{"path": "/srv/demo/demo.env", "content": "OWNER={{user}}\n", "mode": "0640", "owned": true}],
            "service": {
                "unit": "demo",
                "description": "Demo",
                "exec_start": "{{install_dir}}/run"
            }
        }"#,
    )
    .unwrap();
    let recipe = Recipe::load(&file).unwrap();

    let root = td.path().join("root");
    std::fs::create_dir(&root).unwrap();
    let (host, _state) = FakeHost::debian();
    let facts = TestEmitter::default();
    let api = api_for(&root, host, &facts);
    let steps = recipes::compile(&recipe, &cfg_for(&root), PackageBackend::Apt).unwrap();
    let plan = api.plan(steps).unwrap();
    let report = api.apply(&plan, ApplyMode::Commit).unwrap();
    assert!(report.is_success(), "{:?}", report.failure);

    let env = root.join("srv/demo/demo.env");
    assert_eq!(std::fs::read_to_string(&env).unwrap(), "OWNER=demo\n");
    assert_eq!(std::fs::metadata(&env).unwrap().permissions().mode() & 0o7777, 0o640);
}
