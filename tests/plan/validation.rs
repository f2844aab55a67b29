use groundwork::api::errors::ApiError;
use groundwork::steps::{Applied, Declare, FnStep, Step};
use groundwork::types::SatisfiedState;

use crate::common::{api_for, cfg_for, recipe_plan, with_temp_root, FakeHost, TestEmitter};

fn noop(name: &str) -> FnStep {
    FnStep::new(name, |_| Ok(SatisfiedState::Satisfied), |_| Ok(Applied::changed()))
}

#[test]
fn duplicate_names_are_rejected() {
    let td = with_temp_root();
    let (host, _) = FakeHost::debian();
    let api = api_for(td.path(), host, &TestEmitter::default());
    let steps: Vec<Box<dyn Step>> = vec![Box::new(noop("a")), Box::new(noop("a"))];
    let err = api.plan(steps).unwrap_err();
    assert!(matches!(err, ApiError::InvalidPlan(ref m) if m.contains("duplicate")));
    assert_eq!(err.exit_code(), 70);
}

#[test]
fn dependencies_must_point_backwards() {
    let td = with_temp_root();
    let (host, _) = FakeHost::debian();
    let api = api_for(td.path(), host, &TestEmitter::default());
    let steps: Vec<Box<dyn Step>> = vec![Box::new(noop("a").after("b")), Box::new(noop("b"))];
    assert!(matches!(api.plan(steps), Err(ApiError::InvalidPlan(_))));

    let steps: Vec<Box<dyn Step>> = vec![Box::new(noop("b")), Box::new(noop("a").after("b"))];
    assert_eq!(api.plan(steps).unwrap().len(), 2);
}

#[test]
fn plan_facts_describe_every_step_and_ids_are_stable() {
    let td = with_temp_root();
    let (host, _) = FakeHost::debian();
    let facts = TestEmitter::default();
    let api = api_for(td.path(), host, &facts);
    let cfg = cfg_for(td.path());
    let plan = recipe_plan(&api, "camera-manager", &cfg);
    let first = facts.stage("plan");
    assert_eq!(first.len(), plan.len());
    let venv = first.iter().find(|f| f["step"] == "venv").unwrap();
    assert_eq!(venv["kind"], "venv");
    assert_eq!(venv["repair_policy"], "recreate_if_broken");
    let opt = first.iter().find(|f| f["step"] == "optional-packages").unwrap();
    assert_eq!(opt["optional"], true);

    facts.clear();
    let _again = recipe_plan(&api, "camera-manager", &cfg);
    let second = facts.stage("plan");
    let ids = |v: &[serde_json::Value]| -> Vec<serde_json::Value> {
        v.iter().map(|f| f["step_id"].clone()).collect()
    };
    assert_eq!(ids(&first), ids(&second));
    assert_eq!(first[0]["plan_id"], second[0]["plan_id"]);
}
