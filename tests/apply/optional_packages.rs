use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use groundwork::steps::{Applied, Declare, FnStep, Step};
use groundwork::types::{ApplyMode, Decision, Error, SatisfiedState};

use crate::common::{api_for, cfg_for, recipe_plan, with_temp_root, FakeHost, TestEmitter};

#[test]
fn unavailable_optional_package_only_warns() {
    let td = with_temp_root();
    let (host, state) = FakeHost::debian();
    state.lock().unwrap().available.remove("ffmpeg");
    let facts = TestEmitter::default();
    let api = api_for(td.path(), host, &facts);
    let plan = recipe_plan(&api, "camera-manager", &cfg_for(td.path()));

    let report = api.apply(&plan, ApplyMode::Commit).unwrap();
    assert!(report.is_success(), "{:?}", report.failure);
    assert_eq!(report.log.decision_of("optional-packages"), Some(Decision::Applied));
    assert!(report.warnings.iter().any(|w| w.contains("ffmpeg")));
    {
        let s = state.lock().unwrap();
        assert!(s.installed.contains("v4l-utils"));
        assert!(!s.installed.contains("ffmpeg"));
    }

    // Still unavailable: nothing to do, still a warning.
    let again = api.apply(&plan, ApplyMode::Commit).unwrap();
    assert!(again.is_success());
    assert_eq!(again.log.decision_of("optional-packages"), Some(Decision::Skipped));
    assert!(again.warnings.iter().any(|w| w.contains("ffmpeg")));
}

#[test]
fn gui_packages_are_best_effort() {
    let td = with_temp_root();
    let (host, state) = FakeHost::debian();
    let facts = TestEmitter::default();
    let api = api_for(td.path(), host, &facts);
    let mut cfg = cfg_for(td.path());
    cfg.with_gui = true;
    let plan = recipe_plan(&api, "gcs-telemetry", &cfg);

    let report = api.apply(&plan, ApplyMode::Commit).unwrap();
    assert!(report.is_success(), "{:?}", report.failure);
    assert!(report.warnings.iter().any(|w| w.contains("python3-wxgtk4.0")));
    assert!(state.lock().unwrap().installed.contains("python3-matplotlib"));
}

#[test]
fn failing_optional_step_is_warned_and_the_run_continues() {
    let td = with_temp_root();
    let (host, _state) = FakeHost::debian();
    let facts = TestEmitter::default();
    let api = api_for(td.path(), host, &facts);
    let done = Arc::new(AtomicBool::new(false));
    let (seen, set) = (done.clone(), done.clone());
    let steps: Vec<Box<dyn Step>> = vec![
        Box::new(
            FnStep::new(
                "extras",
                |_| Ok(SatisfiedState::Missing),
                |_| Err(Error::apply_failed("mirror unreachable")),
            )
            .as_optional(),
        ),
        Box::new(
            FnStep::new(
                "core",
                move |_| {
                    Ok(if seen.load(Ordering::SeqCst) {
                        SatisfiedState::Satisfied
                    } else {
                        SatisfiedState::Missing
                    })
                },
                move |_| {
                    set.store(true, Ordering::SeqCst);
                    Ok(Applied::changed())
                },
            )
            .after("extras"),
        ),
    ];
    let plan = api.plan(steps).unwrap();
    let report = api.apply(&plan, ApplyMode::Commit).unwrap();
    assert!(report.is_success(), "{:?}", report.failure);
    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.log.decision_of("extras"), Some(Decision::Warned));
    assert_eq!(report.log.decision_of("core"), Some(Decision::Applied));
    assert!(done.load(Ordering::SeqCst));
    assert!(report.warnings.iter().any(|w| w.contains("mirror unreachable")));
}
