use std::path::Path;
use std::process::{Command, Output};

use crate::common::with_temp_root;

/// Run the binary against a staging root with apt forced, so nothing touches the host.
fn groundwork(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_groundwork"))
        .args(args)
        .env("GROUNDWORK_ROOT", root)
        .env("GROUNDWORK_PKG_MANAGER", "apt")
        .output()
        .unwrap()
}

fn write_recipe(dir: &Path, files: &str) -> String {
    let path = dir.join("recipe.json");
    std::fs::write(
        &path,
        format!(
            r#"{{"name": "x", "default_user": "x", "install_dir": "/srv/x", "files": [{files}]}}"#
        ),
    )
    .unwrap();
    path.display().to_string()
}

#[test]
fn unknown_template_variable_exits_with_plan_code() {
    let td = with_temp_root();
    let recipe = write_recipe(td.path(), r#"{"path": "/srv/x/a.conf", "content": "{{nope}}"}"#);
    let out = groundwork(td.path(), &["--recipe-file", &recipe, "--dry-run"]);
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert_eq!(out.status.code(), Some(70), "{stderr}");
    assert!(stderr.contains("unknown template variable"), "{stderr}");
}

#[test]
fn duplicate_step_names_exit_with_plan_code() {
    let td = with_temp_root();
    let entry = r#"{"path": "/srv/x/a.conf", "content": "a"}"#;
    let recipe = write_recipe(td.path(), &format!("{entry}, {entry}"));
    let out = groundwork(td.path(), &["--recipe-file", &recipe, "--dry-run"]);
    assert_eq!(out.status.code(), Some(70), "{}", String::from_utf8_lossy(&out.stderr));
}

#[test]
fn malformed_recipe_file_exits_with_plan_code() {
    let td = with_temp_root();
    let path = td.path().join("bad.json");
    std::fs::write(&path, r#"{"name": "x", "colour": "blue"}"#).unwrap();
    let out = groundwork(td.path(), &["--recipe-file", path.to_str().unwrap(), "--dry-run"]);
    assert_eq!(out.status.code(), Some(70));
}

#[test]
fn unknown_builtin_recipe_is_a_generic_failure() {
    let td = with_temp_root();
    let out = groundwork(td.path(), &["--recipe", "no-such-recipe", "--dry-run"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("camera-manager"));
}
