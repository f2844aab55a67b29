//! Shared test helpers for the groundwork integration tests.
#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use log::Level;
use serde_json::Value;

use groundwork::adapters::{CommandLine, CommandOutput, CommandRunner, PackageBackend};
use groundwork::config::InstallConfig;
use groundwork::logging::{AuditSink, FactsEmitter};
use groundwork::policy::Policy;
use groundwork::recipes;
use groundwork::types::Plan;
use groundwork::Groundwork;

/// A simple in-memory emitter to capture facts during tests.
#[derive(Clone, Default, Debug)]
pub struct TestEmitter {
    pub events: Arc<Mutex<Vec<(String, String, String, Value)>>>,
}

impl FactsEmitter for TestEmitter {
    fn emit(&self, subsystem: &str, event: &str, decision: &str, fields: Value) {
        self.events
            .lock()
            .unwrap()
            .push((subsystem.into(), event.into(), decision.into(), fields));
    }
}

impl TestEmitter {
    /// Fields of every fact whose `stage` equals `stage`.
    pub fn stage(&self, stage: &str) -> Vec<Value> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, _, _, f)| f.get("stage").and_then(Value::as_str) == Some(stage))
            .map(|(_, _, _, f)| f.clone())
            .collect()
    }

    pub fn fields(&self) -> Vec<Value> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(_, _, _, f)| f.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

/// A no-op audit sink for tests.
#[derive(Clone, Default)]
pub struct TestAudit;

impl AuditSink for TestAudit {
    fn log(&self, _level: Level, _msg: &str) {}
}

/// Create a temporary root directory suitable for building SafePaths.
pub fn with_temp_root() -> tempfile::TempDir {
    tempfile::tempdir().expect("tempdir")
}

#[derive(Clone, Debug, Default)]
pub struct Unit {
    pub enabled: bool,
    pub active: bool,
}

/// Observable state of the fake host.
#[derive(Debug, Default)]
pub struct HostState {
    /// Names the package index can resolve.
    pub available: BTreeSet<String>,
    pub installed: BTreeSet<String>,
    /// user -> (uid, gid)
    pub users: BTreeMap<String, (u32, u32)>,
    /// group -> gid
    pub groups: BTreeMap<String, u32>,
    /// user -> group names, primary included
    pub memberships: BTreeMap<String, BTreeSet<String>>,
    pub units: BTreeMap<String, Unit>,
    /// Units that never come up after a restart.
    pub dead_units: BTreeSet<String>,
    /// venv dir -> installed distributions
    pub pip: BTreeMap<PathBuf, BTreeSet<String>>,
    /// distribution -> console scripts written to `bin/`
    pub scripts: BTreeMap<String, Vec<String>>,
    /// Programs that exit non-zero regardless of arguments.
    pub failing: BTreeSet<String>,
    /// Remaining `apt-get update` calls that fail before one succeeds.
    pub flaky_refreshes: u32,
    /// Every command line run, in order.
    pub calls: Vec<String>,
}

/// In-memory model of a Debian host: apt, the account database, systemd and venvs.
///
/// Everything except virtualenvs lives in memory. `python3 -m venv` writes a real
/// `bin/python` into the requested directory; an interpreter whose content is `broken`
/// fails its smoke test.
#[derive(Debug)]
pub struct FakeHost {
    state: Arc<Mutex<HostState>>,
}

impl FakeHost {
    /// The ids accounts get; the current process's, so chown works unprivileged.
    pub fn ids() -> (u32, u32) {
        (
            rustix::process::geteuid().as_raw(),
            rustix::process::getegid().as_raw(),
        )
    }

    pub fn new(state: HostState) -> (Self, Arc<Mutex<HostState>>) {
        let state = Arc::new(Mutex::new(state));
        (
            Self {
                state: state.clone(),
            },
            state,
        )
    }

    /// A host whose index carries every package the built-in recipes ask for.
    pub fn debian() -> (Self, Arc<Mutex<HostState>>) {
        let mut s = HostState::default();
        for p in [
            "python3",
            "python3-venv",
            "python3-dev",
            "libcurl4-openssl-dev",
            "libssl-dev",
            "motion",
            "ffmpeg",
            "v4l-utils",
            "libxml2-dev",
            "libxslt1-dev",
            "python3-lxml",
            "python3-matplotlib",
            "syncthing",
        ] {
            s.available.insert(p.to_string());
        }
        for g in ["video", "dialout"] {
            s.groups.insert(g.to_string(), Self::ids().1);
        }
        s.scripts.insert("motioneye".into(), vec!["meyectl".into()]);
        s.scripts.insert("MAVProxy".into(), vec!["mavproxy.py".into()]);
        Self::new(s)
    }

    fn lock(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap()
    }
}

fn ok(stdout: impl Into<String>) -> std::io::Result<CommandOutput> {
    Ok(CommandOutput::ok(stdout))
}

fn fail(code: i32, stderr: &str) -> std::io::Result<CommandOutput> {
    Ok(CommandOutput::failed(code, stderr))
}

fn strs(args: &[String]) -> Vec<&str> {
    args.iter().map(String::as_str).collect()
}

impl CommandRunner for FakeHost {
    fn run(&self, cmd: &CommandLine) -> std::io::Result<CommandOutput> {
        let mut s = self.lock();
        s.calls.push(cmd.to_string());
        if s.failing.contains(&cmd.program) {
            return fail(1, "simulated failure");
        }
        let args = strs(&cmd.args);
        match (cmd.program.as_str(), args.as_slice()) {
            ("dpkg-query", [.., pkg]) => {
                if s.installed.contains(*pkg) {
                    ok("install ok installed")
                } else {
                    fail(1, "dpkg-query: no packages found matching")
                }
            }
            ("apt-cache", ["show", .., pkg]) => {
                if s.available.contains(*pkg) {
                    ok(format!("Package: {pkg}\nVersion: 1.0\n"))
                } else {
                    fail(100, "E: No packages found")
                }
            }
            ("apt-get", ["update", ..]) => {
                if s.flaky_refreshes > 0 {
                    s.flaky_refreshes -= 1;
                    return fail(100, "E: Temporary failure resolving 'deb.debian.org'");
                }
                ok("")
            }
            ("apt-get", ["install", rest @ ..]) => {
                let pkgs: Vec<&str> = rest.iter().copied().filter(|a| !a.starts_with('-')).collect();
                if let Some(p) = pkgs.iter().find(|p| !s.available.contains(**p)) {
                    return fail(100, &format!("E: Unable to locate package {p}"));
                }
                for p in pkgs {
                    s.installed.insert(p.to_string());
                }
                ok("")
            }
            ("getent", ["passwd", name]) => match s.users.get(*name) {
                Some((uid, gid)) => ok(format!("{name}:x:{uid}:{gid}::/home/{name}:/bin/sh\n")),
                None => fail(2, ""),
            },
            ("getent", ["group", name]) => match s.groups.get(*name) {
                Some(gid) => ok(format!("{name}:x:{gid}:\n")),
                None => fail(2, ""),
            },
            ("id", ["-nG", user]) => match s.memberships.get(*user) {
                Some(g) => ok(g.iter().cloned().collect::<Vec<_>>().join(" ")),
                None => fail(1, "no such user"),
            },
            ("useradd", [.., name]) => {
                if s.users.contains_key(*name) {
                    return fail(9, "useradd: user already exists");
                }
                let ids = FakeHost::ids();
                s.users.insert(name.to_string(), ids);
                s.groups.insert(name.to_string(), ids.1);
                let mut member: BTreeSet<String> = BTreeSet::from([name.to_string()]);
                if let Some(i) = args.iter().position(|a| *a == "--groups") {
                    member.extend(args[i + 1].split(',').map(str::to_string));
                }
                s.memberships.insert(name.to_string(), member);
                ok("")
            }
            ("usermod", ["-aG", groups, user]) => {
                let groups: Vec<String> = groups.split(',').map(str::to_string).collect();
                match s.memberships.get_mut(*user) {
                    Some(m) => {
                        m.extend(groups);
                        ok("")
                    }
                    None => fail(6, "usermod: user does not exist"),
                }
            }
            ("systemctl", ["daemon-reload"]) => ok(""),
            ("systemctl", ["enable", unit]) => {
                s.units.entry(unit.to_string()).or_default().enabled = true;
                ok("")
            }
            ("systemctl", ["restart", unit]) => {
                let dead = s.dead_units.contains(*unit);
                s.units.entry(unit.to_string()).or_default().active = !dead;
                ok("")
            }
            ("systemctl", ["is-active", unit]) => match s.units.get(*unit) {
                Some(u) if u.active => ok("active\n"),
                _ => Ok(CommandOutput {
                    code: Some(3),
                    stdout: "inactive\n".into(),
                    stderr: String::new(),
                }),
            },
            ("systemctl", ["is-enabled", unit]) => match s.units.get(*unit) {
                Some(u) if u.enabled => ok("enabled\n"),
                _ => Ok(CommandOutput {
                    code: Some(1),
                    stdout: "disabled\n".into(),
                    stderr: String::new(),
                }),
            },
            ("python3", ["-m", "venv", dir]) => {
                let venv = PathBuf::from(dir);
                std::fs::create_dir_all(venv.join("bin"))?;
                std::fs::write(venv.join("bin/python"), "#!fake-python\n")?;
                s.pip.insert(venv, BTreeSet::new());
                ok("")
            }
            (prog, rest) if prog.ends_with("/bin/python") => {
                let interp = Path::new(prog);
                let venv = interp
                    .parent()
                    .and_then(Path::parent)
                    .map(Path::to_path_buf)
                    .unwrap_or_default();
                // Missing interpreters fail to spawn, like the real thing.
                let body = std::fs::read_to_string(interp)?;
                if body.trim() == "broken" {
                    return fail(1, "Fatal Python error: init_fs_encoding");
                }
                python(&mut s, &venv, rest)
            }
            _ => ok(""),
        }
    }
}

fn python(s: &mut HostState, venv: &Path, args: &[&str]) -> std::io::Result<CommandOutput> {
    match args {
        ["-c", _] => ok(format!("{}\n", venv.display())),
        ["-m", "pip", "show", "--quiet", dist] => {
            if s.pip.get(venv).is_some_and(|d| d.contains(*dist)) {
                ok("")
            } else {
                fail(1, "WARNING: Package(s) not found")
            }
        }
        ["-m", "pip", "install", "--upgrade", "--quiet", "pip", ..] => ok(""),
        ["-m", "pip", "install", rest @ ..] => {
            let Some(req) = rest.iter().rev().find(|a| !a.starts_with('-')) else {
                return fail(2, "no requirement");
            };
            let scripts = s.scripts.get(*req).cloned().unwrap_or_default();
            for script in scripts {
                std::fs::write(venv.join("bin").join(script), "#!fake-python\n")?;
            }
            s.pip.entry(venv.to_path_buf()).or_default().insert(req.to_string());
            ok("")
        }
        _ => ok(""),
    }
}

pub type TestApi = Groundwork<TestEmitter, TestAudit>;

/// Configuration installing into a staging `root` with apt forced.
pub fn cfg_for(root: &Path) -> InstallConfig {
    InstallConfig {
        root: root.to_path_buf(),
        pkg_manager: Some(PackageBackend::Apt),
        ..InstallConfig::default()
    }
}

/// An API driving `host`, rooted at `root`, with short waits and optional locking.
pub fn api_for(root: &Path, host: FakeHost, facts: &TestEmitter) -> TestApi {
    Groundwork::new(facts.clone(), TestAudit, Policy::fast())
        .with_runner(Box::new(host))
        .with_root(root)
}

/// Compile a built-in recipe and validate it through `api`.
pub fn recipe_plan(api: &TestApi, name: &str, cfg: &InstallConfig) -> Plan {
    let recipe = recipes::builtin(name).expect("built-in recipe");
    let steps = recipes::compile(&recipe, cfg, PackageBackend::Apt).expect("compile");
    api.plan(steps).expect("plan")
}

/// Commands that change host state, as recorded by [`FakeHost`].
pub fn mutating_calls(state: &Arc<Mutex<HostState>>) -> Vec<String> {
    state
        .lock()
        .unwrap()
        .calls
        .iter()
        .filter(|c| {
            c.starts_with("apt-get")
                || c.starts_with("useradd")
                || c.starts_with("usermod")
                || c.starts_with("python3 -m venv")
                || c.contains(" -m pip install")
                || c.starts_with("systemctl enable")
                || c.starts_with("systemctl restart")
                || c.starts_with("systemctl daemon-reload")
        })
        .cloned()
        .collect()
}
