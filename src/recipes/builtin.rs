//! Recipes shipped with the binary.
use super::{DirSpec, FileSpec, LauncherSpec, PythonSpec, Recipe, ServiceSpec};

pub const BUILTIN_NAMES: &[&str] = &["camera-manager", "gcs-telemetry", "file-share"];

/// Look up a built-in recipe by name.
#[must_use]
pub fn builtin(name: &str) -> Option<Recipe> {
    match name {
        "camera-manager" => Some(camera_manager()),
        "gcs-telemetry" => Some(gcs_telemetry()),
        "file-share" => Some(file_share()),
        _ => None,
    }
}

fn strings(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| (*s).to_string()).collect()
}

fn dir(path: &str, mode: u32, owned: bool) -> DirSpec {
    DirSpec {
        path: path.to_string(),
        mode,
        owned,
    }
}

/// Web front end for network cameras, installed into a virtualenv.
fn camera_manager() -> Recipe {
    Recipe {
        name: "camera-manager".into(),
        default_user: "motion".into(),
        system_user: true,
        user_groups: strings(&["video"]),
        install_dir: "/opt/motioneye".into(),
        packages: strings(&[
            "python3",
            "python3-venv",
            "python3-dev",
            "libcurl4-openssl-dev",
            "libssl-dev",
            "motion",
        ]),
        optional_packages: strings(&["ffmpeg", "v4l-utils"]),
        gui_packages: Vec::new(),
        directories: vec![
            dir("/etc/motioneye", 0o755, false),
            dir("/var/lib/motioneye", 0o750, true),
            dir("/var/log/motioneye", 0o750, true),
        ],
        files: vec![FileSpec {
            path: "/etc/motioneye/motioneye.conf".into(),
            content: "conf_path /etc/motioneye\n\
                      run_path /run/motioneye\n\
                      log_path /var/log/motioneye\n\
                      media_path /var/lib/motioneye\n\
                      log_level info\n\
                      listen 0.0.0.0\n\
                      port 8765\n"
                .into(),
            mode: 0o644,
            owned: false,
        }],
        python: Some(PythonSpec {
            venv: None,
            requirement: "motioneye".into(),
            prerelease: true,
            launchers: vec![LauncherSpec {
                binary: "meyectl".into(),
                link: "/usr/local/bin/meyectl".into(),
            }],
        }),
        service: Some(ServiceSpec {
            unit: "motioneye".into(),
            description: "motionEye camera manager".into(),
            exec_start: "{{bin}}/meyectl startserver -c /etc/motioneye/motioneye.conf".into(),
            working_dir: Some("/var/lib/motioneye".into()),
            environment: Vec::new(),
            after: strings(&["network-online.target"]),
            health_cmd: None,
        }),
    }
}

/// MAVLink ground-station proxy forwarding a serial autopilot link over UDP.
fn gcs_telemetry() -> Recipe {
    Recipe {
        name: "gcs-telemetry".into(),
        default_user: "gcs".into(),
        system_user: false,
        user_groups: strings(&["dialout"]),
        install_dir: "/opt/mavproxy".into(),
        packages: strings(&[
            "python3",
            "python3-venv",
            "python3-dev",
            "libxml2-dev",
            "libxslt1-dev",
        ]),
        optional_packages: strings(&["python3-lxml"]),
        gui_packages: strings(&["python3-wxgtk4.0", "python3-matplotlib", "python3-opencv"]),
        directories: vec![dir("/var/lib/mavproxy", 0o750, true)],
        files: Vec::new(),
        python: Some(PythonSpec {
            venv: None,
            requirement: "MAVProxy".into(),
            prerelease: false,
            launchers: vec![LauncherSpec {
                binary: "mavproxy.py".into(),
                link: "/usr/local/bin/mavproxy.py".into(),
            }],
        }),
        service: Some(ServiceSpec {
            unit: "mavproxy".into(),
            description: "MAVProxy telemetry forwarder".into(),
            exec_start: "{{bin}}/mavproxy.py --master=/dev/ttyACM0 \
                         --out=udp:127.0.0.1:14550 --daemon \
                         --state-basedir=/var/lib/mavproxy"
                .into(),
            working_dir: Some("/var/lib/mavproxy".into()),
            environment: vec![("HOME".into(), "/var/lib/mavproxy".into())],
            after: strings(&["network-online.target"]),
            health_cmd: Some(strings(&["{{bin}}/mavproxy.py", "--version"])),
        }),
    }
}

/// Peer-to-peer file synchronization daemon from the distribution archive.
fn file_share() -> Recipe {
    Recipe {
        name: "file-share".into(),
        default_user: "syncthing".into(),
        system_user: true,
        user_groups: Vec::new(),
        install_dir: "/var/lib/syncthing".into(),
        packages: strings(&["syncthing"]),
        optional_packages: Vec::new(),
        gui_packages: Vec::new(),
        directories: Vec::new(),
        files: vec![FileSpec {
            path: "/etc/default/syncthing".into(),
            content: "STNORESTART=1\nSTHOMEDIR={{install_dir}}\n".into(),
            mode: 0o644,
            owned: false,
        }],
        python: None,
        service: Some(ServiceSpec {
            unit: "syncthing".into(),
            description: "Syncthing file synchronization".into(),
            exec_start: "/usr/bin/syncthing serve --no-browser --home={{install_dir}}".into(),
            working_dir: Some("{{install_dir}}".into()),
            environment: Vec::new(),
            after: strings(&["network.target"]),
            health_cmd: Some(strings(&["syncthing", "--version"])),
        }),
    }
}
