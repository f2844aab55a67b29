//! Service recipes: declarative descriptions compiled into a [`Plan`](crate::types::Plan).
//!
//! Recipes are plain serde data, either built in (see [`builtin`]) or loaded from JSON.
//! Strings may reference `{{user}}`, `{{install_dir}}`, `{{venv}}` and `{{bin}}`.
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::errors::{Error, ErrorKind, Result};

pub mod builtin;
pub mod compile;

pub use builtin::{builtin, BUILTIN_NAMES};
pub use compile::compile;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Recipe {
    pub name: String,
    pub default_user: String,
    #[serde(default)]
    pub system_user: bool,
    /// Supplementary groups for the service account (e.g. `video`, `dialout`).
    #[serde(default)]
    pub user_groups: Vec<String>,
    pub install_dir: String,
    /// Mandatory packages; any unavailable one halts the run.
    #[serde(default)]
    pub packages: Vec<String>,
    #[serde(default)]
    pub optional_packages: Vec<String>,
    /// Optional packages requested only when GUI components are enabled.
    #[serde(default)]
    pub gui_packages: Vec<String>,
    #[serde(default)]
    pub directories: Vec<DirSpec>,
    #[serde(default)]
    pub files: Vec<FileSpec>,
    #[serde(default)]
    pub python: Option<PythonSpec>,
    #[serde(default)]
    pub service: Option<ServiceSpec>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DirSpec {
    pub path: String,
    #[serde(with = "octal", default = "default_dir_mode")]
    pub mode: u32,
    /// Owned by the service account rather than root.
    #[serde(default)]
    pub owned: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileSpec {
    pub path: String,
    pub content: String,
    #[serde(with = "octal", default = "default_file_mode")]
    pub mode: u32,
    #[serde(default)]
    pub owned: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PythonSpec {
    /// Defaults to `{{install_dir}}/venv`.
    #[serde(default)]
    pub venv: Option<String>,
    pub requirement: String,
    /// The application is only published as a pre-release.
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub launchers: Vec<LauncherSpec>,
}

/// `link` becomes a symlink to `{{bin}}/<binary>`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LauncherSpec {
    pub binary: String,
    pub link: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceSpec {
    pub unit: String,
    pub description: String,
    pub exec_start: String,
    #[serde(default)]
    pub working_dir: Option<String>,
    #[serde(default)]
    pub environment: Vec<(String, String)>,
    #[serde(default)]
    pub after: Vec<String>,
    /// Command that must succeed once the unit is active.
    #[serde(default)]
    pub health_cmd: Option<Vec<String>>,
}

const fn default_dir_mode() -> u32 {
    0o755
}

const fn default_file_mode() -> u32 {
    0o644
}

mod octal {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(mode: &u32, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format!("{mode:04o}"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
        let s = String::deserialize(d)?;
        u32::from_str_radix(s.trim_start_matches("0o"), 8)
            .ok()
            .filter(|m| *m <= 0o7777)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid octal mode '{s}'")))
    }
}

impl Recipe {
    /// # Errors
    ///
    /// Returns `InvalidPlan` when the JSON does not describe a recipe.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| Error::new(ErrorKind::InvalidPlan, format!("invalid recipe: {e}")))
    }

    /// # Errors
    ///
    /// Returns `Io` when the file cannot be read and `InvalidPlan` when it does not parse.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io("read recipe", path, &e))?;
        Self::from_json(&text)
    }
}

/// Values substituted into recipe strings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateVars {
    pub user: String,
    pub install_dir: String,
    pub venv: String,
}

impl TemplateVars {
    /// Substitute every known placeholder.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPlan` when an unknown `{{...}}` placeholder remains.
    pub fn render(&self, template: &str) -> Result<String> {
        let bin = format!("{}/bin", self.venv);
        let out = template
            .replace("{{user}}", &self.user)
            .replace("{{install_dir}}", &self.install_dir)
            .replace("{{venv}}", &self.venv)
            .replace("{{bin}}", &bin);
        if let Some(start) = out.find("{{") {
            let rest = &out[start..];
            let end = rest.find("}}").map_or(rest.len(), |e| e + 2);
            return Err(Error::new(
                ErrorKind::InvalidPlan,
                format!("unknown template variable {}", &rest[..end]),
            ));
        }
        Ok(out)
    }
}
