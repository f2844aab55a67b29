//! Recipe → ordered step list.
//!
//! The order is fixed: package index, mandatory packages, optional packages, account,
//! directories, configuration files, virtualenv, application package, launchers,
//! ownership, service unit. Every host path is re-anchored under the configured root.
use std::path::Path;

use super::{Recipe, TemplateVars};
use crate::adapters::accounts::UserSpec;
use crate::adapters::command::CommandLine;
use crate::adapters::pkg::PackageBackend;
use crate::config::InstallConfig;
use crate::constants::SYSTEMD_UNIT_DIR;
use crate::steps::{
    Declare, EnsureDir, EnsureFile, EnsureLink, EnsureOwnership, EnsureUser, EnsureVenv,
    OptionalPackages, Owner, PythonPackage, RefreshIndex, RequiredPackages, ServiceUnit, Step,
    UnitSpec,
};
use crate::types::errors::{Error, ErrorKind, Result};
use crate::types::SafePath;

const INDEX: &str = "package-index";
const PACKAGES: &str = "packages";
const OPTIONAL: &str = "optional-packages";
const USER: &str = "user";
const INSTALL_DIR: &str = "install-dir";
const VENV: &str = "venv";
const APP: &str = "python-package";
const OWNERSHIP: &str = "ownership";
const SERVICE: &str = "service";

fn dir_step_name(path: &str) -> String {
    format!("dir:{path}")
}

/// Compile `recipe` for one invocation.
///
/// # Errors
///
/// Returns `InvalidPlan` for unknown template variables or a malformed service name, and
/// `InvalidPath` when a recipe path is relative or escapes the root.
pub fn compile(
    recipe: &Recipe,
    cfg: &InstallConfig,
    backend: PackageBackend,
) -> Result<Vec<Box<dyn Step>>> {
    let root = cfg.root.as_path();
    let user = cfg
        .target_user
        .clone()
        .unwrap_or_else(|| recipe.default_user.clone());
    if user.trim().is_empty() {
        return Err(Error::new(ErrorKind::InvalidPlan, "empty service account name"));
    }
    let install_dir = match &cfg.install_dir {
        Some(p) => p.display().to_string(),
        None => recipe.install_dir.clone(),
    };
    let mut vars = TemplateVars {
        user: user.clone(),
        install_dir: install_dir.clone(),
        venv: format!("{install_dir}/venv"),
    };
    if let Some(venv) = recipe.python.as_ref().and_then(|p| p.venv.as_deref()) {
        vars.venv = vars.render(venv)?;
    }
    let owner = Owner::user(&user);
    let mut steps: Vec<Box<dyn Step>> = Vec::new();

    steps.push(Box::new(RefreshIndex::new(
        INDEX,
        backend,
        recipe.packages.clone(),
    )));
    steps.push(Box::new(
        RequiredPackages::new(PACKAGES, backend, recipe.packages.clone()).after(INDEX),
    ));
    let mut optional = recipe.optional_packages.clone();
    if cfg.with_gui {
        optional.extend(recipe.gui_packages.iter().cloned());
    }
    if !optional.is_empty() {
        steps.push(Box::new(
            OptionalPackages::new(OPTIONAL, backend, optional)
                .after(INDEX)
                .as_optional(),
        ));
    }

    steps.push(Box::new(EnsureUser::new(
        USER,
        UserSpec {
            name: user.clone(),
            home: install_dir.clone(),
            shell: if recipe.system_user {
                "/usr/sbin/nologin".into()
            } else {
                "/bin/bash".into()
            },
            system: recipe.system_user,
            groups: recipe.user_groups.clone(),
        },
    )));

    let install_path = host_path(root, &install_dir)?;
    steps.push(Box::new(
        EnsureDir::new(INSTALL_DIR, install_path.clone(), 0o755)
            .owned_by(owner.clone())
            .after(USER),
    ));
    let mut dir_names: Vec<(String, String)> = vec![(install_dir.clone(), INSTALL_DIR.to_string())];
    for d in &recipe.directories {
        let path = vars.render(&d.path)?;
        let name = dir_step_name(&path);
        let mut step = EnsureDir::new(name.as_str(), host_path(root, &path)?, d.mode).after(USER);
        if d.owned {
            step = step.owned_by(owner.clone());
        }
        steps.push(Box::new(step));
        dir_names.push((path, name));
    }

    let mut file_names = Vec::new();
    for f in &recipe.files {
        let path = vars.render(&f.path)?;
        let content = vars.render(&f.content)?;
        let name = format!("file:{path}");
        let mut step = EnsureFile::new(name.as_str(), host_path(root, &path)?, content, f.mode);
        if f.owned {
            step = step.owned_by(owner.clone()).after(USER);
        }
        if let Some(dep) = containing_dir(&dir_names, &path) {
            step = step.after(dep);
        }
        steps.push(Box::new(step));
        file_names.push(name);
    }

    let mut service_deps = vec![PACKAGES.to_string(), USER.to_string()];
    service_deps.extend(file_names);

    if let Some(py) = &recipe.python {
        let venv_path = host_path(root, &vars.venv)?;
        steps.push(Box::new(
            EnsureVenv::new(VENV, venv_path.clone())
                .after(PACKAGES)
                .after(INSTALL_DIR),
        ));
        let mut flags = cfg.pip_flags();
        flags.prerelease |= py.prerelease;
        steps.push(Box::new(
            PythonPackage::new(APP, venv_path, py.requirement.clone(), flags).after(VENV),
        ));
        service_deps.push(APP.to_string());
        for l in &py.launchers {
            let name = format!("link:{}", l.binary);
            let source = host_path(root, &format!("{}/bin/{}", vars.venv, l.binary))?;
            let target = host_path(root, &vars.render(&l.link)?)?;
            steps.push(Box::new(EnsureLink::new(name.as_str(), source, target).after(APP)));
            service_deps.push(name);
        }
    }

    let chown_after = if recipe.python.is_some() { APP } else { INSTALL_DIR };
    steps.push(Box::new(
        EnsureOwnership::new(OWNERSHIP, install_path, owner).after(chown_after),
    ));
    service_deps.push(OWNERSHIP.to_string());

    if let Some(svc) = &recipe.service {
        let unit = UnitSpec {
            name: svc.unit.clone(),
            description: svc.description.clone(),
            after: svc.after.clone(),
            user: user.clone(),
            group: None,
            working_dir: svc.working_dir.as_deref().map(|w| vars.render(w)).transpose()?,
            exec_start: vars.render(&svc.exec_start)?,
            environment: svc
                .environment
                .iter()
                .map(|(k, v)| -> Result<(String, String)> { Ok((k.clone(), vars.render(v)?)) })
                .collect::<Result<_>>()?,
            restart: Some("on-failure".into()),
        };
        let unit_dir = host_path(root, SYSTEMD_UNIT_DIR)?;
        let mut step = ServiceUnit::new(SERVICE, unit, &unit_dir)?;
        if let Some(cmd) = &svc.health_cmd {
            step = step.with_health_cmd(health_cmd(&vars, cmd)?);
        }
        for dep in service_deps {
            step = step.after(dep);
        }
        steps.push(Box::new(step));
    }

    Ok(steps)
}

fn host_path(root: &Path, path: &str) -> Result<SafePath> {
    if !path.starts_with('/') {
        return Err(Error::new(
            ErrorKind::InvalidPath,
            format!("recipe path must be absolute: {path}"),
        ));
    }
    SafePath::under(root, path)
}

/// Deepest declared directory containing `path`.
fn containing_dir<'a>(dirs: &'a [(String, String)], path: &str) -> Option<&'a str> {
    dirs.iter()
        .filter(|(d, _)| Path::new(path).starts_with(d) && d != path)
        .max_by_key(|(d, _)| d.len())
        .map(|(_, name)| name.as_str())
}

fn health_cmd(vars: &TemplateVars, argv: &[String]) -> Result<CommandLine> {
    let mut parts = argv.iter().map(|a| vars.render(a));
    let program = parts
        .next()
        .transpose()?
        .ok_or_else(|| Error::new(ErrorKind::InvalidPlan, "empty health command"))?;
    parts.try_fold(CommandLine::new(program), |cmd, a| -> Result<CommandLine> {
        Ok(cmd.arg(a?))
    })
}
