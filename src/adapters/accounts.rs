//! Account database lookups through `getent`, and account creation.
use super::command::{run_checked, spawn, CommandLine, CommandRunner};
use crate::types::errors::{Error, ErrorKind, Result};

/// One `passwd` entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
    pub home: String,
    pub shell: String,
}

/// Parse a `name:pw:uid:gid:gecos:home:shell` line.
fn parse_passwd(line: &str) -> Option<Account> {
    let f: Vec<&str> = line.trim().split(':').collect();
    if f.len() < 7 {
        return None;
    }
    Some(Account {
        name: f[0].to_string(),
        uid: f[2].parse().ok()?,
        gid: f[3].parse().ok()?,
        home: f[5].to_string(),
        shell: f[6].to_string(),
    })
}

/// Look up a user; `Ok(None)` when the account does not exist.
///
/// # Errors
///
/// Returns `PreconditionFailed` when `getent` cannot run and `Io` on unparsable output.
pub fn lookup_user(runner: &dyn CommandRunner, name: &str) -> Result<Option<Account>> {
    let out = spawn(runner, &CommandLine::new("getent").args(["passwd", name]))?;
    if !out.success() {
        return Ok(None);
    }
    parse_passwd(&out.stdout)
        .map(Some)
        .ok_or_else(|| Error::new(ErrorKind::Io, format!("unparsable passwd entry for {name}")))
}

/// Look up a group id; `Ok(None)` when the group does not exist.
///
/// # Errors
///
/// Returns `PreconditionFailed` when `getent` cannot run and `Io` on unparsable output.
pub fn lookup_group(runner: &dyn CommandRunner, name: &str) -> Result<Option<u32>> {
    let out = spawn(runner, &CommandLine::new("getent").args(["group", name]))?;
    if !out.success() {
        return Ok(None);
    }
    out.stdout
        .trim()
        .split(':')
        .nth(2)
        .and_then(|g| g.parse().ok())
        .map(Some)
        .ok_or_else(|| Error::new(ErrorKind::Io, format!("unparsable group entry for {name}")))
}

/// Supplementary and primary group names of `user`.
///
/// # Errors
///
/// Returns `PreconditionFailed` when `id` cannot run and `ApplyFailed` when it fails.
pub fn groups_of(runner: &dyn CommandRunner, user: &str) -> Result<Vec<String>> {
    let out = run_checked(runner, &CommandLine::new("id").args(["-nG", user]))?;
    Ok(out.stdout.split_whitespace().map(str::to_string).collect())
}

/// Resolve `user[:group]` to numeric ids. The group defaults to the user's primary group.
///
/// # Errors
///
/// Returns `PreconditionFailed` when the user or group does not exist.
pub fn resolve_owner(
    runner: &dyn CommandRunner,
    user: &str,
    group: Option<&str>,
) -> Result<(u32, u32)> {
    let acct = lookup_user(runner, user)?
        .ok_or_else(|| Error::precondition(format!("unknown user '{user}'")))?;
    let gid = match group {
        Some(g) => lookup_group(runner, g)?
            .ok_or_else(|| Error::precondition(format!("unknown group '{g}'")))?,
        None => acct.gid,
    };
    Ok((acct.uid, gid))
}

/// Requested shape of a service account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserSpec {
    pub name: String,
    pub home: String,
    pub shell: String,
    pub system: bool,
    pub groups: Vec<String>,
}

/// `useradd` for a new account.
#[must_use]
pub fn useradd_cmd(spec: &UserSpec) -> CommandLine {
    let mut cmd = CommandLine::new("useradd");
    if spec.system {
        cmd = cmd.arg("--system");
    }
    cmd = cmd
        .args(["--create-home", "--home-dir", spec.home.as_str()])
        .args(["--shell", spec.shell.as_str()])
        .arg("--user-group");
    if !spec.groups.is_empty() {
        cmd = cmd.args(["--groups".to_string(), spec.groups.join(",")]);
    }
    cmd.arg(spec.name.as_str())
}

/// `usermod -aG` adding supplementary groups to an existing account.
#[must_use]
pub fn usermod_groups_cmd(user: &str, groups: &[String]) -> CommandLine {
    CommandLine::new("usermod").args(["-aG".to_string(), groups.join(","), user.to_string()])
}
