//! Converge a host onto a service recipe.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{ArgGroup, Parser};
use groundwork::adapters::FileLockManager;
use groundwork::api::errors::{exit_code_for, ApiError};
use groundwork::config::InstallConfig;
use groundwork::constants::DEFAULT_LOCK_PATH;
use groundwork::logging::{FactsEmitter, JsonlSink, JsonlWriter, StderrAudit};
use groundwork::policy::Policy;
use groundwork::recipes::{self, Recipe};
use groundwork::types::{ApplyMode, Error as StepError, SafePath};
use groundwork::Groundwork;

#[derive(Parser)]
#[command(name = "groundwork", about = "Idempotent service provisioning")]
#[command(group(ArgGroup::new("source").required(true).args(["recipe", "recipe_file"])))]
struct Args {
    /// Built-in recipe name
    #[arg(long)]
    recipe: Option<String>,

    /// JSON recipe file
    #[arg(long)]
    recipe_file: Option<PathBuf>,

    /// Probe and report; change nothing
    #[arg(long)]
    dry_run: bool,

    /// Write structured facts to stdout as JSON lines
    #[arg(long)]
    facts: bool,

    /// Run lock file (re-anchored under the install root)
    #[arg(long, default_value = DEFAULT_LOCK_PATH)]
    lock: PathBuf,

    /// Log debug messages to stderr
    #[arg(long, short)]
    verbose: bool,

    /// Account the service runs as; overrides GROUNDWORK_USER and the recipe default
    account: Option<String>,
}

fn main() {
    let args = Args::parse();
    let code = match run(&args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("groundwork: {e:#}");
            exit_code_of(&e)
        }
    };
    std::process::exit(code);
}

/// Exit code for an error that stopped the run before any step executed.
fn exit_code_of(e: &anyhow::Error) -> i32 {
    if let Some(api) = e.downcast_ref::<ApiError>() {
        return api.exit_code();
    }
    if let Some(step) = e.downcast_ref::<StepError>() {
        return exit_code_for(step.kind.into());
    }
    1
}

fn run(args: &Args) -> Result<i32> {
    if args.facts {
        converge(args, JsonlWriter::stdout())
    } else {
        converge(args, JsonlSink)
    }
}

fn load_recipe(args: &Args) -> Result<Recipe> {
    if let Some(path) = &args.recipe_file {
        return Recipe::load(path)
            .with_context(|| format!("loading recipe {}", path.display()));
    }
    let name = args.recipe.as_deref().unwrap_or_default();
    recipes::builtin(name).ok_or_else(|| {
        anyhow!(
            "unknown recipe '{name}' (built-in: {})",
            recipes::BUILTIN_NAMES.join(", ")
        )
    })
}

fn converge<E: FactsEmitter>(args: &Args, facts: E) -> Result<i32> {
    let cfg = InstallConfig::from_env()
        .context("reading GROUNDWORK_* configuration")?
        .with_account(args.account.clone());
    let recipe = load_recipe(args)?;
    let path_var = std::env::var_os("PATH");
    let backend = cfg.backend(path_var.as_deref())?;
    let steps = recipes::compile(&recipe, &cfg, backend)
        .with_context(|| format!("compiling recipe {}", recipe.name))?;

    // A staging root is not a live host: no root requirement, no service tooling check.
    let policy = if cfg.root == PathBuf::from("/") {
        Policy::production_preset()
    } else {
        Policy::default()
    };
    let lock_path = SafePath::under(&cfg.root, &args.lock)?.as_path();
    let audit = StderrAudit {
        min_level: if args.verbose {
            log::Level::Debug
        } else {
            log::Level::Info
        },
    };
    let api = Groundwork::new(facts, audit, policy)
        .with_root(cfg.root.clone())
        .with_lock_manager(Box::new(FileLockManager::new(lock_path)));

    let plan = api.plan(steps)?;
    let preflight = api.preflight(&plan)?;
    for w in &preflight.warnings {
        eprintln!("warning: {w}");
    }
    for s in &preflight.stops {
        eprintln!("stop: {s}");
    }

    let mode = if args.dry_run {
        ApplyMode::DryRun
    } else {
        ApplyMode::Commit
    };
    let report = api.apply(&plan, mode)?;
    for e in report.log.entries() {
        eprintln!("{:<28} {}", e.step, e.decision.as_str());
    }
    for w in &report.warnings {
        eprintln!("warning: {w}");
    }
    if let Some(f) = &report.failure {
        let at = if f.step.is_empty() { "run" } else { f.step.as_str() };
        eprintln!("failed at {at}: {} ({})", f.msg, f.error_id);
    }
    Ok(report.exit_code())
}
