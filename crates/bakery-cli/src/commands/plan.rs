//! `bake plan` — Resolve a build spec into execution plans.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::Args;

use bakery_common::types::BuilderName;
use bakery_spec::{ExecutionPlan, ProcessEnv, SpecResolver};

/// Arguments for the `plan` command.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Path to the build-spec document.
    #[arg(default_value = bakery_common::constants::DEFAULT_TEMPLATE_FILE)]
    pub file: PathBuf,

    /// Variable override as `name=value`. Repeatable.
    #[arg(short = 'v', long = "var", value_name = "NAME=VALUE", value_parser = parse_override)]
    pub vars: Vec<(String, String)>,

    /// Resolve only the named builder. Repeatable.
    #[arg(long = "only", value_name = "BUILDER")]
    pub only: Vec<String>,

    /// Write one `<builder>.json` per plan into this directory instead of
    /// printing to stdout.
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,
}

fn parse_override(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(name, value)| (name.to_owned(), value.to_owned()))
        .ok_or_else(|| format!("expected NAME=VALUE, got \"{raw}\""))
}

/// Executes the `plan` command.
///
/// # Errors
///
/// Returns an error if loading, resolution, or plan output fails.
pub fn execute(args: PlanArgs) -> anyhow::Result<()> {
    tracing::info!(file = %args.file.display(), "resolving build spec");
    let resolver = SpecResolver::from_path(&args.file)?;
    let overrides: BTreeMap<String, String> = args.vars.iter().cloned().collect();

    let plans: Vec<ExecutionPlan> = if args.only.is_empty() {
        resolver.resolve(&ProcessEnv, &overrides)?
    } else {
        args.only
            .iter()
            .map(|name| {
                resolver.resolve_builder(&BuilderName::new(name.clone()), &ProcessEnv, &overrides)
            })
            .collect::<Result<_, _>>()?
    };

    match args.out_dir {
        Some(ref dir) => write_plans(dir, &plans)?,
        None => print_plans(&plans)?,
    }
    Ok(())
}

fn write_plans(dir: &Path, plans: &[ExecutionPlan]) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)?;
    for plan in plans {
        let path = dir.join(format!("{}.json", plan.name()));
        std::fs::write(&path, plan.to_json()?)?;
        println!("wrote {}", path.display());
    }
    Ok(())
}

fn print_plans(plans: &[ExecutionPlan]) -> anyhow::Result<()> {
    for plan in plans {
        println!("# {}", plan.name());
        println!("{}", plan.to_json()?);
    }
    Ok(())
}
