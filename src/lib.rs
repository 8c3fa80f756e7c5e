// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;

use std::path::Path;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, load_or_default};
use crate::dag::{Plan, StepKind};
use crate::errors::StepdagError;
use crate::exec::{EncodeCommand, GaplessFlags, stages_from_config};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - worker count resolution
/// - planning the two-stage pipeline over the given items
/// - running it on the worker pool (or printing it for `--dry-run`)
pub fn run(args: CliArgs) -> Result<()> {
    validate_items(&args.items)?;

    let cfg = load_or_default(args.config.as_deref().map(Path::new))?;
    let workers = resolve_workers(args.workers, &cfg);

    let stages = stages_from_config(&cfg);
    let plan = dag::plan(&args.items, &stages)?;

    if args.dry_run {
        print_dry_run(&plan, &cfg, workers);
        return Ok(());
    }

    info!(items = args.items.len(), workers, "encoding");
    let report = engine::run(&plan, workers)?;
    debug!(?report, "run report");
    Ok(())
}

/// Worker count: CLI flag, then `[scheduler].workers`, then one per
/// physical core. Zero means "not set" at every level.
pub fn resolve_workers(cli_workers: Option<usize>, cfg: &ConfigFile) -> usize {
    cli_workers
        .filter(|&n| n > 0)
        .or(Some(cfg.workers).filter(|&n| n > 0))
        .unwrap_or_else(num_cpus::get_physical)
        .max(1)
}

fn validate_items(items: &[String]) -> errors::Result<()> {
    if let Some(pos) = items.iter().position(|i| i.trim().is_empty()) {
        return Err(StepdagError::ConfigError(format!(
            "item #{} is empty; every item must name a file",
            pos + 1
        )));
    }
    Ok(())
}

/// Simple dry-run output: every step, its dependency count, successors
/// and the command it would run.
fn print_dry_run(plan: &Plan, cfg: &ConfigFile, workers: usize) {
    let flags = GaplessFlags::from_config(cfg);

    println!("stepdag dry-run");
    println!("  workers = {workers}");
    println!("  abort_on_failure = {}", cfg.abort_on_failure);
    println!();

    println!("steps ({}):", plan.len());
    for (id, step) in plan.iter() {
        println!("  {id} {}", step.kind());
        println!("      required: {}", step.required());
        if !step.successors().is_empty() {
            let succ: Vec<String> = step.successors().iter().map(|s| s.to_string()).collect();
            println!("      unblocks: {}", succ.join(", "));
        }
        let stage = match step.kind() {
            StepKind::Intermediate => &cfg.intermediate,
            StepKind::Output => &cfg.output,
            StepKind::Join => continue,
        };
        println!("      cmd: {}", EncodeCommand::build(stage, &flags, step.data()));
    }

    debug!("dry-run complete (no execution)");
}
