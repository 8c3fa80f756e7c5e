// src/engine/driver.rs

//! The scheduling loop and the public `run` entry points.

use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::dag::{Plan, Stages, StepId, plan};
use crate::engine::context::Context;
use crate::engine::worker::{WorkerStats, panic_message, worker_loop};
use crate::errors::{Result, StepdagError};

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub workers: usize,
    /// Size of the plan, join included.
    pub steps: usize,
    /// Run messages sent on the dispatch mailbox (sentinels excluded).
    pub dispatched: usize,
    /// Operations executed across all workers.
    pub executed: usize,
    pub panicked: usize,
    /// Ready-step reports a worker had to hold back because the
    /// backchannel was full.
    pub deferred_reports: usize,
    /// Peak number of outstanding dispatch slots.
    pub dispatch_peak: usize,
    /// Peak number of outstanding backchannel slots.
    pub backchannel_peak: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Finished,
}

/// Plan `items` through `stages` and run the result on `workers` threads.
pub fn run_items<S: AsRef<str>>(items: &[S], stages: &Stages, workers: usize) -> Result<RunReport> {
    let plan = plan(items, stages)?;
    run(&plan, workers)
}

/// Execute every step of `plan` on a pool of `workers` threads.
///
/// Blocks until the join step has fired and every worker has exited.
/// A plan can only be run once.
pub fn run(plan: &Plan, workers: usize) -> Result<RunReport> {
    if workers == 0 {
        return Err(StepdagError::NoWorkers);
    }
    plan.validate()?;

    let ctx = Context::new(workers)?;
    let started = Instant::now();
    info!(workers, steps = plan.len(), "starting run");

    let (dispatched, stats) = thread::scope(|scope| -> Result<(usize, Vec<WorkerStats>)> {
        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let ctx = &ctx;
            let spawned = thread::Builder::new()
                .name(format!("stepdag-worker-{worker}"))
                .spawn_scoped(scope, move || worker_loop(worker, plan, ctx));
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    // Release the workers that did start so the scope can join them.
                    for _ in &handles {
                        ctx.queue_shutdown()?;
                    }
                    return Err(err.into());
                }
            }
        }

        let driven = drive(plan, &ctx, workers);

        let mut stats = Vec::with_capacity(workers);
        for handle in handles {
            match handle.join() {
                Ok(result) => stats.push(result?),
                Err(payload) => {
                    return Err(StepdagError::WorkerPanicked(panic_message(payload.as_ref())));
                }
            }
        }
        Ok((driven?, stats))
    })?;

    let report = RunReport {
        workers,
        steps: plan.len(),
        dispatched,
        executed: stats.iter().map(|s| s.executed).sum(),
        panicked: stats.iter().map(|s| s.panicked).sum(),
        deferred_reports: stats.iter().map(|s| s.deferred).sum(),
        dispatch_peak: ctx.dispatch().peak(),
        backchannel_peak: ctx.backchannel().peak(),
        elapsed: started.elapsed(),
    };

    info!(
        executed = report.executed,
        panicked = report.panicked,
        deferred = report.deferred_reports,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "run finished"
    );
    Ok(report)
}

/// Seed the roots, pump ready steps back into dispatch until the join
/// fires, then send one shutdown sentinel per worker.
///
/// Returns the number of steps dispatched.
fn drive(plan: &Plan, ctx: &Context, workers: usize) -> Result<usize> {
    let mut dispatched = 0;
    let mut finished = false;

    'seed: for root in plan.roots() {
        // Workers may be stuck on a full backchannel while we wait for
        // dispatch capacity; empty it first.
        while let Some(ready) = ctx.try_take_ready()? {
            if route(plan, ctx, ready, &mut dispatched)? == Flow::Finished {
                finished = true;
                break 'seed;
            }
        }
        if route(plan, ctx, root, &mut dispatched)? == Flow::Finished {
            finished = true;
            break 'seed;
        }
    }

    if !finished {
        debug!(dispatched, "seeding done; pumping backchannel");
        while route(plan, ctx, ctx.wait_for_ready()?, &mut dispatched)? == Flow::Continue {}
    }

    debug!(workers, "join reached; broadcasting shutdown");
    for _ in 0..workers {
        ctx.queue_shutdown()?;
    }
    Ok(dispatched)
}

fn route(plan: &Plan, ctx: &Context, id: StepId, dispatched: &mut usize) -> Result<Flow> {
    if plan.step(id).is_join() {
        return Ok(Flow::Finished);
    }
    ctx.queue(id)?;
    *dispatched += 1;
    Ok(Flow::Continue)
}
