// src/engine/worker.rs

//! Worker thread body.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, error, trace, warn};

use crate::dag::{Plan, Step, StepId};
use crate::engine::context::{Context, Dispatch};
use crate::engine::mailbox::Wake;
use crate::errors::Result;

/// Per-worker counters, folded into the run report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Steps whose operation this worker ran.
    pub executed: usize,
    /// Of those, how many panicked.
    pub panicked: usize,
    /// Times a ready step could not be reported because the backchannel
    /// was full.
    pub deferred: usize,
}

/// Run steps from the dispatch mailbox until a shutdown sentinel arrives.
///
/// Successors that become ready are kept in a thread-local FIFO and pushed
/// to the backchannel without blocking. While that FIFO is non-empty the
/// worker waits on dispatch *and* backchannel capacity together, so a
/// buffered step is never stranded behind an idle dispatch queue.
pub fn worker_loop(worker: usize, plan: &Plan, ctx: &Context) -> Result<WorkerStats> {
    let mut pending: VecDeque<StepId> = VecDeque::new();
    let mut stats = WorkerStats::default();

    debug!(worker, "worker started");

    loop {
        let mut slot = if pending.is_empty() {
            ctx.wait_for_step()?
        } else {
            match ctx.wait_for_step_or_capacity()? {
                Wake::Read(slot) => slot,
                Wake::Allocated(capacity) => {
                    match pending.pop_front() {
                        Some(step) => {
                            trace!(worker, step = %step, "reporting deferred ready step");
                            ctx.report_ready(capacity, step)?;
                        }
                        None => ctx.backchannel().free(capacity)?,
                    }
                    flush_ready(worker, ctx, &mut pending, &mut stats)?;
                    continue;
                }
            }
        };

        let message = slot.take();
        let id = match message {
            Some(Dispatch::Run(id)) => id,
            Some(Dispatch::Shutdown) | None => {
                if !pending.is_empty() {
                    warn!(
                        worker,
                        pending = pending.len(),
                        "shutdown received with unreported ready steps"
                    );
                }
                ctx.free_step(slot)?;
                debug!(worker, ?stats, "worker exiting");
                return Ok(stats);
            }
        };

        let step = plan.step(id);
        execute(worker, id, step, &mut stats);

        for &successor in step.successors() {
            if plan.step(successor).signal_arrival() {
                trace!(worker, step = %id, successor = %successor, "successor became ready");
                pending.push_back(successor);
            }
        }

        flush_ready(worker, ctx, &mut pending, &mut stats)?;
        ctx.free_step(slot)?;
    }
}

fn execute(worker: usize, id: StepId, step: &Step, stats: &mut WorkerStats) {
    let Some(operation) = step.operation() else {
        warn!(worker, step = %id, "join step was dispatched to a worker; nothing to run");
        return;
    };

    debug!(
        worker,
        step = %id,
        kind = %step.kind(),
        name = %step.data().name,
        "executing step"
    );

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| operation.execute(step.data())));
    stats.executed += 1;

    if let Err(payload) = outcome {
        stats.panicked += 1;
        error!(
            worker,
            step = %id,
            kind = %step.kind(),
            name = %step.data().name,
            panic = %panic_message(payload.as_ref()),
            "operation panicked; treating step as complete"
        );
    }
}

/// Push buffered ready steps to the backchannel until it is full.
fn flush_ready(
    worker: usize,
    ctx: &Context,
    pending: &mut VecDeque<StepId>,
    stats: &mut WorkerStats,
) -> Result<()> {
    while let Some(&step) = pending.front() {
        if !ctx.try_report_ready(step)? {
            stats.deferred += 1;
            debug!(
                worker,
                step = %step,
                pending = pending.len(),
                "backchannel full; deferring ready step"
            );
            break;
        }
        pending.pop_front();
    }
    Ok(())
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
