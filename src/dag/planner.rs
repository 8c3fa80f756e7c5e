// src/dag/planner.rs

//! Builds the two-stage pipeline DAG from an ordered item list.
//!
//! For items `a, b, c` the plan looks like:
//!
//! ```text
//!   intermediate(a)   intermediate(b)   intermediate(c)
//!        |      \      /    |     \      /     |
//!        |       \    /     |      \    /      |
//!     output(a)   output(b) (needs a, b, c)   output(c)
//!          \          |          /
//!                   join
//! ```
//!
//! Each output step waits on its own intermediate step and on those of its
//! immediate neighbours, because the encoder reads neighbouring files for
//! gapless boundaries.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::dag::plan::{Plan, PlanBuilder};
use crate::dag::step::{Operation, StepData, StepId, StepKind};
use crate::errors::Result;

/// Maps an item name to the name used by its second stage.
pub type Rename = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// The two operations of the pipeline plus the identity transform between
/// them.
#[derive(Clone)]
pub struct Stages {
    pub intermediate: Arc<dyn Operation>,
    pub output: Arc<dyn Operation>,
    pub rename: Rename,
}

impl fmt::Debug for Stages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stages").finish_non_exhaustive()
    }
}

impl Stages {
    pub fn new(
        intermediate: Arc<dyn Operation>,
        output: Arc<dyn Operation>,
        rename: Rename,
    ) -> Self {
        Self {
            intermediate,
            output,
            rename,
        }
    }
}

/// Plan `2 * items.len() + 1` steps for the given ordered items.
pub fn plan<S: AsRef<str>>(items: &[S], stages: &Stages) -> Result<Plan> {
    let n = items.len();
    let mut builder = PlanBuilder::with_capacity(2 * n + 1);

    let mut intermediates: Vec<StepId> = Vec::with_capacity(n);
    for (i, item) in items.iter().enumerate() {
        let (previous, next) = neighbours(items, i);
        let data = StepData::with_neighbours(
            item.as_ref(),
            previous.map(str::to_string),
            next.map(str::to_string),
        );
        let id = builder.add_step(
            StepKind::Intermediate,
            Some(Arc::clone(&stages.intermediate)),
            data,
            0,
        );
        intermediates.push(id);
    }

    let mut outputs: Vec<StepId> = Vec::with_capacity(n);
    for (i, item) in items.iter().enumerate() {
        let (previous, next) = neighbours(items, i);
        let required = 1 + usize::from(previous.is_some()) + usize::from(next.is_some());
        let data = StepData::with_neighbours(
            (stages.rename)(item.as_ref()),
            previous.map(|s| (stages.rename)(s)),
            next.map(|s| (stages.rename)(s)),
        );
        let id = builder.add_step(
            StepKind::Output,
            Some(Arc::clone(&stages.output)),
            data,
            required,
        );

        builder.add_successor(intermediates[i], id)?;
        if previous.is_some() {
            builder.add_successor(intermediates[i - 1], id)?;
        }
        if next.is_some() {
            builder.add_successor(intermediates[i + 1], id)?;
        }
        outputs.push(id);
    }

    let join = builder.add_join(n);
    for &output in &outputs {
        builder.add_successor(output, join)?;
    }

    debug!(items = n, steps = builder.len(), "planned pipeline");
    builder.build()
}

fn neighbours<S: AsRef<str>>(items: &[S], i: usize) -> (Option<&str>, Option<&str>) {
    let previous = i.checked_sub(1).map(|p| items[p].as_ref());
    let next = items.get(i + 1).map(|s| s.as_ref());
    (previous, next)
}
