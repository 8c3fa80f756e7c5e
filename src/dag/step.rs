// src/dag/step.rs

//! DAG nodes and the operation capability they carry.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Stable index of a [`Step`] inside a [`Plan`](crate::dag::Plan).
///
/// Successor lists store these instead of references, so the arena may grow
/// freely while planning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StepId(pub usize);

impl StepId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which part of the pipeline a step belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// First stage; runs as soon as the worker pool picks it up.
    Intermediate,
    /// Second stage; waits on its own first stage and its neighbours'.
    Output,
    /// Synthetic terminal node. Carries no operation.
    Join,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StepKind::Intermediate => "intermediate",
            StepKind::Output => "output",
            StepKind::Join => "join",
        };
        f.write_str(s)
    }
}

/// Identity payload handed to an [`Operation`].
///
/// The scheduler never looks inside; it is only passed through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepData {
    pub name: String,
    /// Item before this one in the input sequence, if any.
    pub previous: Option<String>,
    /// Item after this one in the input sequence, if any.
    pub next: Option<String>,
}

impl StepData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            previous: None,
            next: None,
        }
    }

    pub fn with_neighbours(
        name: impl Into<String>,
        previous: Option<String>,
        next: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            previous,
            next,
        }
    }
}

/// Synchronous unit of work attached to a step.
///
/// Implementations may block for as long as they like (e.g. waiting on a
/// child process). The worker that runs them is unavailable for that time.
pub trait Operation: Send + Sync {
    fn execute(&self, data: &StepData);
}

impl<F> Operation for F
where
    F: Fn(&StepData) + Send + Sync,
{
    fn execute(&self, data: &StepData) {
        self(data)
    }
}

/// A node in the scheduling DAG.
///
/// Everything except `arrived` is fixed once planning is over.
pub struct Step {
    kind: StepKind,
    operation: Option<Arc<dyn Operation>>,
    data: StepData,
    required: usize,
    arrived: AtomicUsize,
    successors: Vec<StepId>,
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("kind", &self.kind)
            .field("data", &self.data)
            .field("required", &self.required)
            .field("arrived", &self.arrived.load(Ordering::Relaxed))
            .field("successors", &self.successors)
            .field("has_operation", &self.operation.is_some())
            .finish()
    }
}

impl Step {
    pub fn new(
        kind: StepKind,
        operation: Option<Arc<dyn Operation>>,
        data: StepData,
        required: usize,
    ) -> Self {
        Self {
            kind,
            operation,
            data,
            required,
            arrived: AtomicUsize::new(0),
            successors: Vec::new(),
        }
    }

    /// Record that `step` must be signalled when this one completes.
    ///
    /// Only valid while planning; `&mut self` keeps it out of the run.
    pub fn add_successor(&mut self, step: StepId) {
        self.successors.push(step);
    }

    /// Deliver one predecessor-completion signal.
    ///
    /// Returns `true` for exactly one caller: the one whose increment makes
    /// `arrived` equal `required`.
    pub fn signal_arrival(&self) -> bool {
        self.arrived.fetch_add(1, Ordering::AcqRel) + 1 == self.required
    }

    pub fn kind(&self) -> StepKind {
        self.kind
    }

    pub fn operation(&self) -> Option<&Arc<dyn Operation>> {
        self.operation.as_ref()
    }

    pub fn data(&self) -> &StepData {
        &self.data
    }

    pub fn required(&self) -> usize {
        self.required
    }

    pub fn arrived(&self) -> usize {
        self.arrived.load(Ordering::Acquire)
    }

    pub fn successors(&self) -> &[StepId] {
        &self.successors
    }

    /// `true` for the join step.
    pub fn is_join(&self) -> bool {
        self.operation.is_none()
    }
}
