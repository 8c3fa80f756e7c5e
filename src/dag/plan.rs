// src/dag/plan.rs

//! Arena of steps for a single run, plus structural validation.

use std::sync::Arc;

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, Reversed};
use tracing::debug;

use crate::dag::step::{Operation, Step, StepData, StepId, StepKind};
use crate::errors::{Result, StepdagError};

/// Incrementally assembles a [`Plan`].
///
/// Steps live in a `Vec` and are referred to by [`StepId`], so adding steps
/// never invalidates earlier edges.
#[derive(Debug, Default)]
pub struct PlanBuilder {
    steps: Vec<Step>,
}

impl PlanBuilder {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            steps: Vec::with_capacity(capacity),
        }
    }

    /// Append a step and return its id.
    pub fn add_step(
        &mut self,
        kind: StepKind,
        operation: Option<Arc<dyn Operation>>,
        data: StepData,
        required: usize,
    ) -> StepId {
        let id = StepId(self.steps.len());
        self.steps.push(Step::new(kind, operation, data, required));
        id
    }

    /// Append the operation-less join step.
    pub fn add_join(&mut self, required: usize) -> StepId {
        self.add_step(StepKind::Join, None, StepData::default(), required)
    }

    /// Make `to` a successor of `from`.
    pub fn add_successor(&mut self, from: StepId, to: StepId) -> Result<()> {
        if to.index() >= self.steps.len() {
            return Err(StepdagError::MalformedPlan(format!(
                "successor {to} of step {from} does not exist"
            )));
        }
        let step = self.steps.get_mut(from.index()).ok_or_else(|| {
            StepdagError::MalformedPlan(format!("step {from} does not exist"))
        })?;
        step.add_successor(to);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Finish planning. The resulting plan has passed [`Plan::validate`].
    pub fn build(self) -> Result<Plan> {
        let mut joins = self
            .steps
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_join())
            .map(|(i, _)| StepId(i));

        let join = match (joins.next(), joins.next()) {
            (Some(join), None) => join,
            (None, _) => {
                return Err(StepdagError::MalformedPlan(
                    "plan has no join step (a step without an operation)".to_string(),
                ));
            }
            (Some(a), Some(b)) => {
                return Err(StepdagError::MalformedPlan(format!(
                    "plan has more than one step without an operation ({a}, {b}, ...)"
                )));
            }
        };

        let plan = Plan {
            steps: self.steps,
            join,
        };
        plan.validate()?;
        Ok(plan)
    }
}

/// All steps of one run.
///
/// Steps are never moved or dropped before the run ends; workers address
/// them by [`StepId`].
#[derive(Debug)]
pub struct Plan {
    steps: Vec<Step>,
    join: StepId,
}

impl Plan {
    pub fn step(&self, id: StepId) -> &Step {
        &self.steps[id.index()]
    }

    pub fn get(&self, id: StepId) -> Option<&Step> {
        self.steps.get(id.index())
    }

    pub fn join(&self) -> StepId {
        self.join
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StepId, &Step)> {
        self.steps.iter().enumerate().map(|(i, s)| (StepId(i), s))
    }

    /// Steps that are ready before anything has run, in planning order.
    pub fn roots(&self) -> impl Iterator<Item = StepId> + '_ {
        self.iter()
            .filter(|(_, s)| s.required() == 0)
            .map(|(id, _)| id)
    }

    /// Check that a run over this plan terminates with every step executed
    /// exactly once.
    ///
    /// A plan that fails here would otherwise hang: some step would never
    /// see `arrived == required`, or the join would fire while work remains.
    pub fn validate(&self) -> Result<()> {
        let n = self.steps.len();
        let mut graph: DiGraph<StepId, ()> = DiGraph::with_capacity(n, n * 2);
        for i in 0..n {
            graph.add_node(StepId(i));
        }

        for (id, step) in self.iter() {
            if step.arrived() != 0 {
                return Err(StepdagError::MalformedPlan(format!(
                    "step {id} has already received {} signal(s); plans cannot be reused",
                    step.arrived()
                )));
            }
            for succ in step.successors() {
                if succ.index() >= n {
                    return Err(StepdagError::MalformedPlan(format!(
                        "successor {succ} of step {id} does not exist"
                    )));
                }
                graph.add_edge(NodeIndex::new(id.index()), NodeIndex::new(succ.index()), ());
            }
        }

        let join = self.step(self.join);
        if !join.is_join() {
            return Err(StepdagError::MalformedPlan(format!(
                "join step {} carries an operation",
                self.join
            )));
        }
        if !join.successors().is_empty() {
            return Err(StepdagError::MalformedPlan(format!(
                "join step {} has successors",
                self.join
            )));
        }

        for (id, step) in self.iter() {
            if step.is_join() && id != self.join {
                return Err(StepdagError::MalformedPlan(format!(
                    "step {id} has no operation but is not the join step"
                )));
            }
            let incoming = graph
                .neighbors_directed(NodeIndex::new(id.index()), Direction::Incoming)
                .count();
            if incoming != step.required() {
                return Err(StepdagError::MalformedPlan(format!(
                    "step {id} ({}) requires {} signal(s) but has {incoming} predecessor edge(s)",
                    step.kind(),
                    step.required()
                )));
            }
        }

        if let Err(cycle) = toposort(&graph, None) {
            return Err(StepdagError::MalformedPlan(format!(
                "cycle detected involving step {}",
                graph[cycle.node_id()]
            )));
        }

        let mut reaches_join = vec![false; n];
        let mut dfs = Dfs::new(Reversed(&graph), NodeIndex::new(self.join.index()));
        while let Some(node) = dfs.next(Reversed(&graph)) {
            reaches_join[node.index()] = true;
        }
        if let Some(orphan) = reaches_join.iter().position(|r| !r) {
            return Err(StepdagError::MalformedPlan(format!(
                "step {} does not lead to the join step; it could still be running at shutdown",
                StepId(orphan)
            )));
        }

        debug!(steps = n, join = %self.join, "plan validated");
        Ok(())
    }
}
