#![allow(dead_code)]

use std::sync::Arc;

use stepdag::dag::{Operation, Plan, PlanBuilder, StepData, StepId, StepKind};
use stepdag::errors::Result;

/// `n` item names: `track00.wav`, `track01.wav`, ...
pub fn track_names(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("track{i:02}.wav")).collect()
}

/// Builder for arbitrary DAG plans to simplify test setup.
///
/// Nodes are named `n0`, `n1`, ... and every node runs `operation`.
/// [`build`](Self::build) derives each node's required count from its
/// incoming edges and wires every sink into a join step.
pub struct DagPlanBuilder {
    nodes: usize,
    edges: Vec<(usize, usize)>,
    operation: Arc<dyn Operation>,
}

impl DagPlanBuilder {
    pub fn new(nodes: usize, operation: Arc<dyn Operation>) -> Self {
        Self {
            nodes,
            edges: Vec::new(),
            operation,
        }
    }

    pub fn edge(mut self, from: usize, to: usize) -> Self {
        self.edges.push((from, to));
        self
    }

    pub fn edges(mut self, edges: impl IntoIterator<Item = (usize, usize)>) -> Self {
        self.edges.extend(edges);
        self
    }

    pub fn build(self) -> Result<Plan> {
        let mut incoming = vec![0usize; self.nodes];
        let mut outgoing = vec![0usize; self.nodes];
        for &(from, to) in &self.edges {
            outgoing[from] += 1;
            incoming[to] += 1;
        }

        let mut builder = PlanBuilder::with_capacity(self.nodes + 1);
        let ids: Vec<StepId> = (0..self.nodes)
            .map(|i| {
                builder.add_step(
                    StepKind::Intermediate,
                    Some(Arc::clone(&self.operation)),
                    StepData::new(format!("n{i}")),
                    incoming[i],
                )
            })
            .collect();

        for &(from, to) in &self.edges {
            builder.add_successor(ids[from], ids[to])?;
        }

        let sinks: Vec<StepId> = (0..self.nodes)
            .filter(|&i| outgoing[i] == 0)
            .map(|i| ids[i])
            .collect();
        let join = builder.add_join(sinks.len());
        for sink in sinks {
            builder.add_successor(sink, join)?;
        }

        builder.build()
    }
}
