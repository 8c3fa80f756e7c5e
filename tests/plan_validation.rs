// tests/plan_validation.rs

mod common;
use crate::common::builders::DagPlanBuilder;
use crate::common::recording::Recorder;

use std::sync::Arc;

use stepdag::dag::{Operation, PlanBuilder, StepData, StepId, StepKind};
use stepdag::errors::StepdagError;

fn noop() -> Arc<dyn Operation> {
    Arc::new(|_: &StepData| {})
}

fn expect_malformed<T: std::fmt::Debug>(result: stepdag::errors::Result<T>, needle: &str) {
    match result {
        Err(StepdagError::MalformedPlan(msg)) => {
            assert!(msg.contains(needle), "expected '{needle}' in '{msg}'");
        }
        Err(e) => panic!("Expected MalformedPlan, got: {e:?}"),
        Ok(v) => panic!("Expected error, got Ok({v:?})"),
    }
}

#[test]
fn required_count_must_match_incoming_edges() {
    let mut b = PlanBuilder::new();
    let a = b.add_step(StepKind::Intermediate, Some(noop()), StepData::new("a"), 0);
    let c = b.add_step(StepKind::Output, Some(noop()), StepData::new("c"), 2);
    let join = b.add_join(1);
    b.add_successor(a, c).unwrap();
    b.add_successor(c, join).unwrap();

    expect_malformed(b.build(), "requires 2 signal(s) but has 1");
}

#[test]
fn cycles_are_reported() {
    let mut b = PlanBuilder::new();
    let x = b.add_step(StepKind::Intermediate, Some(noop()), StepData::new("x"), 1);
    let y = b.add_step(StepKind::Intermediate, Some(noop()), StepData::new("y"), 1);
    let join = b.add_join(1);
    b.add_successor(x, y).unwrap();
    b.add_successor(y, x).unwrap();
    b.add_successor(y, join).unwrap();

    expect_malformed(b.build(), "cycle detected");
}

#[test]
fn steps_that_do_not_lead_to_the_join_are_reported() {
    let mut b = PlanBuilder::new();
    b.add_step(StepKind::Intermediate, Some(noop()), StepData::new("stray"), 0);
    b.add_join(0);

    expect_malformed(b.build(), "does not lead to the join");
}

#[test]
fn a_plan_needs_exactly_one_join() {
    let mut none = PlanBuilder::new();
    none.add_step(StepKind::Intermediate, Some(noop()), StepData::new("a"), 0);
    expect_malformed(none.build(), "no join step");

    let mut two = PlanBuilder::new();
    two.add_join(0);
    two.add_join(0);
    expect_malformed(two.build(), "more than one");
}

#[test]
fn the_join_may_not_have_successors() {
    let mut b = PlanBuilder::new();
    let join = b.add_join(1);
    let a = b.add_step(StepKind::Intermediate, Some(noop()), StepData::new("a"), 1);
    b.add_successor(join, a).unwrap();
    b.add_successor(a, join).unwrap();

    expect_malformed(b.build(), "has successors");
}

#[test]
fn dangling_successors_are_rejected_while_planning() {
    let mut b = PlanBuilder::new();
    let a = b.add_step(StepKind::Intermediate, Some(noop()), StepData::new("a"), 0);

    expect_malformed(b.add_successor(a, StepId(99)), "does not exist");
    expect_malformed(b.add_successor(StepId(42), a), "does not exist");
}

#[test]
fn well_formed_generic_dags_validate() {
    let recorder = Recorder::new();
    let plan = DagPlanBuilder::new(5, recorder.operation("node"))
        .edges([(0, 2), (1, 2), (2, 3), (2, 4)])
        .build()
        .unwrap();

    assert_eq!(plan.len(), 6);
    assert_eq!(plan.step(plan.join()).required(), 2);
    let roots: Vec<usize> = plan.roots().map(|id| id.index()).collect();
    assert_eq!(roots, vec![0, 1]);
    plan.validate().unwrap();
}
