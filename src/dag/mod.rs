// src/dag/mod.rs

//! DAG representation and planning.
//!
//! - [`step`] defines the node type, its dependency counter and the
//!   [`Operation`] capability it carries.
//! - [`plan`] holds the per-run arena of steps and validates its shape.
//! - [`planner`] turns an ordered item list into the two-stage pipeline.

pub mod plan;
pub mod planner;
pub mod step;

pub use plan::{Plan, PlanBuilder};
pub use planner::{Rename, Stages, plan};
pub use step::{Operation, Step, StepData, StepId, StepKind};
