// src/engine/mod.rs

//! Execution engine: a fixed pool of worker threads fed by the driver.
//!
//! This module ties together:
//! - [`mailbox`]: bounded slot-pool mailboxes with blocking and
//!   non-blocking allocate / read
//! - [`context`]: the dispatch and backchannel mailboxes
//! - [`worker`]: the per-thread execution loop
//! - [`driver`]: seeding, pumping and the shutdown broadcast
//!
//! Control flow:
//!
//! ```text
//! driver --dispatch--> worker --(operation, successor counters)-->
//!        <--backchannel--       ... until the join step is reported,
//! then one shutdown sentinel per worker.
//! ```
//!
//! Both mailboxes hold at most `workers` messages. The driver empties the
//! backchannel while it seeds, and workers never block on the backchannel,
//! so neither side can wait on the other in a cycle.

pub mod context;
pub mod driver;
pub mod mailbox;
pub mod worker;

pub use context::{Context, Dispatch};
pub use driver::{RunReport, run, run_items};
pub use mailbox::{Mailbox, Slot, Wake};
pub use worker::WorkerStats;
