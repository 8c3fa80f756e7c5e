// src/engine/context.rs

//! The two mailboxes shared by the driver and the worker pool.

use tracing::trace;

use crate::dag::StepId;
use crate::engine::mailbox::{Mailbox, Slot, Wake};
use crate::errors::{Result, StepdagError};

/// Message carried on the dispatch mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Run(StepId),
    /// Tells the receiving worker to exit.
    Shutdown,
}

/// Owns the dispatch (driver -> workers) and backchannel (workers -> driver)
/// mailboxes. Both are sized to the worker count.
#[derive(Debug)]
pub struct Context {
    dispatch: Mailbox<Dispatch>,
    backchannel: Mailbox<StepId>,
}

impl Context {
    pub fn new(workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(StepdagError::NoWorkers);
        }
        Ok(Self {
            dispatch: Mailbox::new("dispatch", workers)?,
            backchannel: Mailbox::new("backchannel", workers)?,
        })
    }

    pub fn dispatch(&self) -> &Mailbox<Dispatch> {
        &self.dispatch
    }

    pub fn backchannel(&self) -> &Mailbox<StepId> {
        &self.backchannel
    }

    // ---- driver side -------------------------------------------------------

    /// Hand a ready step to the pool, waiting for dispatch capacity.
    pub fn queue(&self, step: StepId) -> Result<()> {
        self.send_dispatch(Dispatch::Run(step))
    }

    /// Send one shutdown sentinel.
    pub fn queue_shutdown(&self) -> Result<()> {
        self.send_dispatch(Dispatch::Shutdown)
    }

    /// A newly ready step reported by a worker, if one is waiting.
    pub fn try_take_ready(&self) -> Result<Option<StepId>> {
        match self.backchannel.try_read()? {
            Some(slot) => self.unwrap_ready(slot).map(Some),
            None => Ok(None),
        }
    }

    /// Wait for a worker to report a newly ready step.
    pub fn wait_for_ready(&self) -> Result<StepId> {
        let slot = self.backchannel.read_blocking()?;
        self.unwrap_ready(slot)
    }

    // ---- worker side -------------------------------------------------------

    /// Wait for the next dispatch message. The slot must be handed back
    /// with [`free_step`](Self::free_step).
    pub fn wait_for_step(&self) -> Result<Slot<Dispatch>> {
        self.dispatch.read_blocking()
    }

    /// Wait for either a dispatch message or backchannel capacity.
    pub fn wait_for_step_or_capacity(&self) -> Result<Wake<Dispatch, StepId>> {
        self.dispatch.read_or_allocate(&self.backchannel)
    }

    pub fn free_step(&self, slot: Slot<Dispatch>) -> Result<()> {
        self.dispatch.free(slot)
    }

    /// Report a ready step without blocking.
    ///
    /// Returns `false` when the backchannel is full; the caller keeps the
    /// step and retries later.
    pub fn try_report_ready(&self, step: StepId) -> Result<bool> {
        match self.backchannel.try_allocate()? {
            Some(slot) => {
                self.report_ready(slot, step)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Report a ready step through an already allocated backchannel slot.
    pub fn report_ready(&self, mut slot: Slot<StepId>, step: StepId) -> Result<()> {
        slot.put(step);
        self.backchannel.write(slot)
    }

    fn send_dispatch(&self, message: Dispatch) -> Result<()> {
        let mut slot = self.dispatch.allocate_blocking()?;
        trace!(?message, slot = slot.index(), "dispatch");
        slot.put(message);
        self.dispatch.write(slot)
    }

    fn unwrap_ready(&self, mut slot: Slot<StepId>) -> Result<StepId> {
        let step = slot.take();
        self.backchannel.free(slot)?;
        step.ok_or_else(|| {
            StepdagError::Other(anyhow::anyhow!("empty message on the backchannel"))
        })
    }
}
