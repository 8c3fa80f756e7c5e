// src/engine/mailbox.rs

//! Bounded multi-producer / multi-consumer mailbox.
//!
//! A mailbox owns a fixed pool of `capacity` slots. A writer must allocate
//! a slot before it can publish a message, and the reader hands the slot
//! back with [`Mailbox::free`] once it is done with it. Slot accounting is
//! independent of message order: messages are delivered FIFO, slots come
//! back whenever readers are finished.
//!
//! Both halves are `crossbeam_channel` bounded channels:
//! - `free_*` carries slot indices that are available for allocation;
//! - `queue_*` carries written slots to readers.
//!
//! The queue can hold at most `capacity` entries because only allocated
//! slots can be written, so `write` never blocks.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_channel::{Receiver, Sender, TryRecvError, bounded, select};
use tracing::trace;

use crate::errors::{Result, StepdagError};

/// One message cell, owned by whoever currently holds it.
///
/// Moving a `Slot` into [`Mailbox::write`] or [`Mailbox::free`] is what
/// hands it over; the previous holder cannot touch it afterwards.
#[derive(Debug)]
pub struct Slot<T> {
    index: usize,
    message: Option<T>,
}

impl<T> Slot<T> {
    fn empty(index: usize) -> Self {
        Self {
            index,
            message: None,
        }
    }

    /// Position of this slot in its mailbox's pool.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Store `message` in the slot, replacing whatever was there.
    pub fn put(&mut self, message: T) {
        self.message = Some(message);
    }

    pub fn message(&self) -> Option<&T> {
        self.message.as_ref()
    }

    pub fn take(&mut self) -> Option<T> {
        self.message.take()
    }
}

/// Outcome of [`Mailbox::read_or_allocate`].
#[derive(Debug)]
pub enum Wake<R, A> {
    /// A message arrived on the mailbox being read.
    Read(Slot<R>),
    /// A slot became free on the mailbox being written.
    Allocated(Slot<A>),
}

pub struct Mailbox<T> {
    name: &'static str,
    capacity: usize,
    free_tx: Sender<usize>,
    free_rx: Receiver<usize>,
    queue_tx: Sender<Slot<T>>,
    queue_rx: Receiver<Slot<T>>,
    outstanding: AtomicUsize,
    peak: AtomicUsize,
}

impl<T> fmt::Debug for Mailbox<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailbox")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("queued", &self.queue_rx.len())
            .field("outstanding", &self.outstanding())
            .finish()
    }
}

impl<T> Mailbox<T> {
    /// Create a mailbox with a pool of `capacity` slots.
    pub fn new(name: &'static str, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(StepdagError::ConfigError(format!(
                "mailbox '{name}' needs a capacity of at least 1"
            )));
        }

        let (free_tx, free_rx) = bounded(capacity);
        let (queue_tx, queue_rx) = bounded(capacity);
        for index in 0..capacity {
            free_tx
                .send(index)
                .map_err(|_| StepdagError::MailboxClosed(name))?;
        }

        Ok(Self {
            name,
            capacity,
            free_tx,
            free_rx,
            queue_tx,
            queue_rx,
            outstanding: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently allocated and not yet freed.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Highest value [`outstanding`](Self::outstanding) has reached.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Acquire)
    }

    /// Messages written but not yet read.
    pub fn queued(&self) -> usize {
        self.queue_rx.len()
    }

    /// Wait for a free slot.
    pub fn allocate_blocking(&self) -> Result<Slot<T>> {
        let index = self.free_rx.recv().map_err(|_| self.closed())?;
        Ok(self.allocated(index))
    }

    /// Take a free slot if there is one right now.
    pub fn try_allocate(&self) -> Result<Option<Slot<T>>> {
        match self.free_rx.try_recv() {
            Ok(index) => Ok(Some(self.allocated(index))),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(self.closed()),
        }
    }

    /// Publish a filled slot to readers.
    pub fn write(&self, slot: Slot<T>) -> Result<()> {
        trace!(mailbox = self.name, slot = slot.index, "write");
        self.queue_tx.send(slot).map_err(|_| self.closed())
    }

    /// Wait for the next message.
    pub fn read_blocking(&self) -> Result<Slot<T>> {
        self.queue_rx.recv().map_err(|_| self.closed())
    }

    /// Take the next message if one is already queued.
    pub fn try_read(&self) -> Result<Option<Slot<T>>> {
        match self.queue_rx.try_recv() {
            Ok(slot) => Ok(Some(slot)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(self.closed()),
        }
    }

    /// Return a consumed slot to the pool, waking one blocked allocator.
    pub fn free(&self, slot: Slot<T>) -> Result<()> {
        debug_assert!(slot.index < self.capacity, "slot freed into the wrong mailbox");
        self.outstanding.fetch_sub(1, Ordering::AcqRel);
        self.free_tx.send(slot.index).map_err(|_| self.closed())
    }

    /// Wait until either a message arrives here or a slot frees up on
    /// `other`, whichever happens first.
    pub fn read_or_allocate<U>(&self, other: &Mailbox<U>) -> Result<Wake<T, U>> {
        select! {
            recv(self.queue_rx) -> slot => {
                let slot = slot.map_err(|_| self.closed())?;
                Ok(Wake::Read(slot))
            }
            recv(other.free_rx) -> index => {
                let index = index.map_err(|_| other.closed())?;
                Ok(Wake::Allocated(other.allocated(index)))
            }
        }
    }

    fn allocated(&self, index: usize) -> Slot<T> {
        let now = self.outstanding.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak.fetch_max(now, Ordering::AcqRel);
        trace!(mailbox = self.name, slot = index, outstanding = now, "allocate");
        Slot::empty(index)
    }

    fn closed(&self) -> StepdagError {
        StepdagError::MailboxClosed(self.name)
    }
}
