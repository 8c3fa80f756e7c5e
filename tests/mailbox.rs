// tests/mailbox.rs

mod common;
use crate::common::init_tracing;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use stepdag::engine::{Mailbox, Wake};
use stepdag::errors::StepdagError;

#[test]
fn zero_capacity_is_rejected() {
    let result = Mailbox::<u32>::new("empty", 0);
    match result {
        Err(StepdagError::ConfigError(msg)) => assert!(msg.contains("empty")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn try_allocate_stops_at_capacity() {
    let mailbox = Mailbox::<u32>::new("m", 2).unwrap();

    let a = mailbox.try_allocate().unwrap().expect("first slot");
    let b = mailbox.try_allocate().unwrap().expect("second slot");
    assert!(mailbox.try_allocate().unwrap().is_none());
    assert_eq!(mailbox.outstanding(), 2);
    assert_ne!(a.index(), b.index());

    mailbox.free(a).unwrap();
    assert_eq!(mailbox.outstanding(), 1);
    let c = mailbox.try_allocate().unwrap();
    assert!(c.is_some());
    assert_eq!(mailbox.peak(), 2);
}

#[test]
fn messages_are_delivered_in_write_order() {
    let mailbox = Mailbox::new("fifo", 3).unwrap();

    for value in [10, 20, 30] {
        let mut slot = mailbox.allocate_blocking().unwrap();
        slot.put(value);
        mailbox.write(slot).unwrap();
    }
    assert_eq!(mailbox.queued(), 3);

    let mut seen = Vec::new();
    while let Some(mut slot) = mailbox.try_read().unwrap() {
        seen.push(slot.take().unwrap());
        mailbox.free(slot).unwrap();
    }
    assert_eq!(seen, vec![10, 20, 30]);
    assert_eq!(mailbox.outstanding(), 0);
}

#[test]
fn try_read_on_empty_mailbox_returns_none() {
    let mailbox = Mailbox::<u32>::new("m", 1).unwrap();
    assert!(mailbox.try_read().unwrap().is_none());
}

#[test]
fn slot_stays_allocated_until_freed_even_after_read() {
    let mailbox = Mailbox::new("m", 1).unwrap();
    let mut slot = mailbox.allocate_blocking().unwrap();
    slot.put(7u8);
    mailbox.write(slot).unwrap();

    let read = mailbox.read_blocking().unwrap();
    assert_eq!(read.message(), Some(&7));
    // Reading does not return capacity; only free does.
    assert!(mailbox.try_allocate().unwrap().is_none());

    mailbox.free(read).unwrap();
    assert!(mailbox.try_allocate().unwrap().is_some());
}

#[test]
fn free_wakes_a_blocked_allocator() {
    init_tracing();
    let mailbox = Mailbox::<u32>::new("m", 1).unwrap();
    let held = mailbox.allocate_blocking().unwrap();
    let acquired = AtomicBool::new(false);

    thread::scope(|s| {
        let waiter = s.spawn(|| {
            let slot = mailbox.allocate_blocking().unwrap();
            acquired.store(true, Ordering::SeqCst);
            mailbox.free(slot).unwrap();
        });

        thread::sleep(Duration::from_millis(50));
        assert!(!acquired.load(Ordering::SeqCst), "allocator should be blocked");

        mailbox.free(held).unwrap();
        waiter.join().unwrap();
    });

    assert!(acquired.load(Ordering::SeqCst));
    assert_eq!(mailbox.peak(), 1);
}

#[test]
fn read_or_allocate_prefers_whatever_is_available() {
    let inbox = Mailbox::<u32>::new("inbox", 1).unwrap();
    let outbox = Mailbox::<u32>::new("outbox", 1).unwrap();

    // Nothing to read, capacity to write: get a slot.
    let slot = match inbox.read_or_allocate(&outbox).unwrap() {
        Wake::Allocated(slot) => slot,
        Wake::Read(_) => panic!("inbox is empty"),
    };
    assert_eq!(outbox.outstanding(), 1);

    // Outbox exhausted; a message arrives on the inbox.
    let mut msg = inbox.allocate_blocking().unwrap();
    msg.put(5);
    inbox.write(msg).unwrap();

    match inbox.read_or_allocate(&outbox).unwrap() {
        Wake::Read(mut read) => {
            assert_eq!(read.take(), Some(5));
            inbox.free(read).unwrap();
        }
        Wake::Allocated(_) => panic!("outbox has no free slot"),
    }

    outbox.free(slot).unwrap();
    assert_eq!(outbox.outstanding(), 0);
}

#[test]
fn concurrent_producers_and_consumers_never_exceed_capacity() {
    init_tracing();
    const CAPACITY: usize = 3;
    const PRODUCERS: usize = 6;
    const CONSUMERS: usize = 4;
    const PER_PRODUCER: usize = 250;
    const TOTAL: usize = PRODUCERS * PER_PRODUCER;

    let mailbox = Mailbox::<usize>::new("stress", CAPACITY).unwrap();
    let received = AtomicUsize::new(0);
    let sum = AtomicUsize::new(0);

    thread::scope(|s| {
        for p in 0..PRODUCERS {
            let mailbox = &mailbox;
            s.spawn(move || {
                for i in 0..PER_PRODUCER {
                    let mut slot = mailbox.allocate_blocking().unwrap();
                    assert!(mailbox.outstanding() <= CAPACITY);
                    slot.put(p * PER_PRODUCER + i);
                    mailbox.write(slot).unwrap();
                }
            });
        }
        for _ in 0..CONSUMERS {
            s.spawn(|| {
                loop {
                    if received.load(Ordering::SeqCst) >= TOTAL {
                        break;
                    }
                    match mailbox.try_read().unwrap() {
                        Some(mut slot) => {
                            sum.fetch_add(slot.take().unwrap(), Ordering::SeqCst);
                            mailbox.free(slot).unwrap();
                            received.fetch_add(1, Ordering::SeqCst);
                        }
                        None => thread::yield_now(),
                    }
                }
            });
        }
    });

    assert_eq!(received.load(Ordering::SeqCst), TOTAL);
    assert_eq!(sum.load(Ordering::SeqCst), (0..TOTAL).sum::<usize>());
    assert!(mailbox.peak() <= CAPACITY);
    assert_eq!(mailbox.outstanding(), 0);
}
