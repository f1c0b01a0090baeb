//! Scheduler events and the time-ordered event queue.
//!
//! Events sort by `(fs, priority)`. Activity events take a strictly
//! increasing sequence number as their priority, so same-time updates apply
//! in issue order. The delta boundary sorts after all activity at its
//! timestamp, and the stop marker after everything.

use crate::signal::UpdateTarget;
use hdlvm_common::Value;
use hdlvm_ir::{ProcessId, SignalId};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Priority of [`EventKind::DeltaBoundary`].
pub const DELTA_BOUNDARY_PRIORITY: u64 = u64::MAX - 1;
/// Priority of [`EventKind::Stop`].
pub const STOP_PRIORITY: u64 = u64::MAX;

/// What an event does when applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventKind {
    /// Write a new value to (part of) a signal.
    SignalUpdate {
        /// Target signal.
        signal: SignalId,
        /// Whole signal or slice.
        target: UpdateTarget,
        /// Conformed new value.
        value: Value,
    },
    /// Resume a process after a delay, unless its wake token moved on.
    TimedWake {
        /// Process to resume.
        process: ProcessId,
        /// Token at the time the wait was armed.
        token: u64,
    },
    /// Toggle a clock signal and re-arm.
    PeriodicToggle {
        /// Index of the clock generator.
        clock: usize,
    },
    /// End of a delta cycle.
    DeltaBoundary,
    /// End of the simulation.
    Stop,
}

/// A queued event.
#[derive(Clone, Debug)]
pub struct Event {
    /// Firing time in femtoseconds.
    pub fs: u64,
    /// Secondary sort key.
    pub priority: u64,
    /// Payload.
    pub kind: EventKind,
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fs
            .cmp(&other.fs)
            .then(self.priority.cmp(&other.priority))
    }
}

/// Min-ordered queue of pending events.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<Event>>,
    seq: u64,
}

impl EventQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an activity event behind every activity event issued before it.
    ///
    /// # Panics
    ///
    /// Panics if given a boundary or stop marker.
    pub fn push(&mut self, fs: u64, kind: EventKind) {
        assert!(
            !matches!(kind, EventKind::DeltaBoundary | EventKind::Stop),
            "markers have fixed priorities"
        );
        let priority = self.seq;
        self.seq += 1;
        self.heap.push(Reverse(Event { fs, priority, kind }));
    }

    /// Queues an event with an explicit priority.
    pub fn push_with_priority(&mut self, fs: u64, priority: u64, kind: EventKind) {
        self.heap.push(Reverse(Event { fs, priority, kind }));
    }

    /// Queues the end-of-delta marker for `fs`.
    pub fn push_boundary(&mut self, fs: u64) {
        self.push_with_priority(fs, DELTA_BOUNDARY_PRIORITY, EventKind::DeltaBoundary);
    }

    /// Queues the stop marker.
    pub fn push_stop(&mut self, fs: u64) {
        self.push_with_priority(fs, STOP_PRIORITY, EventKind::Stop);
    }

    /// Removes the earliest event.
    pub fn pop(&mut self) -> Option<Event> {
        self.heap.pop().map(|Reverse(e)| e)
    }

    /// Returns the earliest event without removing it.
    pub fn peek(&self) -> Option<&Event> {
        self.heap.peek().map(|Reverse(e)| e)
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdlvm_common::Logic;

    fn update(signal: u32, value: Logic) -> EventKind {
        EventKind::SignalUpdate {
            signal: SignalId::from_raw(signal),
            target: UpdateTarget::Whole,
            value: Value::Logic(value),
        }
    }

    #[test]
    fn orders_by_time_then_priority() {
        let mut q = EventQueue::new();
        q.push_with_priority(10, 7, update(0, Logic::One));
        q.push_with_priority(10, 3, update(1, Logic::One));
        q.push_with_priority(5, 9, update(2, Logic::One));
        let order: Vec<(u64, u64)> = std::iter::from_fn(|| q.pop())
            .map(|e| (e.fs, e.priority))
            .collect();
        assert_eq!(order, vec![(5, 9), (10, 3), (10, 7)]);
    }

    #[test]
    fn same_time_updates_keep_issue_order() {
        let mut q = EventQueue::new();
        for i in 0..5 {
            q.push(100, update(i, Logic::Zero));
        }
        let signals: Vec<u32> = std::iter::from_fn(|| q.pop())
            .map(|e| match e.kind {
                EventKind::SignalUpdate { signal, .. } => signal.as_raw(),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(signals, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn boundary_after_activity_before_stop() {
        let mut q = EventQueue::new();
        q.push_stop(10);
        q.push_boundary(10);
        q.push(10, update(0, Logic::One));
        q.push(11, update(1, Logic::One));
        assert!(matches!(q.pop().unwrap().kind, EventKind::SignalUpdate { .. }));
        assert_eq!(q.pop().unwrap().kind, EventKind::DeltaBoundary);
        assert_eq!(q.pop().unwrap().kind, EventKind::Stop);
        assert_eq!(q.pop().unwrap().fs, 11);
        assert!(q.is_empty());
    }

    #[test]
    #[should_panic(expected = "markers have fixed priorities")]
    fn push_rejects_markers() {
        EventQueue::new().push(0, EventKind::Stop);
    }
}
