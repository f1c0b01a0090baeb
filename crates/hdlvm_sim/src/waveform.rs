//! The value-change hook used by waveform writers and trace consumers.
//!
//! The kernel calls every registered [`WaveformListener`] once per applied
//! change, after the signal's samples have been updated. It knows nothing
//! about file formats; [`ChangeLog`] is the in-memory listener used by the
//! CLI trace output and by tests.

use crate::signal::Signal;
use crate::time::SimTime;
use hdlvm_common::Value;
use hdlvm_ir::SignalId;
use std::cell::RefCell;
use std::rc::Rc;

/// Receives every applied signal change.
pub trait WaveformListener {
    /// Called after `signal` took a new value at `time`.
    fn on_change(&mut self, id: SignalId, signal: &Signal, time: SimTime);
}

impl<F> WaveformListener for F
where
    F: FnMut(SignalId, &Signal, SimTime),
{
    fn on_change(&mut self, id: SignalId, signal: &Signal, time: SimTime) {
        self(id, signal, time)
    }
}

/// One recorded change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Change {
    /// When it happened.
    pub time: SimTime,
    /// Signal name.
    pub signal: String,
    /// New value.
    pub value: Value,
}

/// A listener that appends every change to a shared list.
///
/// Clones share the same list, so one clone can be handed to the kernel
/// while another is kept to read the result.
#[derive(Clone, Debug, Default)]
pub struct ChangeLog(Rc<RefCell<Vec<Change>>>);

impl ChangeLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of the changes recorded so far.
    pub fn changes(&self) -> Vec<Change> {
        self.0.borrow().clone()
    }

    /// Changes of one signal, in order.
    pub fn of(&self, signal: &str) -> Vec<Change> {
        self.0
            .borrow()
            .iter()
            .filter(|c| c.signal == signal)
            .cloned()
            .collect()
    }

    /// Number of recorded changes.
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    /// Returns `true` if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

impl WaveformListener for ChangeLog {
    fn on_change(&mut self, _id: SignalId, signal: &Signal, time: SimTime) {
        self.0.borrow_mut().push(Change {
            time,
            signal: signal.name().to_string(),
            value: signal.value().clone(),
        });
    }
}
