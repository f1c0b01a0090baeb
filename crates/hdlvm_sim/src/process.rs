//! The contract between the scheduler and anything it resumes.
//!
//! Compiled VM processes, clock-independent stimulus drivers and foreign
//! models all implement [`Process`]. While running they see the simulation
//! only through a [`ProcessContext`]: they can read signals and request
//! updates and wakeups, never write signal storage directly.

use crate::error::SimError;
use crate::event::{EventKind, EventQueue};
use crate::signal::{conform, describe, Signal, UpdateTarget};
use crate::time::{fs_after, SimTime};
use hdlvm_common::Value;
use hdlvm_ir::{Arena, ProcessId, SignalId};

/// How a process gave control back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resume {
    /// Waiting for a registered wakeup.
    Suspend,
    /// Finished for the rest of the run.
    Halt,
}

/// A cooperatively scheduled process.
pub trait Process {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    /// Runs until the next suspension point.
    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Resume, SimError>;
}

/// The scheduler state visible to a running process.
pub struct ProcessContext<'a> {
    pub(crate) pid: ProcessId,
    pub(crate) now: SimTime,
    pub(crate) token: u64,
    pub(crate) signals: &'a mut Arena<SignalId, Signal>,
    pub(crate) queue: &'a mut EventQueue,
    pub(crate) watching: &'a mut Vec<SignalId>,
}

impl<'a> ProcessContext<'a> {
    /// The running process.
    pub fn pid(&self) -> ProcessId {
        self.pid
    }

    /// Current time, including the delta cycle.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Looks up a signal.
    pub fn signal(&self, id: SignalId) -> Result<&Signal, SimError> {
        self.signals
            .get(id)
            .ok_or_else(|| SimError::UnknownSignal(id.to_string()))
    }

    /// Current value of a signal.
    pub fn value(&self, id: SignalId) -> Result<&Value, SimError> {
        self.signal(id).map(Signal::value)
    }

    /// `'EVENT` of a signal in the current delta cycle.
    pub fn event(&self, id: SignalId) -> Result<bool, SimError> {
        Ok(self.signal(id)?.event(self.now))
    }

    /// Rising edge of a signal in the current delta cycle.
    pub fn rising(&self, id: SignalId) -> Result<bool, SimError> {
        Ok(self.signal(id)?.rising(self.now))
    }

    /// Falling edge of a signal in the current delta cycle.
    pub fn falling(&self, id: SignalId) -> Result<bool, SimError> {
        Ok(self.signal(id)?.falling(self.now))
    }

    /// Requests `signal <= value after delay_fs`.
    ///
    /// The value is checked against the signal's type (or the slice width)
    /// now, not when the update is applied.
    pub fn schedule_assignment(
        &mut self,
        signal: SignalId,
        target: UpdateTarget,
        value: Value,
        delay_fs: u64,
    ) -> Result<(), SimError> {
        let sig = self.signal(signal)?;
        let conformed = match target {
            UpdateTarget::Whole => conform(&sig.ty(), &value),
            UpdateTarget::Range(view) => value
                .to_bits()
                .filter(|bits| bits.len() == view.len())
                .map(|_| value.clone()),
        };
        let Some(value) = conformed else {
            let expected = match target {
                UpdateTarget::Whole => sig.ty().to_string(),
                UpdateTarget::Range(view) => format!("{} elements", view.len()),
            };
            return Err(SimError::TypeMismatch {
                site: format!("assignment to '{}'", sig.name()),
                expected,
                found: describe(&value),
            });
        };
        let at = fs_after(self.now.fs, delay_fs)?;
        self.queue.push(
            at,
            EventKind::SignalUpdate {
                signal,
                target,
                value,
            },
        );
        Ok(())
    }

    /// Arms a wakeup `delay_fs` from now.
    pub fn wait_for(&mut self, delay_fs: u64) -> Result<(), SimError> {
        let at = fs_after(self.now.fs, delay_fs)?;
        self.queue.push(
            at,
            EventKind::TimedWake {
                process: self.pid,
                token: self.token,
            },
        );
        Ok(())
    }

    /// Arms a wakeup on the next change of `signal`.
    pub fn wait_on(&mut self, signal: SignalId) -> Result<(), SimError> {
        let sig = self
            .signals
            .get_mut(signal)
            .ok_or_else(|| SimError::UnknownSignal(signal.to_string()))?;
        sig.waiting.insert(self.pid);
        self.watching.push(signal);
        Ok(())
    }
}
