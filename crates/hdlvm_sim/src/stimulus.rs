//! A foreign process that drives a fixed list of timed assignments.

use crate::error::SimError;
use crate::process::{Process, ProcessContext, Resume};
use crate::signal::UpdateTarget;
use hdlvm_common::Value;
use hdlvm_ir::SignalId;

/// One scheduled drive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Drive {
    /// Absolute time in femtoseconds.
    pub at_fs: u64,
    /// Driven signal.
    pub signal: SignalId,
    /// Value to assign.
    pub value: Value,
}

/// Schedules every drive on its first resume, then halts.
///
/// A drive whose time has already passed is scheduled with zero delay.
#[derive(Clone, Debug, Default)]
pub struct Stimulus {
    name: String,
    drives: Vec<Drive>,
}

impl Stimulus {
    /// Creates an empty stimulus.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            drives: Vec::new(),
        }
    }

    /// Adds a drive of `value` onto `signal` at `at_fs`.
    pub fn drive(mut self, at_fs: u64, signal: SignalId, value: impl Into<Value>) -> Self {
        self.drives.push(Drive {
            at_fs,
            signal,
            value: value.into(),
        });
        self
    }

    /// Adds a drive in place.
    pub fn push(&mut self, drive: Drive) {
        self.drives.push(drive);
    }

    /// The drives, in insertion order.
    pub fn drives(&self) -> &[Drive] {
        &self.drives
    }
}

impl Process for Stimulus {
    fn name(&self) -> &str {
        &self.name
    }

    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Resume, SimError> {
        let now = ctx.now().fs;
        for drive in &self.drives {
            ctx.schedule_assignment(
                drive.signal,
                UpdateTarget::Whole,
                drive.value.clone(),
                drive.at_fs.saturating_sub(now),
            )?;
        }
        Ok(Resume::Halt)
    }
}
