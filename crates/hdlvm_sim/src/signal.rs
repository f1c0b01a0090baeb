//! Scheduler-owned signal state and edge detection.
//!
//! A [`Signal`] keeps its current and previous [`Sample`]s, the time of its
//! last change (delta included) and the set of processes waiting on it.
//! Signals are only mutated when the kernel applies an update event.

use crate::error::SimError;
use crate::time::SimTime;
use hdlvm_common::{Logic, LogicVec, RangeView, TypeSpec, Value};
use hdlvm_ir::ProcessId;
use std::collections::BTreeSet;

/// A value together with the time it was assigned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sample {
    /// The value.
    pub value: Value,
    /// When it was assigned.
    pub time: SimTime,
}

/// Which part of a signal an update writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateTarget {
    /// The whole signal.
    Whole,
    /// A slice of a vector signal.
    Range(RangeView),
}

/// Runtime state of one signal.
#[derive(Clone, Debug)]
pub struct Signal {
    name: String,
    ty: TypeSpec,
    current: Sample,
    last: Sample,
    last_event: Option<SimTime>,
    pub(crate) waiting: BTreeSet<ProcessId>,
}

impl Signal {
    /// Creates a signal holding `init` since time zero.
    pub fn new(name: impl Into<String>, ty: TypeSpec, init: Value) -> Self {
        let sample = Sample {
            value: init,
            time: SimTime::zero(),
        };
        Self {
            name: name.into(),
            ty,
            current: sample.clone(),
            last: sample,
            last_event: None,
            waiting: BTreeSet::new(),
        }
    }

    /// Declared name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type.
    pub fn ty(&self) -> TypeSpec {
        self.ty
    }

    /// Current value.
    pub fn value(&self) -> &Value {
        &self.current.value
    }

    /// Current sample.
    pub fn current(&self) -> &Sample {
        &self.current
    }

    /// The sample the current one replaced.
    pub fn last(&self) -> &Sample {
        &self.last
    }

    /// Processes currently waiting on this signal, in id order.
    pub fn waiting(&self) -> impl Iterator<Item = ProcessId> + '_ {
        self.waiting.iter().copied()
    }

    /// `'EVENT`: the signal changed in exactly this delta cycle.
    pub fn event(&self, now: SimTime) -> bool {
        self.last_event == Some(now)
    }

    /// An event that left the signal at `'1'`.
    pub fn rising(&self, now: SimTime) -> bool {
        self.event(now) && self.current.value.as_logic() == Some(Logic::One)
    }

    /// An event that left the signal at `'0'`.
    pub fn falling(&self, now: SimTime) -> bool {
        self.event(now) && self.current.value.as_logic() == Some(Logic::Zero)
    }

    /// Writes `value` (already conformed to the target) at `now`.
    ///
    /// Returns `true` if the printed value changed. An identical value is a
    /// no-op that leaves the timestamps alone. A slice write whose value
    /// does not fit the slice, or a slice of a non-vector signal, is an error.
    pub(crate) fn apply(
        &mut self,
        target: UpdateTarget,
        value: &Value,
        now: SimTime,
    ) -> Result<bool, SimError> {
        let next = match (target, &self.current.value) {
            (UpdateTarget::Whole, _) => value.clone(),
            (UpdateTarget::Range(view), Value::Vector(parent)) => {
                let mismatch = || SimError::TypeMismatch {
                    site: format!("slice {}..{} of '{}'", view.left(), view.right(), self.name),
                    expected: format!("{} bits", view.len()),
                    found: describe(value),
                };
                let bits = value.to_bits().ok_or_else(mismatch)?;
                let mut parent = parent.clone();
                view.write(&mut parent, &bits).map_err(|_| mismatch())?;
                Value::Vector(parent)
            }
            (UpdateTarget::Range(_), current) => {
                return Err(SimError::TypeMismatch {
                    site: format!("slice of '{}'", self.name),
                    expected: "a vector signal".to_string(),
                    found: describe(current),
                })
            }
        };
        if next.same_as(&self.current.value) {
            return Ok(false);
        }
        self.last = std::mem::replace(
            &mut self.current,
            Sample {
                value: next,
                time: now,
            },
        );
        self.last_event = Some(now);
        Ok(true)
    }
}

/// Converts `value` to the representation a `ty` object stores.
///
/// Vectors take the declared bounds of `ty`; a scalar and a one-element
/// vector convert into each other. Returns `None` on a class or width
/// mismatch.
pub fn conform(ty: &TypeSpec, value: &Value) -> Option<Value> {
    match *ty {
        TypeSpec::Logic => value.as_logic().map(Value::Logic),
        TypeSpec::Array {
            left,
            direction,
            right,
        } => {
            let bits = value.to_bits()?;
            let mut out = LogicVec::new(left, direction, right).ok()?;
            out.assign_bits(&bits).ok()?;
            Some(Value::Vector(out))
        }
        TypeSpec::Integer => value.as_integer().map(Value::Integer),
        TypeSpec::Boolean => value.as_bool().map(Value::Boolean),
    }
}

/// Short description of a value's type for mismatch diagnostics.
pub fn describe(value: &Value) -> String {
    match value {
        Value::Vector(v) => format!("{}({})", value.kind(), v.width()),
        other => other.kind().to_string(),
    }
}
