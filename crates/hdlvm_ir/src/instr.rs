//! The optimized instruction set executed by the VM.

use crate::ids::{FuncId, SignalId, VarId, ViewId};
use hdlvm_common::{Value, ValueKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A storage location a process can read or assign.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Slot {
    /// A scheduler-owned signal.
    Signal(SignalId),
    /// A process-local variable.
    Variable(VarId),
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Signal(id) => write!(f, "{id}"),
            Slot::Variable(id) => write!(f, "{id}"),
        }
    }
}

/// A slice declaration hoisted out of the loop body into the process prologue.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct ViewDecl {
    /// Sliced object.
    pub slot: Slot,
    /// Left bound.
    pub left: i64,
    /// `TO` when true, `DOWNTO` otherwise.
    pub ascending: bool,
    /// Right bound.
    pub right: i64,
}

impl fmt::Display for ViewDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = if self.ascending { "TO" } else { "DOWNTO" };
        write!(f, "{}({} {dir} {})", self.slot, self.left, self.right)
    }
}

/// The target of a `Call`.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Callee {
    /// A library built-in.
    Builtin(FuncId),
    /// A subprogram the library does not provide. Executing it logs a
    /// warning and pushes the default of `ret`.
    Unresolved {
        /// The normalized signature, for diagnostics.
        signature: String,
        /// Declared return class, if known.
        ret: Option<ValueKind>,
    },
}

/// Untyped binary operator from a `BINARY OP` record.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum BinOp {
    /// `EQUAL`
    Equal,
    /// `NEQUAL`
    NotEqual,
    /// `AND`
    And,
    /// `OR`
    Or,
    /// Anything else; degrades to `FALSE` at run time.
    Other(String),
}

impl BinOp {
    /// Maps the record's operator name.
    pub fn parse(name: &str) -> Self {
        match name {
            "EQUAL" => BinOp::Equal,
            "NEQUAL" => BinOp::NotEqual,
            "AND" => BinOp::And,
            "OR" => BinOp::Or,
            other => BinOp::Other(other.to_string()),
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinOp::Equal => f.write_str("EQUAL"),
            BinOp::NotEqual => f.write_str("NEQUAL"),
            BinOp::And => f.write_str("AND"),
            BinOp::Or => f.write_str("OR"),
            BinOp::Other(name) => f.write_str(name),
        }
    }
}

/// A signal attribute.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Attr {
    /// `'EVENT`
    Event,
}

/// One executable instruction. Jump targets are indices into the
/// process's instruction vector; a target equal to its length halts.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Instruction {
    /// Push a literal value.
    PushLiteral(Value),
    /// Push a named constant's value.
    PushConstant(Value),
    /// Push a signal reference.
    PushSignal(SignalId),
    /// Push a variable reference.
    PushVariable(VarId),
    /// Push a hoisted range view.
    RangeCreate(ViewId),
    /// Pop an index and an operand, push the selected element.
    Index,
    /// Pop a scalar, push a vector of `width` copies.
    Aggregate {
        /// Result width.
        width: usize,
    },
    /// Pop a signal reference, push the attribute value.
    Attribute(Attr),
    /// Pop two operands, push the result.
    BinaryOp(BinOp),
    /// Pop `argc` operands, push the result.
    Call {
        /// What to call.
        callee: Callee,
        /// Operands popped.
        argc: usize,
    },
    /// Unconditional jump.
    Jump(usize),
    /// Pop a condition, jump when false.
    JumpIfFalse(usize),
    /// Pop a condition, jump when true.
    JumpIfTrue(usize),
    /// Jump unless `signal` has a rising edge in the current delta cycle.
    JumpNotRising {
        /// Tested signal.
        signal: SignalId,
        /// Jump target.
        target: usize,
    },
    /// Pop `[delay]`, value and target; assign or schedule.
    ScheduleAssignment {
        /// A delay operand is on top of the stack.
        delayed: bool,
    },
    /// Pop a delay, arm a timed wake.
    ScheduleDelay,
    /// Pop a signal reference, arm a wake on its next change.
    ScheduleWakeup,
    /// Yield until resumed.
    Suspend,
    /// Stop forever.
    Halt,
}

impl Instruction {
    /// Returns the jump target, if this is a jump.
    pub fn target(&self) -> Option<usize> {
        match *self {
            Instruction::Jump(t) | Instruction::JumpIfFalse(t) | Instruction::JumpIfTrue(t) => {
                Some(t)
            }
            Instruction::JumpNotRising { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Replaces the jump target, if this is a jump.
    pub fn set_target(&mut self, new: usize) {
        match self {
            Instruction::Jump(t) | Instruction::JumpIfFalse(t) | Instruction::JumpIfTrue(t) => {
                *t = new
            }
            Instruction::JumpNotRising { target, .. } => *target = new,
            _ => {}
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::PushLiteral(v) => write!(f, "PUSH_LITERAL {v}"),
            Instruction::PushConstant(v) => write!(f, "PUSH_CONSTANT {v}"),
            Instruction::PushSignal(s) => write!(f, "PUSH_SIGNAL {s}"),
            Instruction::PushVariable(v) => write!(f, "PUSH_VARIABLE {v}"),
            Instruction::RangeCreate(r) => write!(f, "RANGE_CREATE {r}"),
            Instruction::Index => f.write_str("INDEX"),
            Instruction::Aggregate { width } => write!(f, "AGGREGATE {width}"),
            Instruction::Attribute(Attr::Event) => f.write_str("ATTRIBUTE EVENT"),
            Instruction::BinaryOp(op) => write!(f, "BINARY_OP {op}"),
            Instruction::Call {
                callee: Callee::Builtin(id),
                argc,
            } => write!(f, "CALL {id}/{argc}"),
            Instruction::Call {
                callee: Callee::Unresolved { signature, .. },
                argc,
            } => write!(f, "CALL_UNRESOLVED {signature}/{argc}"),
            Instruction::Jump(t) => write!(f, "JUMP {t}"),
            Instruction::JumpIfFalse(t) => write!(f, "JUMP_IF_FALSE {t}"),
            Instruction::JumpIfTrue(t) => write!(f, "JUMP_IF_TRUE {t}"),
            Instruction::JumpNotRising { signal, target } => {
                write!(f, "JUMP_NOT_RISING {signal} {target}")
            }
            Instruction::ScheduleAssignment { delayed: true } => f.write_str("ASSIGN DELAYED"),
            Instruction::ScheduleAssignment { delayed: false } => f.write_str("ASSIGN"),
            Instruction::ScheduleDelay => f.write_str("SCHEDULE_DELAY"),
            Instruction::ScheduleWakeup => f.write_str("SCHEDULE_WAKEUP"),
            Instruction::Suspend => f.write_str("SUSPEND"),
            Instruction::Halt => f.write_str("HALT"),
        }
    }
}
