//! Errors raised while compiling a process and while evaluating built-ins.

use hdlvm_common::{LogicError, ValueKind};

/// A fatal problem in a process's raw instruction stream.
///
/// Every variant names the process and the raw source address so the
/// offending record can be found in the input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    /// An opcode this compiler does not recognize.
    #[error("{process}@{addr}: unknown opcode '{opcode}'")]
    UnknownOpcode {
        /// Process name.
        process: String,
        /// Source address.
        addr: usize,
        /// The unrecognized opcode text.
        opcode: String,
    },

    /// A recognized record with missing or unparsable operands.
    #[error("{process}@{addr}: malformed record: {reason}")]
    Malformed {
        /// Process name.
        process: String,
        /// Source address.
        addr: usize,
        /// What was wrong.
        reason: String,
    },

    /// A record whose leading address is not its position in the stream.
    #[error("{process}@{addr}: record carries address {found}")]
    AddressMismatch {
        /// Process name.
        process: String,
        /// Expected address (the record's position).
        addr: usize,
        /// Address written in the record.
        found: usize,
    },

    /// A `RANGE APPLY` not preceded by the target/left/ascending/right/create shape.
    #[error("{process}@{addr}: RANGE APPLY does not follow the push/push/push/push/RANGE CREATE shape")]
    RangeShape {
        /// Process name.
        process: String,
        /// Address of the `RANGE APPLY`.
        addr: usize,
    },

    /// A suspending `WAIT` with no `CANCEL ALL WAKEUPS` after it.
    #[error("{process}@{addr}: WAIT has no matching CANCEL ALL WAKEUPS")]
    UnterminatedWait {
        /// Process name.
        process: String,
        /// Address of the `WAIT`.
        addr: usize,
    },

    /// A jump whose target lies past the end of the process.
    #[error("{process}@{addr}: jump target {target} is out of range")]
    BadJumpTarget {
        /// Process name.
        process: String,
        /// Address of the jump.
        addr: usize,
        /// The raw target address.
        target: usize,
    },

    /// A reference to a signal, variable or constant that was never declared.
    #[error("{process}@{addr}: unknown {class} '{name}'")]
    UnknownObject {
        /// Process name.
        process: String,
        /// Source address.
        addr: usize,
        /// `signal`, `variable` or `constant`.
        class: &'static str,
        /// The unresolved name.
        name: String,
    },

    /// A recognized construct the VM does not execute.
    #[error("{process}@{addr}: unsupported {what}")]
    Unsupported {
        /// Process name.
        process: String,
        /// Source address.
        addr: usize,
        /// Description of the construct.
        what: String,
    },

    /// A pattern-match window reaching outside the process's records.
    #[error("{process}@{addr}: scheduling invariant violated: {reason}")]
    SchedulingInvariant {
        /// Process name.
        process: String,
        /// Address the window is anchored at.
        addr: usize,
        /// What was violated.
        reason: String,
    },

    /// A literal, type or slice that the value model rejected.
    #[error("{process}@{addr}: {source}")]
    Logic {
        /// Process name.
        process: String,
        /// Source address.
        addr: usize,
        /// The underlying value-model error.
        source: LogicError,
    },
}

impl CompileError {
    /// Returns the raw source address the error refers to.
    pub fn addr(&self) -> usize {
        match self {
            CompileError::UnknownOpcode { addr, .. }
            | CompileError::Malformed { addr, .. }
            | CompileError::AddressMismatch { addr, .. }
            | CompileError::RangeShape { addr, .. }
            | CompileError::UnterminatedWait { addr, .. }
            | CompileError::BadJumpTarget { addr, .. }
            | CompileError::UnknownObject { addr, .. }
            | CompileError::Unsupported { addr, .. }
            | CompileError::SchedulingInvariant { addr, .. }
            | CompileError::Logic { addr, .. } => *addr,
        }
    }
}

/// Operand problems detected inside a built-in function.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LibraryError {
    /// An operand of the wrong value class.
    #[error("{func}: operand {index} expected {expected}, found {found}")]
    OperandKind {
        /// Function name.
        func: &'static str,
        /// Zero-based operand position.
        index: usize,
        /// Expected class.
        expected: ValueKind,
        /// Actual class.
        found: ValueKind,
    },

    /// Element-wise operands of different widths.
    #[error("{func}: operand widths differ ({left} vs {right})")]
    WidthMismatch {
        /// Function name.
        func: &'static str,
        /// Left operand width.
        left: usize,
        /// Right operand width.
        right: usize,
    },

    /// Wrong number of operands.
    #[error("{func}: expected {expected} operands, got {found}")]
    Arity {
        /// Function name.
        func: &'static str,
        /// Declared arity.
        expected: usize,
        /// Operands supplied.
        found: usize,
    },
}
