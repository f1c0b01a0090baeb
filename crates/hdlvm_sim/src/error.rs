//! Errors raised while building or running a simulation.

use hdlvm_common::LogicError;
use hdlvm_ir::{CompileError, LibraryError};
use std::io;

/// Fatal simulation errors.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// An operand's runtime type disagrees with the operation applied to it.
    #[error("type mismatch at {site}: expected {expected}, found {found}")]
    TypeMismatch {
        /// Where it happened: `process@addr` or a signal name.
        site: String,
        /// Expected type.
        expected: String,
        /// Actual operand.
        found: String,
    },

    /// An instruction popped more operands than the stack held.
    #[error("operand stack underflow at {process}@{addr}")]
    StackUnderflow {
        /// Process name.
        process: String,
        /// Raw source address of the instruction.
        addr: usize,
    },

    /// An operand that cannot be used the way the instruction requires.
    #[error("bad operand at {process}@{addr}: {reason}")]
    BadOperand {
        /// Process name.
        process: String,
        /// Raw source address of the instruction.
        addr: usize,
        /// What was wrong.
        reason: String,
    },

    /// A built-in rejected its operands.
    #[error("{process}@{addr}: {source}")]
    Library {
        /// Process name.
        process: String,
        /// Raw source address of the call.
        addr: usize,
        /// The library's complaint.
        source: LibraryError,
    },

    /// The scheduler reached a state that should be impossible.
    #[error("scheduling invariant violated: {0}")]
    SchedulingInvariant(String),

    /// Too many delta cycles at one timestamp, usually a combinational loop.
    #[error("delta cycle limit exceeded at {fs} fs (max {max_deltas} deltas)")]
    DeltaCycleLimit {
        /// Timestamp in femtoseconds.
        fs: u64,
        /// Configured limit.
        max_deltas: u32,
    },

    /// A process ran its whole instruction budget without suspending.
    #[error("process '{process}' executed {steps} instructions without suspending")]
    RunawayProcess {
        /// Process name.
        process: String,
        /// Instructions executed in the offending resume.
        steps: u64,
    },

    /// A delay that would place an event past the end of representable time.
    #[error("time overflow: {delay} fs after {now} fs does not fit in 64 bits")]
    TimeOverflow {
        /// Time the delay was measured from, in femtoseconds.
        now: u64,
        /// Requested delay in femtoseconds.
        delay: u64,
    },

    /// A signal id or name that does not exist.
    #[error("unknown signal '{0}'")]
    UnknownSignal(String),

    /// A malformed design file.
    #[error("design line {line}: {reason}")]
    Design {
        /// One-based line number.
        line: usize,
        /// What was wrong.
        reason: String,
    },

    /// `initialize` was called twice.
    #[error("simulation already initialized")]
    AlreadyInitialized,

    /// A process failed to compile.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// A value-model error outside any process context.
    #[error(transparent)]
    Logic(#[from] LogicError),

    /// Reading a design file failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_mismatch_display() {
        let e = SimError::TypeMismatch {
            site: "p@4".into(),
            expected: "STD_LOGIC_VECTOR".into(),
            found: "INTEGER".into(),
        };
        assert_eq!(
            e.to_string(),
            "type mismatch at p@4: expected STD_LOGIC_VECTOR, found INTEGER"
        );
    }

    #[test]
    fn delta_cycle_limit_display() {
        let e = SimError::DeltaCycleLimit {
            fs: 100,
            max_deltas: 10000,
        };
        assert_eq!(
            e.to_string(),
            "delta cycle limit exceeded at 100 fs (max 10000 deltas)"
        );
    }

    #[test]
    fn runaway_display() {
        let e = SimError::RunawayProcess {
            process: "spin".into(),
            steps: 50,
        };
        assert_eq!(
            e.to_string(),
            "process 'spin' executed 50 instructions without suspending"
        );
    }

    #[test]
    fn compile_error_is_transparent() {
        let e = SimError::from(CompileError::RangeShape {
            process: "p".into(),
            addr: 9,
        });
        assert!(e.to_string().starts_with("p@9: RANGE APPLY"));
    }

    #[test]
    fn io_display() {
        let e = SimError::Io(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert_eq!(e.to_string(), "I/O error: gone");
    }
}
