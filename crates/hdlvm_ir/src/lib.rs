//! Instruction set and optimizing compiler for hdlvm processes.
//!
//! A process arrives as line-oriented raw records ([`raw`]). [`compile`]
//! resolves every name against a [`SymbolTable`] and a built-in [`Library`],
//! runs the two optimizer passes and relinks the survivors into a
//! [`CompiledProcess`] of [`Instruction`]s ready for the VM.

#![warn(missing_docs)]

pub mod arena;
pub mod compile;
pub mod error;
pub mod ids;
pub mod instr;
pub mod library;
mod optimizer;
pub mod raw;

pub use arena::{Arena, ArenaId};
pub use compile::{
    compile, compile_with, CompileOptions, CompiledProcess, ProcessSource, SymbolTable,
    VariableDecl,
};
pub use error::{CompileError, LibraryError};
pub use ids::{FuncId, ProcessId, SignalId, VarId, ViewId};
pub use instr::{Attr, BinOp, Callee, Instruction, Slot, ViewDecl};
pub use library::{Builtin, BuiltinFn, Eval, Library, Signature};
