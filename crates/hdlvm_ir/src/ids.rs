//! Opaque index newtypes for simulation entities.
//!
//! Names in the instruction stream are resolved once, at compile time, into
//! these ids; nothing is looked up by name while a process runs.

use crate::arena::ArenaId;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }

            /// Returns the index as a `usize`, for slot vectors.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl ArenaId for $name {
            fn from_raw(index: u32) -> Self {
                Self(index)
            }

            fn as_raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

define_id!(
    /// A signal owned by the scheduler.
    SignalId,
    "s"
);

define_id!(
    /// A process registered with the scheduler.
    ProcessId,
    "p"
);

define_id!(
    /// A variable slot private to one process.
    VarId,
    "v"
);

define_id!(
    /// A built-in function in a [`Library`](crate::library::Library).
    FuncId,
    "f"
);

define_id!(
    /// A range view hoisted into a process prologue.
    ViewId,
    "r"
);
