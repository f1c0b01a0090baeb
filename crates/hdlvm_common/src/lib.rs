//! Value model shared by the hdlvm compiler and simulator.
//!
//! This crate provides the IEEE 1164 nine-state [`Logic`] scalar, bounded
//! [`LogicVec`] vectors with least-significant-first storage, write-through
//! [`RangeView`] slices, declared [`TypeSpec`]s and the runtime [`Value`]
//! operand type.

#![warn(missing_docs)]

pub mod error;
pub mod logic;
pub mod logic_vec;
pub mod range;
pub mod types;
pub mod value;

pub use error::LogicError;
pub use logic::Logic;
pub use logic_vec::{Direction, LogicVec};
pub use range::RangeView;
pub use types::{ObjectSpec, TypeSpec};
pub use value::{Value, ValueKind};
