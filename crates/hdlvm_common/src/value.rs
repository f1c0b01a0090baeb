//! Runtime values produced and consumed by the VM and built-in operators.

use crate::logic::Logic;
use crate::logic_vec::LogicVec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A fully evaluated operand value.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Value {
    /// A scalar `std_ulogic`.
    Logic(Logic),
    /// A `std_logic_vector`.
    Vector(LogicVec),
    /// An `INTEGER`/`NATURAL`.
    Integer(i64),
    /// A `BOOLEAN`.
    Boolean(bool),
}

/// The coarse type class of a [`Value`], used for operand checks.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum ValueKind {
    /// Scalar logic.
    Logic,
    /// Logic vector.
    Vector,
    /// Integer.
    Integer,
    /// Boolean.
    Boolean,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueKind::Logic => "STD_ULOGIC",
            ValueKind::Vector => "STD_LOGIC_VECTOR",
            ValueKind::Integer => "INTEGER",
            ValueKind::Boolean => "BOOLEAN",
        })
    }
}

impl Value {
    /// Returns the type class of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Logic(_) => ValueKind::Logic,
            Value::Vector(_) => ValueKind::Vector,
            Value::Integer(_) => ValueKind::Integer,
            Value::Boolean(_) => ValueKind::Boolean,
        }
    }

    /// Returns `true` if this value can stand in for an operand of `kind`.
    ///
    /// A one-element vector is accepted where a scalar is expected, since
    /// single-bit objects are pushed as one-element views.
    pub fn fits(&self, kind: ValueKind) -> bool {
        self.kind() == kind || (kind == ValueKind::Logic && self.as_logic().is_some())
    }

    /// Returns the scalar, also unwrapping a one-element vector.
    pub fn as_logic(&self) -> Option<Logic> {
        match self {
            Value::Logic(l) => Some(*l),
            Value::Vector(v) if v.width() == 1 => Some(v.bits()[0]),
            _ => None,
        }
    }

    /// Returns the vector payload.
    pub fn as_vector(&self) -> Option<&LogicVec> {
        match self {
            Value::Vector(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the integer payload.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the boolean payload.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the logic elements, least-significant first.
    pub fn to_bits(&self) -> Option<Vec<Logic>> {
        match self {
            Value::Logic(l) => Some(vec![*l]),
            Value::Vector(v) => Some(v.bits().to_vec()),
            _ => None,
        }
    }

    /// Compares decoded string forms, ignoring vector bounds and direction.
    pub fn same_as(&self, other: &Value) -> bool {
        self.to_string() == other.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Logic(l) => write!(f, "{l}"),
            Value::Vector(v) => write!(f, "{v}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Boolean(true) => f.write_str("TRUE"),
            Value::Boolean(false) => f.write_str("FALSE"),
        }
    }
}

impl From<Logic> for Value {
    fn from(l: Logic) -> Self {
        Value::Logic(l)
    }
}

impl From<LogicVec> for Value {
    fn from(v: LogicVec) -> Self {
        Value::Vector(v)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic_vec::Direction;

    #[test]
    fn equality_normalizes_direction() {
        let a = LogicVec::with_literal(3, Direction::Downto, 0, "1010").unwrap();
        let b = LogicVec::with_literal(0, Direction::To, 3, "1010").unwrap();
        assert_ne!(a, b);
        assert!(Value::Vector(a).same_as(&Value::Vector(b)));
    }

    #[test]
    fn single_bit_vector_fits_scalar() {
        let v = Value::Vector(LogicVec::from_literal("1").unwrap());
        assert!(v.fits(ValueKind::Logic));
        assert_eq!(v.as_logic(), Some(Logic::One));
        let wide = Value::Vector(LogicVec::from_literal("10").unwrap());
        assert!(!wide.fits(ValueKind::Logic));
    }

    #[test]
    fn display_forms() {
        assert_eq!(Value::Logic(Logic::H).to_string(), "H");
        assert_eq!(Value::Integer(-3).to_string(), "-3");
        assert_eq!(Value::Boolean(true).to_string(), "TRUE");
        assert_eq!(ValueKind::Vector.to_string(), "STD_LOGIC_VECTOR");
    }

    #[test]
    fn to_bits_is_lsb_first() {
        let v = Value::Vector(LogicVec::from_literal("10").unwrap());
        assert_eq!(v.to_bits(), Some(vec![Logic::Zero, Logic::One]));
        assert_eq!(Value::Integer(1).to_bits(), None);
    }
}
