//! Declared object types as they appear in instruction and design records.
//!
//! A type specification is the token run after the `:` of a declaration, for
//! example `STD_LOGIC = 0` or `ARRAY 7 DOWNTO 0 OF STD_LOGIC = 00000000`.

use crate::error::LogicError;
use crate::logic::Logic;
use crate::logic_vec::{Direction, LogicVec};
use crate::value::{Value, ValueKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The declared type of a signal, variable or constant.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum TypeSpec {
    /// `STD_LOGIC`, `STD_ULOGIC` and their subtypes.
    Logic,
    /// A bounded `std_logic` array.
    Array {
        /// Left bound.
        left: i64,
        /// Index direction.
        direction: Direction,
        /// Right bound.
        right: i64,
    },
    /// `INTEGER` and `NATURAL`.
    Integer,
    /// `BOOLEAN`.
    Boolean,
}

/// A parsed type specification plus its optional `= value` initializer.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ObjectSpec {
    /// The declared type.
    pub ty: TypeSpec,
    /// The raw initializer text, quotes stripped.
    pub init: Option<String>,
}

impl TypeSpec {
    /// Parses `<type> [= <value>]` from whitespace-split tokens.
    pub fn parse(tokens: &[&str]) -> Result<ObjectSpec, LogicError> {
        let invalid = || LogicError::InvalidTypeSpec(tokens.join(" "));
        let (head, rest) = tokens.split_first().ok_or_else(invalid)?;
        let (ty, rest) = match head.to_ascii_uppercase().as_str() {
            "STD_LOGIC" | "STD_ULOGIC" | "UX01" | "X01" => (TypeSpec::Logic, rest),
            "INTEGER" | "NATURAL" | "POSITIVE" => (TypeSpec::Integer, rest),
            "BOOLEAN" => (TypeSpec::Boolean, rest),
            "ARRAY" | "STD_LOGIC_ARRAY" | "STD_LOGIC_VECTOR" => {
                let [left, dir, right, tail @ ..] = rest else {
                    return Err(invalid());
                };
                let left: i64 = left.parse().map_err(|_| invalid())?;
                let right: i64 = right.parse().map_err(|_| invalid())?;
                let direction = Direction::parse(dir).ok_or_else(invalid)?;
                LogicVec::new(left, direction, right)?;
                let tail = match tail {
                    [of, elem, tail @ ..] if of.eq_ignore_ascii_case("OF") => {
                        if !matches!(
                            elem.to_ascii_uppercase().as_str(),
                            "STD_LOGIC" | "STD_ULOGIC"
                        ) {
                            return Err(invalid());
                        }
                        tail
                    }
                    _ => tail,
                };
                (
                    TypeSpec::Array {
                        left,
                        direction,
                        right,
                    },
                    tail,
                )
            }
            _ => return Err(invalid()),
        };
        let init = match rest {
            [] => None,
            ["=", value] => Some(strip_quotes(value).to_string()),
            _ => return Err(invalid()),
        };
        Ok(ObjectSpec { ty, init })
    }

    /// Returns the value class this type holds.
    pub fn kind(&self) -> ValueKind {
        match self {
            TypeSpec::Logic => ValueKind::Logic,
            TypeSpec::Array { .. } => ValueKind::Vector,
            TypeSpec::Integer => ValueKind::Integer,
            TypeSpec::Boolean => ValueKind::Boolean,
        }
    }

    /// Returns the implicit initial value: `U` for logic, 0, `FALSE`.
    pub fn default_value(&self) -> Value {
        match *self {
            TypeSpec::Logic => Value::Logic(Logic::U),
            TypeSpec::Array {
                left,
                direction,
                right,
            } => match LogicVec::new(left, direction, right) {
                Ok(v) => Value::Vector(v),
                Err(_) => Value::Logic(Logic::U),
            },
            TypeSpec::Integer => Value::Integer(0),
            TypeSpec::Boolean => Value::Boolean(false),
        }
    }

    /// Builds a value of this type from initializer or constant text.
    pub fn value_from_literal(&self, text: &str) -> Result<Value, LogicError> {
        let text = strip_quotes(text);
        match *self {
            TypeSpec::Logic => {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Logic::from_char(c)
                        .map(Value::Logic)
                        .ok_or(LogicError::InvalidChar(c)),
                    _ => Err(LogicError::InvalidLiteral(text.to_string())),
                }
            }
            TypeSpec::Array {
                left,
                direction,
                right,
            } => LogicVec::with_literal(left, direction, right, text).map(Value::Vector),
            TypeSpec::Integer => text
                .parse()
                .map(Value::Integer)
                .map_err(|_| LogicError::InvalidLiteral(text.to_string())),
            TypeSpec::Boolean => match text.to_ascii_uppercase().as_str() {
                "TRUE" => Ok(Value::Boolean(true)),
                "FALSE" => Ok(Value::Boolean(false)),
                _ => Err(LogicError::InvalidLiteral(text.to_string())),
            },
        }
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSpec::Logic => f.write_str("STD_LOGIC"),
            TypeSpec::Array {
                left,
                direction,
                right,
            } => write!(f, "ARRAY {left} {direction} {right} OF STD_LOGIC"),
            TypeSpec::Integer => f.write_str("INTEGER"),
            TypeSpec::Boolean => f.write_str("BOOLEAN"),
        }
    }
}

fn strip_quotes(text: &str) -> &str {
    let trimmed = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .or_else(|| text.strip_prefix('\'').and_then(|t| t.strip_suffix('\'')));
    trimmed.unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Result<ObjectSpec, LogicError> {
        let tokens: Vec<&str> = s.split_whitespace().collect();
        TypeSpec::parse(&tokens)
    }

    #[test]
    fn parse_scalar_with_init() {
        let spec = parse("STD_LOGIC = 0").unwrap();
        assert_eq!(spec.ty, TypeSpec::Logic);
        assert_eq!(spec.init.as_deref(), Some("0"));
    }

    #[test]
    fn parse_array_forms() {
        let a = parse("ARRAY 7 DOWNTO 0 OF STD_LOGIC").unwrap();
        let b = parse("STD_LOGIC_ARRAY 7 DOWNTO 0").unwrap();
        assert_eq!(a.ty, b.ty);
        assert_eq!(
            a.ty,
            TypeSpec::Array {
                left: 7,
                direction: Direction::Downto,
                right: 0
            }
        );
        let c = parse("ARRAY 0 TO 3 OF STD_ULOGIC = \"0101\"").unwrap();
        assert_eq!(c.init.as_deref(), Some("0101"));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse("").is_err());
        assert!(parse("REAL").is_err());
        assert!(parse("ARRAY 7 DOWNTO").is_err());
        assert!(parse("ARRAY 0 DOWNTO 7 OF STD_LOGIC").is_err());
        assert!(parse("STD_LOGIC 1").is_err());
    }

    #[test]
    fn value_from_literal() {
        assert_eq!(
            TypeSpec::Logic.value_from_literal("'1'").unwrap(),
            Value::Logic(Logic::One)
        );
        assert_eq!(
            TypeSpec::Integer.value_from_literal("42").unwrap(),
            Value::Integer(42)
        );
        assert_eq!(
            TypeSpec::Boolean.value_from_literal("true").unwrap(),
            Value::Boolean(true)
        );
        let v = parse("ARRAY 3 DOWNTO 0 OF STD_LOGIC")
            .unwrap()
            .ty
            .value_from_literal("\"1100\"")
            .unwrap();
        assert_eq!(v.to_string(), "1100");
    }

    #[test]
    fn defaults() {
        assert_eq!(TypeSpec::Logic.default_value(), Value::Logic(Logic::U));
        assert_eq!(TypeSpec::Integer.default_value(), Value::Integer(0));
        let spec = parse("ARRAY 3 DOWNTO 0 OF STD_LOGIC").unwrap().ty;
        assert_eq!(spec.default_value().to_string(), "UUUU");
    }

    #[test]
    fn display_roundtrips_through_parse() {
        let spec = parse("ARRAY 7 DOWNTO 0 OF STD_LOGIC").unwrap().ty;
        let text = spec.to_string();
        assert_eq!(parse(&text).unwrap().ty, spec);
    }
}
