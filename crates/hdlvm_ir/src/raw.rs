//! Parser for the line-oriented raw instruction records of one process.
//!
//! Each line is `<addr> <OPCODE> <operands...>`. Blank lines are skipped and
//! `END_CODE` ends the stream. The parser only checks record shape; name
//! resolution and folding happen in the optimizer.

use crate::error::CompileError;
use hdlvm_common::{Logic, ObjectSpec, TypeSpec};

/// The storage class named by a `PUSH OBJECT` record.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ObjectClass {
    /// A scheduler-owned signal.
    Signal,
    /// A process-local variable.
    Variable,
    /// A compile-time constant.
    Constant,
}

impl ObjectClass {
    /// Lowercase name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            ObjectClass::Signal => "signal",
            ObjectClass::Variable => "variable",
            ObjectClass::Constant => "constant",
        }
    }
}

/// A typed object reference.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ObjectRef {
    /// Storage class.
    pub class: ObjectClass,
    /// Declared name.
    pub name: String,
    /// Declared type and inline initializer.
    pub spec: ObjectSpec,
}

/// Operand of `PUSH LITERAL`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Literal {
    /// A bare integer.
    Integer(i64),
    /// A quoted bit string, quotes removed.
    Bits(String),
}

/// Operand of `PUSH STATIC VALUE`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StaticValue {
    /// `TRUE` / `FALSE`.
    Boolean(bool),
    /// A single logic character.
    Logic(Logic),
}

/// The condition attached to a `JUMP` record.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum JumpCond {
    /// `JUMP t`
    Always,
    /// `JUMP NC t`: taken when the popped condition is false.
    NotTaken,
    /// `JUMP C t`: taken when the popped condition is true.
    Taken,
    /// `JUMP EVENT t`
    Event,
    /// `JUMP TIMEOUT t`
    Timeout,
    /// `JUMP NR <signal> t`: taken unless the signal has a rising edge.
    NotRising(String),
}

/// A decoded raw record.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum RawOp {
    /// `PUSH LITERAL`
    PushLiteral(Literal),
    /// `PUSH STATIC VALUE`
    PushStatic(StaticValue),
    /// `PUSH OBJECT`
    PushObject(ObjectRef),
    /// `RANGE CREATE`
    RangeCreate,
    /// `RANGE APPLY`
    RangeApply,
    /// `ENTER CONTEXT`
    Enter,
    /// `NEW ...`, carrying the formal name.
    New(String),
    /// `MAP ...`
    Map,
    /// `EXIT CONTEXT`
    Exit,
    /// `CALL FUNCTION <signature>`
    Call(String),
    /// `BINARY OP <op>`
    BinaryOp(String),
    /// `ATTRIBUTE OP <attr>`
    Attribute(String),
    /// `INDEX`
    Index,
    /// `AGGREGATE (RESTYPE=..., HAVEOTHERS=...)`
    Aggregate {
        /// Result width.
        width: usize,
        /// Whether the aggregate is an `others =>` fill.
        others: bool,
    },
    /// `POP <inertial> <delayed> <reject>`
    Pop {
        /// Inertial delay flag.
        inertial: bool,
        /// A delay operand is on top of the stack.
        delayed: bool,
        /// Pulse-rejection limit present.
        reject: bool,
    },
    /// `SCHEDULE TIMED`
    ScheduleTimed,
    /// `SCHEDULE EVENT WAKEUP`
    ScheduleWakeup,
    /// `WAIT`
    Wait,
    /// `CANCEL ALL WAKEUPS`
    Cancel,
    /// `JUMP [cond] <target>`
    Jump {
        /// Condition.
        cond: JumpCond,
        /// Raw target address.
        target: usize,
    },
}

impl RawOp {
    /// Returns `true` for the two `SCHEDULE` records.
    pub fn is_schedule(&self) -> bool {
        matches!(self, RawOp::ScheduleTimed | RawOp::ScheduleWakeup)
    }
}

/// One raw record with its address and original text.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RawInst {
    /// Position in the stream.
    pub addr: usize,
    /// Decoded operation.
    pub op: RawOp,
    /// The record text after the address, for listings.
    pub text: String,
}

/// Parses the raw records of `process`.
pub fn parse_raw(process: &str, text: &str) -> Result<Vec<RawInst>, CompileError> {
    let mut out = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "END_CODE" {
            break;
        }
        let addr = out.len();
        let (head, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let found: usize = head.parse().map_err(|_| CompileError::Malformed {
            process: process.to_string(),
            addr,
            reason: format!("record does not start with an address: '{line}'"),
        })?;
        if found != addr {
            return Err(CompileError::AddressMismatch {
                process: process.to_string(),
                addr,
                found,
            });
        }
        let rest = rest.trim();
        let op = parse_op(rest).map_err(|e| e.into_compile(process, addr))?;
        out.push(RawInst {
            addr,
            op,
            text: rest.to_string(),
        });
    }
    Ok(out)
}

enum RecordError {
    Unknown(String),
    Malformed(String),
}

impl RecordError {
    fn into_compile(self, process: &str, addr: usize) -> CompileError {
        let process = process.to_string();
        match self {
            RecordError::Unknown(opcode) => CompileError::UnknownOpcode {
                process,
                addr,
                opcode,
            },
            RecordError::Malformed(reason) => CompileError::Malformed {
                process,
                addr,
                reason,
            },
        }
    }
}

fn parse_op(record: &str) -> Result<RawOp, RecordError> {
    let tokens: Vec<&str> = record.split_whitespace().collect();
    let malformed = || RecordError::Malformed(record.to_string());
    match tokens.as_slice() {
        ["PUSH", "LITERAL", lit] => parse_literal(lit).ok_or_else(malformed),
        ["PUSH", "STATIC", "VALUE", v] => parse_static(v).ok_or_else(malformed),
        ["PUSH", "OBJECT", class, name, ":", spec @ ..] => {
            let class = match *class {
                "SIGNAL" => ObjectClass::Signal,
                "VARIABLE" => ObjectClass::Variable,
                "CONSTANT" => ObjectClass::Constant,
                _ => return Err(malformed()),
            };
            let spec = TypeSpec::parse(spec).map_err(|e| RecordError::Malformed(e.to_string()))?;
            Ok(RawOp::PushObject(ObjectRef {
                class,
                name: (*name).to_string(),
                spec,
            }))
        }
        ["RANGE", "CREATE"] => Ok(RawOp::RangeCreate),
        ["RANGE", "APPLY"] => Ok(RawOp::RangeApply),
        ["ENTER", ..] => Ok(RawOp::Enter),
        ["NEW", rest @ ..] => {
            let name = match rest.iter().position(|t| *t == ":") {
                Some(colon) if colon > 0 => rest[colon - 1],
                _ => rest.last().copied().ok_or_else(malformed)?,
            };
            Ok(RawOp::New(name.to_string()))
        }
        ["MAP", ..] => Ok(RawOp::Map),
        ["EXIT", ..] => Ok(RawOp::Exit),
        ["CALL", "FUNCTION", sig @ ..] if !sig.is_empty() => Ok(RawOp::Call(sig.join(" "))),
        ["BINARY", "OP", op] => Ok(RawOp::BinaryOp((*op).to_string())),
        ["ATTRIBUTE", "OP", attr] => Ok(RawOp::Attribute((*attr).to_string())),
        ["INDEX"] => Ok(RawOp::Index),
        ["AGGREGATE", ..] => parse_aggregate(record).ok_or_else(malformed),
        ["POP", i, d, r] => {
            let flag = |t: &str| match t {
                "T" | "TRUE" => Some(true),
                "F" | "FALSE" => Some(false),
                _ => None,
            };
            match (flag(*i), flag(*d), flag(*r)) {
                (Some(inertial), Some(delayed), Some(reject)) => Ok(RawOp::Pop {
                    inertial,
                    delayed,
                    reject,
                }),
                _ => Err(malformed()),
            }
        }
        ["SCHEDULE", "TIMED"] => Ok(RawOp::ScheduleTimed),
        ["SCHEDULE", "EVENT", "WAKEUP"] => Ok(RawOp::ScheduleWakeup),
        ["WAIT"] => Ok(RawOp::Wait),
        ["CANCEL", "ALL", "WAKEUPS"] => Ok(RawOp::Cancel),
        ["JUMP", rest @ ..] => {
            let (cond, target) = match rest {
                [t] => (JumpCond::Always, t),
                ["NC", t] => (JumpCond::NotTaken, t),
                ["C", t] => (JumpCond::Taken, t),
                ["EVENT", t] => (JumpCond::Event, t),
                ["TIMEOUT", t] => (JumpCond::Timeout, t),
                ["NR", sig, t] => (JumpCond::NotRising((*sig).to_string()), t),
                _ => return Err(malformed()),
            };
            let target = target.parse().map_err(|_| malformed())?;
            Ok(RawOp::Jump { cond, target })
        }
        [opcode, ..] => Err(RecordError::Unknown((*opcode).to_string())),
        [] => Err(malformed()),
    }
}

fn parse_literal(token: &str) -> Option<RawOp> {
    if let Some(bits) = token.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
        return Some(RawOp::PushLiteral(Literal::Bits(bits.to_string())));
    }
    token.parse().ok().map(|v| RawOp::PushLiteral(Literal::Integer(v)))
}

fn parse_static(token: &str) -> Option<RawOp> {
    let token = token.trim_matches('\'');
    let value = match token.to_ascii_uppercase().as_str() {
        "TRUE" => StaticValue::Boolean(true),
        "FALSE" => StaticValue::Boolean(false),
        _ => {
            let mut chars = token.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => StaticValue::Logic(Logic::from_char(c)?),
                _ => return None,
            }
        }
    };
    Some(RawOp::PushStatic(value))
}

/// Parses `AGGREGATE (RESTYPE=ARRAY 7 DOWNTO 0 OF STD_LOGIC, HAVEOTHERS=TRUE)`.
fn parse_aggregate(record: &str) -> Option<RawOp> {
    let body = record.strip_prefix("AGGREGATE")?.trim();
    let body = body.strip_prefix('(')?.strip_suffix(')')?;
    let mut width = None;
    let mut others = None;
    for arg in body.replace('#', "").split(',') {
        let (key, value) = arg.split_once('=')?;
        match key.trim() {
            "RESTYPE" => {
                let spec: Vec<&str> = value.split_whitespace().collect();
                let [_, left, _, right, ..] = spec.as_slice() else {
                    return None;
                };
                let left: i64 = left.parse().ok()?;
                let right: i64 = right.parse().ok()?;
                width = Some(left.abs_diff(right) as usize + 1);
            }
            "HAVEOTHERS" => others = Some(value.trim() == "TRUE"),
            _ => {}
        }
    }
    Some(RawOp::Aggregate {
        width: width?,
        others: others.unwrap_or(false),
    })
}
